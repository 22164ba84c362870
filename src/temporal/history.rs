use std::collections::VecDeque;

use crate::detect::DetectionResult;
use crate::temporal::encoder::FeatureVector;

/// Bounded FIFO of the most recent detection results and their encodings.
///
/// Holds at most `capacity` entries; pushing into a full buffer evicts the
/// oldest entry first. There is no reset: the buffer lives and dies with its
/// temporal detector.
#[derive(Debug)]
pub struct SlidingHistoryBuffer {
    entries: VecDeque<(DetectionResult, FeatureVector)>,
    capacity: usize,
}

impl SlidingHistoryBuffer {
    /// Capacity is clamped to at least one entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, result: DetectionResult, features: FeatureVector) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((result, features));
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Feature vectors, oldest first.
    pub fn ordered_features(&self) -> Vec<FeatureVector> {
        self.entries.iter().map(|(_, f)| f.clone()).collect()
    }

    /// Buffered detection results, oldest first.
    pub fn results(&self) -> impl Iterator<Item = &DetectionResult> {
        self.entries.iter().map(|(r, _)| r)
    }

    /// True if any buffered frame reported an animal.
    pub fn any_present(&self) -> bool {
        self.results().any(|r| r.has_animals)
    }
}
