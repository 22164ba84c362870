//! Fixed-size numeric encoding of per-frame detections.
//!
//! Layout of a [`FeatureVector`] of dimension `D`:
//!
//! | slots            | content                                           |
//! |------------------|---------------------------------------------------|
//! | 0                | presence flag (0/1)                               |
//! | 1                | detection count, saturating at 10, scaled to 0..1 |
//! | 2..20            | (cx, cy, w, h) per detection, 4 slots each        |
//! | 20..D            | confidence per class slot                         |

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::detect::DetectionResult;
use crate::error::{PresenceError, PresenceResult};

/// Feature dimension used unless configured otherwise.
pub const DEFAULT_FEATURE_DIM: usize = 128;

/// Slots reserved for presence, count and box geometry.
pub const RESERVED_SLOTS: usize = 20;

/// Detection count at which slot 1 saturates.
pub const DETECTION_COUNT_CAP: usize = 10;

/// Detections per frame that contribute to the encoding.
pub const MAX_DETECTIONS_PER_FRAME: usize = 10;

/// Box coordinates are divided by this before encoding.
pub const BBOX_REFERENCE_SCALE: f32 = 1000.0;

const BBOX_BASE_SLOT: usize = 2;
const BBOX_SLOTS: usize = 4;

/// One frame's encoded detections.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn zeros(dim: usize) -> Self {
        Self(vec![0.0; dim])
    }

    pub fn from_vec(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn get(&self, slot: usize) -> Option<f32> {
        self.0.get(slot).copied()
    }
}

/// Session-local mapping from class label to feature slot.
///
/// Slots are handed out in first-seen order from `RESERVED_SLOTS` upward and
/// are never reclaimed. Once every class slot is taken, new labels land on a
/// slot picked by a stable hash of the label. Such overflow labels may share a
/// slot with other labels; the map never fails to produce a slot.
#[derive(Clone, Debug)]
pub struct ClassSlotMap {
    slots: HashMap<String, usize>,
    first_slot: usize,
    capacity: usize,
    next_free: usize,
}

impl ClassSlotMap {
    /// Map covering slots `first_slot..first_slot + capacity`.
    pub fn new(first_slot: usize, capacity: usize) -> Self {
        Self {
            slots: HashMap::new(),
            first_slot,
            capacity,
            next_free: 0,
        }
    }

    /// Look up the slot for `label`, allocating one on first sight.
    pub fn slot_for(&mut self, label: &str) -> usize {
        if let Some(&slot) = self.slots.get(label) {
            return slot;
        }
        let slot = if self.next_free < self.capacity {
            let slot = self.first_slot + self.next_free;
            self.next_free += 1;
            slot
        } else {
            self.overflow_slot(label)
        };
        self.slots.insert(label.to_string(), slot);
        slot
    }

    /// Slot already assigned to `label`, if any.
    pub fn get(&self, label: &str) -> Option<usize> {
        self.slots.get(label).copied()
    }

    /// Number of labels seen so far.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// True once every class slot has been handed out.
    pub fn is_exhausted(&self) -> bool {
        self.next_free >= self.capacity
    }

    fn overflow_slot(&self, label: &str) -> usize {
        let digest = Sha256::digest(label.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        let hash = u64::from_le_bytes(prefix);
        self.first_slot + (hash % self.capacity as u64) as usize
    }
}

/// Encodes detection results into fixed-size feature vectors.
///
/// Owns its [`ClassSlotMap`]; one encoder per session.
#[derive(Clone, Debug)]
pub struct FeatureEncoder {
    dim: usize,
    class_slots: ClassSlotMap,
}

impl FeatureEncoder {
    pub fn new(dim: usize) -> PresenceResult<Self> {
        if dim <= RESERVED_SLOTS {
            return Err(PresenceError::configuration(format!(
                "feature dimension {} leaves no class slots (need > {})",
                dim, RESERVED_SLOTS
            )));
        }
        Ok(Self {
            dim,
            class_slots: ClassSlotMap::new(RESERVED_SLOTS, dim - RESERVED_SLOTS),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn class_slots(&self) -> &ClassSlotMap {
        &self.class_slots
    }

    pub fn encode(&mut self, result: &DetectionResult) -> FeatureVector {
        let mut features = vec![0.0f32; self.dim];

        features[0] = if result.has_animals { 1.0 } else { 0.0 };
        features[1] =
            result.detections.len().min(DETECTION_COUNT_CAP) as f32 / DETECTION_COUNT_CAP as f32;

        for (j, detection) in result
            .detections
            .iter()
            .take(MAX_DETECTIONS_PER_FRAME)
            .enumerate()
        {
            if !detection.class_label.is_empty() {
                let slot = self.class_slots.slot_for(&detection.class_label);
                features[slot] = detection.confidence;
            }

            if let Some(bbox) = detection.bbox {
                let base = BBOX_BASE_SLOT + j * BBOX_SLOTS;
                if base + BBOX_SLOTS <= RESERVED_SLOTS {
                    let (cx, cy) = bbox.center();
                    features[base] = cx / BBOX_REFERENCE_SCALE;
                    features[base + 1] = cy / BBOX_REFERENCE_SCALE;
                    features[base + 2] = bbox.width() / BBOX_REFERENCE_SCALE;
                    features[base + 3] = bbox.height() / BBOX_REFERENCE_SCALE;
                }
            }
        }

        FeatureVector(features)
    }
}
