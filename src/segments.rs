//! Contiguous "animal present" intervals from a per-frame flag series.

use serde::{Deserialize, Serialize};

/// Maximal run of frames flagged as containing animals.
///
/// Frame indices are the source of truth; times are derived from them once,
/// at construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start_frame: usize,
    pub end_frame: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
}

impl Segment {
    /// Inclusive frame range `[start_frame, end_frame]` at `fps`.
    pub fn from_frames(start_frame: usize, end_frame: usize, fps: f64) -> Self {
        let start_time = start_frame as f64 / fps;
        let end_time = end_frame as f64 / fps;
        Self {
            start_frame,
            end_frame,
            start_time,
            end_time,
            duration: end_time - start_time,
        }
    }

    /// Number of frames covered.
    pub fn frame_len(&self) -> usize {
        self.end_frame - self.start_frame + 1
    }
}

/// Extract segments from `series` in one linear scan.
///
/// `fps` must be positive; it only scales the derived times. A single true
/// frame yields a zero-duration segment.
pub fn extract_segments(series: &[bool], fps: f64) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut open: Option<usize> = None;

    for (i, &present) in series.iter().enumerate() {
        match (open, present) {
            (None, true) => open = Some(i),
            (Some(start), false) => {
                segments.push(Segment::from_frames(start, i - 1, fps));
                open = None;
            }
            _ => {}
        }
    }

    if let Some(start) = open {
        segments.push(Segment::from_frames(start, series.len() - 1, fps));
    }

    segments
}
