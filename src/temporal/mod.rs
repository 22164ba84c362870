//! Temporal consistency layer.
//!
//! Per-frame detections are noisy and independent. This module keeps a bounded
//! window of recent detections, encodes each into a fixed-size feature vector,
//! and scores the window with a frozen sequence model to decide presence.

mod detector;
mod encoder;
mod history;
mod scorer;

pub use detector::{
    Phase, TemporalConfig, TemporalDetector, TemporalDiagnostics, TemporalResult,
    DEFAULT_BASE_CONFIDENCE, DEFAULT_DECISION_THRESHOLD, DEFAULT_SEQUENCE_LENGTH,
};
pub use encoder::{
    ClassSlotMap, FeatureEncoder, FeatureVector, BBOX_REFERENCE_SCALE, DEFAULT_FEATURE_DIM,
    DETECTION_COUNT_CAP, MAX_DETECTIONS_PER_FRAME, RESERVED_SLOTS,
};
pub use history::SlidingHistoryBuffer;
pub use scorer::{
    LstmLayerWeights, LstmScorer, LstmWeights, SequenceScorer, DEFAULT_HIDDEN_SIZE,
    DEFAULT_NUM_LAYERS, DEFAULT_SCORER_SEED,
};
