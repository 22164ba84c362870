//! Per-frame temporal decision policy.
//!
//! A [`TemporalDetector`] wraps one frame detector for one video session. It
//! starts in [`Phase::Warmup`] and passes base results through unchanged until
//! its history holds `sequence_length` frames; from then on ([`Phase::Active`])
//! every frame's presence flag is decided over the whole window.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::detect::{DetectionResult, FrameDetector};
use crate::error::{PresenceError, PresenceResult};
use crate::frame::Frame;
use crate::temporal::encoder::{FeatureEncoder, DEFAULT_FEATURE_DIM};
use crate::temporal::history::SlidingHistoryBuffer;
use crate::temporal::scorer::SequenceScorer;

pub const DEFAULT_SEQUENCE_LENGTH: usize = 5;

/// Temporal confidence must exceed this for a frame to count as an animal.
pub const DEFAULT_DECISION_THRESHOLD: f32 = 0.3;

/// Confidence threshold pushed down to the base detector for better recall.
pub const DEFAULT_BASE_CONFIDENCE: f32 = 0.3;

#[derive(Clone, Debug, PartialEq)]
pub struct TemporalConfig {
    /// Window length N.
    pub sequence_length: usize,
    /// Feature dimension D; must match the scorer.
    pub feature_dim: usize,
    /// Strictly-greater-than threshold on the temporal confidence.
    pub decision_threshold: f32,
    /// Skip the scorer when no frame in the window has an animal.
    pub fast_path: bool,
    /// Applied to the base detector once at construction.
    pub base_confidence_threshold: Option<f32>,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            feature_dim: DEFAULT_FEATURE_DIM,
            decision_threshold: DEFAULT_DECISION_THRESHOLD,
            fast_path: true,
            base_confidence_threshold: Some(DEFAULT_BASE_CONFIDENCE),
        }
    }
}

impl TemporalConfig {
    pub fn validate(&self) -> PresenceResult<()> {
        if self.sequence_length == 0 {
            return Err(PresenceError::configuration(
                "sequence_length must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(PresenceError::configuration(format!(
                "decision_threshold {} outside [0, 1]",
                self.decision_threshold
            )));
        }
        if let Some(t) = self.base_confidence_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(PresenceError::configuration(format!(
                    "base_confidence_threshold {} outside [0, 1]",
                    t
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Warmup,
    Active,
}

/// Detection result after the temporal decision.
///
/// `temporal_confidence` is `None` when the base result was passed through
/// (warmup, or scorer fallback).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemporalResult {
    #[serde(flatten)]
    pub detection: DetectionResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_confidence: Option<f32>,
}

impl TemporalResult {
    pub fn passthrough(detection: DetectionResult) -> Self {
        Self {
            detection,
            temporal_confidence: None,
        }
    }

    pub fn has_animals(&self) -> bool {
        self.detection.has_animals
    }
}

/// Counters describing how frames were decided.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalDiagnostics {
    pub frames_processed: u64,
    pub scorer_invocations: u64,
    pub fast_path_skips: u64,
    pub scorer_failures: u64,
}

/// Frame detector plus sliding-window smoothing, for exactly one session.
pub struct TemporalDetector {
    base: Box<dyn FrameDetector>,
    scorer: Arc<dyn SequenceScorer>,
    encoder: FeatureEncoder,
    history: SlidingHistoryBuffer,
    config: TemporalConfig,
    name: String,
    diagnostics: TemporalDiagnostics,
}

impl TemporalDetector {
    pub fn new(
        mut base: Box<dyn FrameDetector>,
        scorer: Arc<dyn SequenceScorer>,
        config: TemporalConfig,
    ) -> PresenceResult<Self> {
        config.validate()?;
        if config.feature_dim != scorer.feature_dim() {
            return Err(PresenceError::configuration(format!(
                "encoder feature dimension {} does not match scorer input {}",
                config.feature_dim,
                scorer.feature_dim()
            )));
        }
        let encoder = FeatureEncoder::new(config.feature_dim)?;
        if let Some(threshold) = config.base_confidence_threshold {
            base.set_confidence_threshold(threshold);
        }
        let name = format!("temporal_{}", base.name());

        Ok(Self {
            base,
            scorer,
            encoder,
            history: SlidingHistoryBuffer::new(config.sequence_length),
            config,
            name,
            diagnostics: TemporalDiagnostics::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_name(&self) -> &str {
        self.base.name()
    }

    pub fn config(&self) -> &TemporalConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> TemporalDiagnostics {
        self.diagnostics
    }

    pub fn phase(&self) -> Phase {
        if self.history.is_full() {
            Phase::Active
        } else {
            Phase::Warmup
        }
    }

    /// Load the base detector up front. Optional: `detect` loads on first use.
    pub fn load(&mut self) -> PresenceResult<()> {
        if self.base.is_loaded() {
            return Ok(());
        }
        self.base
            .load()
            .map_err(PresenceError::DetectorUnavailable)
    }

    /// Classify the next frame of the session.
    ///
    /// Frames must arrive in video order. Base detector failures propagate;
    /// recoverable scorer failures fall back to the base result.
    pub fn detect(&mut self, frame: &Frame) -> PresenceResult<TemporalResult> {
        let base_result = self
            .base
            .detect(frame)
            .map_err(PresenceError::DetectorUnavailable)?;
        self.diagnostics.frames_processed += 1;

        let was_active = self.history.is_full();
        let features = self.encoder.encode(&base_result);
        self.history.push(base_result.clone(), features);

        if !self.history.is_full() {
            return Ok(TemporalResult::passthrough(base_result));
        }
        if !was_active {
            log::debug!(
                "{}: window full after {} frames, temporal decisions active",
                self.name,
                self.diagnostics.frames_processed
            );
        }

        if self.config.fast_path && !self.history.any_present() {
            self.diagnostics.fast_path_skips += 1;
            return Ok(TemporalResult {
                detection: DetectionResult {
                    has_animals: false,
                    ..base_result
                },
                temporal_confidence: Some(0.0),
            });
        }

        self.diagnostics.scorer_invocations += 1;
        match self.scorer.score(&self.history.ordered_features()) {
            Ok(confidence) => Ok(TemporalResult {
                detection: DetectionResult {
                    has_animals: confidence > self.config.decision_threshold,
                    ..base_result
                },
                temporal_confidence: Some(confidence),
            }),
            Err(e) if e.is_recoverable() => {
                self.diagnostics.scorer_failures += 1;
                log::warn!(
                    "{}: scorer failed on frame {}, using base result: {}",
                    self.name,
                    self.diagnostics.frames_processed,
                    e
                );
                Ok(TemporalResult::passthrough(base_result))
            }
            Err(e) => Err(e),
        }
    }
}
