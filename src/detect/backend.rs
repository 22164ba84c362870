use anyhow::Result;

use crate::detect::result::DetectionResult;
use crate::frame::Frame;

/// Frame detector interface.
///
/// A detector turns one decoded frame into a [`DetectionResult`]. It is a
/// black box to the temporal layer: backbones, thresholds and label
/// vocabularies are its own business.
///
/// Implementations must keep no per-video state in `infer`; loaded weights
/// may be shared read-only between sessions, but a detector instance itself
/// belongs to one session.
pub trait FrameDetector: Send {
    /// Backend identifier. Used for logging and report metadata.
    fn name(&self) -> &str;

    /// Load weights and prepare for inference.
    fn load(&mut self) -> Result<()>;

    /// Returns true once `load` has succeeded.
    fn is_loaded(&self) -> bool;

    /// Run inference on a loaded detector.
    fn infer(&mut self, frame: &Frame) -> Result<DetectionResult>;

    /// Run detection, loading on first use.
    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult> {
        if !self.is_loaded() {
            self.load()?;
        }
        self.infer(frame)
    }

    /// Override the minimum confidence a detection needs to be reported.
    ///
    /// Backends without a tunable threshold ignore this.
    fn set_confidence_threshold(&mut self, _threshold: f32) {}
}
