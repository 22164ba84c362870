use std::collections::VecDeque;

use anyhow::{anyhow, Result};

use crate::detect::backend::FrameDetector;
use crate::detect::result::DetectionResult;
use crate::frame::Frame;

/// Test double replaying a fixed script of detection results.
///
/// Each `detect` call pops the next scripted result regardless of frame
/// content. Once the script runs out every frame is empty.
pub struct ScriptedBackend {
    script: VecDeque<DetectionResult>,
    loaded: bool,
    fail_load: bool,
    fail_at: Option<usize>,
    calls: usize,
    load_calls: usize,
}

impl ScriptedBackend {
    pub fn new(script: impl IntoIterator<Item = DetectionResult>) -> Self {
        Self {
            script: script.into_iter().collect(),
            loaded: false,
            fail_load: false,
            fail_at: None,
            calls: 0,
            load_calls: 0,
        }
    }

    /// Script of presence flags, one detection-less result per frame.
    pub fn from_flags(flags: &[bool]) -> Self {
        Self::new(flags.iter().map(|&has_animals| DetectionResult {
            has_animals,
            detections: Vec::new(),
        }))
    }

    /// Make `load` fail.
    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    /// Make the `call`-th inference (0-based) fail.
    pub fn failing_at(mut self, call: usize) -> Self {
        self.fail_at = Some(call);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls
    }
}

impl FrameDetector for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn load(&mut self) -> Result<()> {
        self.load_calls += 1;
        if self.fail_load {
            return Err(anyhow!("scripted backend configured to fail loading"));
        }
        self.loaded = true;
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn infer(&mut self, _frame: &Frame) -> Result<DetectionResult> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_at == Some(call) {
            return Err(anyhow!("scripted inference failure at call {}", call));
        }
        Ok(self.script.pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_script_then_goes_quiet() -> Result<()> {
        let mut backend = ScriptedBackend::from_flags(&[true, false]);
        let frame = Frame::filled(2, 2, [0, 0, 0]);
        assert!(backend.detect(&frame)?.has_animals);
        assert!(!backend.detect(&frame)?.has_animals);
        assert!(!backend.detect(&frame)?.has_animals);
        assert_eq!(backend.calls(), 3);
        assert_eq!(backend.load_calls(), 1);
        Ok(())
    }

    #[test]
    fn auto_loads_and_surfaces_load_failure() {
        let mut backend = ScriptedBackend::from_flags(&[true]).failing_load();
        let frame = Frame::filled(2, 2, [0, 0, 0]);
        assert!(backend.detect(&frame).is_err());
        assert_eq!(backend.calls(), 0);
    }
}
