use thiserror::Error;

/// Errors raised by the temporal presence core.
///
/// Only [`PresenceError::Shape`] is recoverable: the orchestration layer
/// falls back to the base detector result for that frame. The other kinds
/// propagate to the caller.
#[derive(Debug, Error)]
pub enum PresenceError {
    /// Encoder/scorer mismatch or invalid settings. Fatal at construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The scorer was handed a sequence it cannot consume.
    #[error("shape error: {what} expected {expected}, got {actual}")]
    Shape {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The frame detector failed to load or to run inference.
    #[error("frame detector unavailable: {0:#}")]
    DetectorUnavailable(#[source] anyhow::Error),
}

impl PresenceError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        PresenceError::Configuration(msg.into())
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, PresenceError::Shape { .. })
    }
}

pub type PresenceResult<T> = std::result::Result<T, PresenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_shape_errors_are_recoverable() {
        let shape = PresenceError::Shape {
            what: "sequence length",
            expected: 5,
            actual: 4,
        };
        assert!(shape.is_recoverable());
        assert!(!PresenceError::configuration("bad dim").is_recoverable());
        assert!(
            !PresenceError::DetectorUnavailable(anyhow::anyhow!("model missing")).is_recoverable()
        );
    }

    #[test]
    fn shape_error_message_names_the_mismatch() {
        let err = PresenceError::Shape {
            what: "feature dimension",
            expected: 128,
            actual: 64,
        };
        assert_eq!(
            err.to_string(),
            "shape error: feature dimension expected 128, got 64"
        );
    }
}
