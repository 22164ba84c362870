//! Frame detector interface and backends.
//!
//! The temporal layer consumes detectors through [`FrameDetector`] only.
//! Backends are constructed per session through [`BackendRegistry`].

mod backend;
mod backends;
mod labels;
mod registry;
mod result;

pub use backend::FrameDetector;
pub use backends::{ScriptedBackend, StubBackend};
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use labels::{AnimalLabels, COCO_ANIMAL_CLASSES, IMAGENET_ANIMAL_KEYWORDS};
pub use registry::BackendRegistry;
pub use result::{BoundingBox, Detection, DetectionResult};
