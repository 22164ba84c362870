//! Temporal animal presence detection for video.
//!
//! Per-frame detectors flicker: a partially occluded animal drops out for a
//! frame, a shadow becomes a dog for another. This crate wraps any frame
//! detector with a short sliding window of recent detections, scores the
//! window with a frozen recurrent model, and turns the smoothed per-frame
//! decisions into contiguous animal segments.
//!
//! # Pipeline
//!
//! ```text
//! VideoSource -> FrameDetector -> FeatureEncoder -> SlidingHistoryBuffer
//!             -> SequenceScorer -> TemporalResult -> extract_segments
//! ```
//!
//! # Module Structure
//!
//! - `frame`: decoded RGB frames
//! - `detect`: frame detector interface, result types, backends, registry
//! - `temporal`: feature encoding, history window, scorer, per-frame decisions
//! - `segments`: contiguous presence intervals
//! - `ingest`: video sources (memory, synthetic, local files)
//! - `pipeline`: per-video sessions and the JSON report
//! - `config`: file + environment configuration
//! - `error`: error taxonomy of the temporal core

pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod segments;
pub mod temporal;

pub use config::AnalyzerConfig;
pub use detect::{BackendRegistry, Detection, DetectionResult, FrameDetector, StubBackend};
pub use error::{PresenceError, PresenceResult};
pub use frame::Frame;
pub use ingest::{FileConfig, FileSource, MemorySource, VideoInfo, VideoSource};
pub use pipeline::{AnalysisSession, FrameReport, ReportMetadata, VideoAnalyzer, VideoReport};
pub use segments::{extract_segments, Segment};
pub use temporal::{LstmScorer, SequenceScorer, TemporalConfig, TemporalDetector, TemporalResult};
