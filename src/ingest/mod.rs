//! Video sources.
//!
//! A source yields decoded frames of one video in order, once. Restarting
//! means constructing a new source. Available sources:
//! - `MemorySource`: frames already in memory (tests, callers with their own decoder)
//! - `FileSource`: synthetic `stub://` scenes, or local files via FFmpeg
//!   (feature: ingest-file-ffmpeg)
//!
//! `Decimated` wraps any source to process every (skip + 1)-th frame.

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
mod source;

pub use file::{FileConfig, FileSource};
pub use source::{Decimated, MemorySource, SourceFrame, VideoInfo, VideoSource};
