//! Local file video source.
//!
//! `FileSource` reads one local video from start to end:
//! - `stub://<name>` paths produce a deterministic synthetic scene (no decoder needed)
//! - anything else is decoded with FFmpeg (feature: ingest-file-ffmpeg)
//!
//! Remote URLs are rejected; fetching media is the caller's job.

use anyhow::{anyhow, Result};

use super::source::{SourceFrame, VideoInfo, VideoSource};
#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use crate::frame::Frame;

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local file path (e.g., "/data/trailcam/0142.mp4") or `stub://<name>`.
    pub path: String,
    /// Synthetic scenes only: frame rate.
    pub synthetic_fps: f64,
    /// Synthetic scenes only: number of frames.
    pub synthetic_frames: u64,
    /// Synthetic scenes only: frame size.
    pub synthetic_width: u32,
    pub synthetic_height: u32,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            synthetic_fps: 10.0,
            synthetic_frames: 200,
            synthetic_width: 160,
            synthetic_height: 120,
        }
    }
}

impl FileConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticScene),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn open(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes)"
            ));
        }
        if config.path.starts_with("stub://") {
            log::info!("FileSource: opened {} (synthetic)", config.path);
            Ok(Self {
                backend: FileBackend::Synthetic(SyntheticScene::new(config)?),
            })
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                Ok(Self {
                    backend: FileBackend::Ffmpeg(FfmpegFileSource::open(config)?),
                })
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                Err(anyhow!(
                    "file ingestion requires the ingest-file-ffmpeg feature"
                ))
            }
        }
    }

    /// Frames decoded so far.
    pub fn frames_read(&self) -> u64 {
        match &self.backend {
            FileBackend::Synthetic(scene) => scene.next_number,
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.frames_read(),
        }
    }
}

impl VideoSource for FileSource {
    fn info(&self) -> VideoInfo {
        match &self.backend {
            FileBackend::Synthetic(scene) => scene.info(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.info(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<SourceFrame>> {
        match &mut self.backend {
            FileBackend::Synthetic(scene) => Ok(scene.next_frame()),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic scene (stub://)
// ----------------------------------------------------------------------------

/// Frames per visit cycle: an animal is on screen for the second half.
const VISIT_PERIOD: u64 = 40;
/// Every n-th frame of a visit drops the animal, mimicking detector misses.
const DROPOUT_EVERY: u64 = 7;

/// Dark field with a red "animal" walking across it in periodic visits.
struct SyntheticScene {
    config: FileConfig,
    next_number: u64,
}

impl SyntheticScene {
    fn new(config: FileConfig) -> Result<Self> {
        if config.synthetic_fps <= 0.0 {
            return Err(anyhow!("synthetic fps must be > 0"));
        }
        if config.synthetic_width < 8 || config.synthetic_height < 8 {
            return Err(anyhow!("synthetic frames must be at least 8x8"));
        }
        Ok(Self {
            config,
            next_number: 0,
        })
    }

    fn info(&self) -> VideoInfo {
        VideoInfo::new(self.config.synthetic_fps, self.config.synthetic_frames)
    }

    /// Whether the scene shows the animal at frame `n`.
    fn animal_visible(n: u64) -> bool {
        let phase = n % VISIT_PERIOD;
        phase >= VISIT_PERIOD / 2 && phase % DROPOUT_EVERY != 0
    }

    fn next_frame(&mut self) -> Option<SourceFrame> {
        if self.next_number >= self.config.synthetic_frames {
            return None;
        }
        let n = self.next_number;
        self.next_number += 1;

        let (w, h) = (self.config.synthetic_width, self.config.synthetic_height);
        let mut frame = Frame::filled(w, h, [12, 16, 10]);
        if Self::animal_visible(n) {
            let half = VISIT_PERIOD / 2;
            let progress = (n % VISIT_PERIOD - half) as u32;
            let box_w = w / 4;
            let box_h = h / 4;
            let x = (w - box_w) * progress / half as u32;
            let y = h / 2;
            frame.fill_rect(x, y, x + box_w, y + box_h, [220, 60, 40]);
        }
        Some(SourceFrame {
            frame_number: n,
            frame,
        })
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}
