use anyhow::Result;

use crate::frame::Frame;

/// Stream-level metadata reported by a source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoInfo {
    /// Native frame rate.
    pub fps: f64,
    /// Total frames in the video (may be an estimate for some containers).
    pub frame_count: u64,
    /// `frame_count / fps`, in seconds.
    pub duration: f64,
}

impl VideoInfo {
    pub fn new(fps: f64, frame_count: u64) -> Self {
        let duration = if fps > 0.0 {
            frame_count as f64 / fps
        } else {
            0.0
        };
        Self {
            fps,
            frame_count,
            duration,
        }
    }
}

/// A decoded frame and its index in the native frame sequence.
#[derive(Clone, Debug)]
pub struct SourceFrame {
    pub frame_number: u64,
    pub frame: Frame,
}

/// Finite, ordered, single-pass sequence of frames.
pub trait VideoSource {
    fn info(&self) -> VideoInfo;

    /// Next frame in video order, or `None` once the video is exhausted.
    fn next_frame(&mut self) -> Result<Option<SourceFrame>>;

    /// Native frames advanced per yielded frame.
    fn frame_stride(&self) -> u64 {
        1
    }
}

/// Frames held in memory.
pub struct MemorySource {
    frames: std::vec::IntoIter<Frame>,
    info: VideoInfo,
    next_number: u64,
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>, fps: f64) -> Self {
        let info = VideoInfo::new(fps, frames.len() as u64);
        Self {
            frames: frames.into_iter(),
            info,
            next_number: 0,
        }
    }
}

impl VideoSource for MemorySource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<SourceFrame>> {
        Ok(self.frames.next().map(|frame| {
            let frame_number = self.next_number;
            self.next_number += 1;
            SourceFrame {
                frame_number,
                frame,
            }
        }))
    }
}

/// Yields every `skip + 1`-th frame of the wrapped source.
pub struct Decimated<S> {
    inner: S,
    stride: u64,
}

impl<S: VideoSource> Decimated<S> {
    pub fn new(inner: S, skip_frames: u64) -> Self {
        Self {
            inner,
            stride: skip_frames + 1,
        }
    }
}

impl<S: VideoSource> VideoSource for Decimated<S> {
    fn info(&self) -> VideoInfo {
        self.inner.info()
    }

    fn next_frame(&mut self) -> Result<Option<SourceFrame>> {
        while let Some(next) = self.inner.next_frame()? {
            if next.frame_number % self.stride == 0 {
                return Ok(Some(next));
            }
        }
        Ok(None)
    }

    fn frame_stride(&self) -> u64 {
        self.stride * self.inner.frame_stride()
    }
}
