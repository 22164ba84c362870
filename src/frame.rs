//! Decoded frame container.
//!
//! Frames are produced by an ingestion source and handed to a frame detector by
//! reference. Pixel data is packed RGB24, row-major, no padding.
//!
//! Frame numbers and timestamps are attached by the pipeline, not carried here:
//! a detector sees pixels only.

use anyhow::{anyhow, Result};

/// Bytes per RGB24 pixel.
pub const RGB_CHANNELS: usize = 3;

/// One decoded video frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Wrap packed RGB24 pixels. Length must equal `width * height * 3`.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(RGB_CHANNELS))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Uniformly filled frame. Handy for tests and synthetic sources.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixel_count = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixel_count * RGB_CHANNELS);
        for _ in 0..pixel_count {
            data.extend_from_slice(&rgb);
        }
        Self {
            data,
            width,
            height,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// RGB triple at (x, y). Out-of-range coordinates return `None`.
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * RGB_CHANNELS;
        let px = self.data.get(offset..offset + RGB_CHANNELS)?;
        Some([px[0], px[1], px[2]])
    }

    /// Rec.601 luma at (x, y).
    pub fn luma_at(&self, x: u32, y: u32) -> Option<u8> {
        self.rgb_at(x, y).map(|[r, g, b]| {
            let y = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
            y.round().clamp(0.0, 255.0) as u8
        })
    }

    /// Paint an axis-aligned rectangle. Coordinates are clipped to the frame.
    pub fn fill_rect(&mut self, x1: u32, y1: u32, x2: u32, y2: u32, rgb: [u8; 3]) {
        let x2 = x2.min(self.width);
        let y2 = y2.min(self.height);
        for y in y1..y2 {
            for x in x1..x2 {
                let offset = (y as usize * self.width as usize + x as usize) * RGB_CHANNELS;
                self.data[offset..offset + RGB_CHANNELS].copy_from_slice(&rgb);
            }
        }
    }
}
