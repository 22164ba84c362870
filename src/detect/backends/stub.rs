use anyhow::Result;

use crate::detect::backend::FrameDetector;
use crate::detect::result::{BoundingBox, Detection, DetectionResult};
use crate::frame::Frame;

/// Channel value above which a pixel counts as foreground.
const FOREGROUND_LEVEL: u8 = 128;

/// Stub backend for testing and synthetic scenes.
///
/// Treats bright pixels on a dark background as one animal. The bounding box
/// spans every foreground pixel; the label follows the dominant color channel
/// (red = dog, green = cat, blue = bird) and confidence is the mean peak
/// channel intensity of the foreground.
pub struct StubBackend {
    loaded: bool,
    confidence_threshold: f32,
    min_pixels: usize,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            loaded: false,
            confidence_threshold: 0.6,
            min_pixels: 4,
        }
    }

    /// Minimum foreground pixel count for a detection.
    pub fn with_min_pixels(mut self, min_pixels: usize) -> Self {
        self.min_pixels = min_pixels.max(1);
        self
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDetector for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    fn load(&mut self) -> Result<()> {
        self.loaded = true;
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn infer(&mut self, frame: &Frame) -> Result<DetectionResult> {
        let mut count = 0usize;
        let mut intensity_sum = 0u64;
        let mut channel_sums = [0u64; 3];
        let (mut x1, mut y1, mut x2, mut y2) = (u32::MAX, u32::MAX, 0u32, 0u32);

        for (idx, px) in frame.pixels().chunks_exact(3).enumerate() {
            let peak = px[0].max(px[1]).max(px[2]);
            if peak < FOREGROUND_LEVEL {
                continue;
            }
            let x = (idx % frame.width as usize) as u32;
            let y = (idx / frame.width as usize) as u32;
            x1 = x1.min(x);
            y1 = y1.min(y);
            x2 = x2.max(x + 1);
            y2 = y2.max(y + 1);
            count += 1;
            intensity_sum += peak as u64;
            for (sum, &c) in channel_sums.iter_mut().zip(px) {
                *sum += c as u64;
            }
        }

        if count < self.min_pixels {
            return Ok(DetectionResult::empty());
        }

        let confidence = intensity_sum as f32 / (count as f32 * 255.0);
        if confidence < self.confidence_threshold {
            return Ok(DetectionResult::empty());
        }

        let label = match channel_sums
            .iter()
            .enumerate()
            .max_by_key(|(_, sum)| **sum)
            .map(|(i, _)| i)
        {
            Some(1) => "cat",
            Some(2) => "bird",
            _ => "dog",
        };

        let detection = Detection::new(label, confidence).with_bbox(BoundingBox::new(
            x1 as f32, y1 as f32, x2 as f32, y2 as f32,
        ));
        Ok(DetectionResult::from_detections(vec![detection]))
    }

    fn set_confidence_threshold(&mut self, threshold: f32) {
        self.confidence_threshold = threshold;
    }
}
