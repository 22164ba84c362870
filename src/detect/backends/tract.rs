#![cfg(feature = "backend-tract")]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::FrameDetector;
use crate::detect::labels::AnimalLabels;
use crate::detect::result::{Detection, DetectionResult};
use crate::frame::Frame;

type Plan = TypedRunnableModel<TypedModel>;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Tract-based whole-frame classifier for ONNX models.
///
/// The model maps one RGB frame to class scores; the top-1 class is reported
/// as a single box-less detection when it is an animal. Frames are resized
/// (nearest neighbour) to the model input and ImageNet-normalized.
///
/// Cloning shares the loaded plan: sessions get their own backend instance
/// without reloading weights.
#[derive(Clone)]
pub struct TractBackend {
    model_path: PathBuf,
    labels_path: Option<PathBuf>,
    model: Option<Arc<Plan>>,
    labels: Arc<Vec<String>>,
    animals: AnimalLabels,
    width: u32,
    height: u32,
    confidence_threshold: f32,
}

impl TractBackend {
    /// Configure a backend. Nothing is read from disk until `load`.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            labels_path: None,
            model: None,
            labels: Arc::new(Vec::new()),
            animals: AnimalLabels::imagenet(),
            width,
            height,
            confidence_threshold: 0.5,
        }
    }

    /// Class label file, one label per line in model output order.
    pub fn with_labels<P: AsRef<Path>>(mut self, labels_path: P) -> Self {
        self.labels_path = Some(labels_path.as_ref().to_path_buf());
        self
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn load_plan(&self) -> Result<Plan> {
        tract_onnx::onnx()
            .model_for_path(&self.model_path)
            .with_context(|| {
                format!(
                    "failed to load ONNX model from {}",
                    self.model_path.display()
                )
            })?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, self.height as usize, self.width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")
    }

    fn load_labels(&self) -> Result<Vec<String>> {
        let Some(path) = &self.labels_path else {
            return Ok(Vec::new());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read labels from {}", path.display()))?;
        Ok(raw.lines().map(|line| line.trim().to_string()).collect())
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        if frame.width == 0 || frame.height == 0 {
            return Err(anyhow!("cannot classify an empty frame"));
        }
        let (src_w, src_h) = (frame.width as usize, frame.height as usize);
        let (dst_w, dst_h) = (self.width as usize, self.height as usize);
        let pixels = frame.pixels();

        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, dst_h, dst_w),
            |(_, channel, y, x)| {
                let sx = (x * src_w / dst_w).min(src_w - 1);
                let sy = (y * src_h / dst_h).min(src_h - 1);
                let value = pixels[(sy * src_w + sx) * 3 + channel] as f32 / 255.0;
                (value - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel]
            },
        );

        Ok(input.into_tensor())
    }

    fn top_class(&self, outputs: TVec<TValue>) -> Result<(usize, f32)> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let logits = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let max_logit = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        if !max_logit.is_finite() {
            return Err(anyhow!("model output has no finite scores"));
        }
        let denom: f32 = logits.iter().map(|v| (v - max_logit).exp()).sum();
        let (index, best) = logits
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .ok_or_else(|| anyhow!("model output was empty"))?;
        Ok((index, (best - max_logit).exp() / denom))
    }

    fn label_for(&self, index: usize) -> String {
        self.labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", index))
    }
}

impl FrameDetector for TractBackend {
    fn name(&self) -> &str {
        "tract"
    }

    fn load(&mut self) -> Result<()> {
        if self.model.is_some() {
            return Ok(());
        }
        self.labels = Arc::new(self.load_labels()?);
        self.model = Some(Arc::new(self.load_plan()?));
        log::info!(
            "tract backend loaded {} ({} labels)",
            self.model_path.display(),
            self.labels.len()
        );
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    fn infer(&mut self, frame: &Frame) -> Result<DetectionResult> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| anyhow!("tract backend used before load"))?;
        let input = self.build_input(frame)?;
        let outputs = model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let (index, confidence) = self.top_class(outputs)?;
        let label = self.label_for(index);

        if confidence < self.confidence_threshold || !self.animals.is_animal(&label) {
            return Ok(DetectionResult::empty());
        }
        Ok(DetectionResult::from_detections(vec![Detection::new(
            label, confidence,
        )]))
    }

    fn set_confidence_threshold(&mut self, threshold: f32) {
        self.confidence_threshold = threshold;
    }
}
