use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::detect::BackendRegistry;
#[cfg(feature = "backend-tract")]
use crate::detect::{FrameDetector, TractBackend};
use crate::temporal::{
    LstmScorer, LstmWeights, SequenceScorer, TemporalConfig, DEFAULT_BASE_CONFIDENCE,
    DEFAULT_DECISION_THRESHOLD, DEFAULT_FEATURE_DIM, DEFAULT_HIDDEN_SIZE, DEFAULT_NUM_LAYERS,
    DEFAULT_SCORER_SEED, DEFAULT_SEQUENCE_LENGTH, RESERVED_SLOTS,
};

const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_MODEL_WIDTH: u32 = 224;
const DEFAULT_MODEL_HEIGHT: u32 = 224;

#[derive(Debug, Deserialize, Default)]
struct AnalyzerConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    labels_path: Option<PathBuf>,
    model_width: Option<u32>,
    model_height: Option<u32>,
    base_confidence_threshold: Option<f32>,
    temporal: Option<TemporalConfigFile>,
    ingest: Option<IngestConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct TemporalConfigFile {
    sequence_length: Option<usize>,
    hidden_size: Option<usize>,
    num_layers: Option<usize>,
    feature_dim: Option<usize>,
    decision_threshold: Option<f32>,
    fast_path: Option<bool>,
    weights_path: Option<PathBuf>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct IngestConfigFile {
    skip_frames: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub backend: String,
    pub model: ModelSettings,
    pub base_confidence_threshold: f32,
    pub temporal: TemporalSettings,
    pub ingest: IngestSettings,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub model_path: Option<PathBuf>,
    pub labels_path: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct TemporalSettings {
    pub sequence_length: usize,
    pub hidden_size: usize,
    pub num_layers: usize,
    pub feature_dim: usize,
    pub decision_threshold: f32,
    pub fast_path: bool,
    pub weights_path: Option<PathBuf>,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub skip_frames: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self::from_file(AnalyzerConfigFile::default())
    }
}

impl AnalyzerConfig {
    /// Load from `ANIMAL_CONFIG` (if set), then apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("ANIMAL_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Load from an explicit file (if any), then apply env overrides.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AnalyzerConfigFile) -> Self {
        let temporal = file.temporal.unwrap_or_default();
        Self {
            backend: file.backend.unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
            model: ModelSettings {
                model_path: file.model_path,
                labels_path: file.labels_path,
                width: file.model_width.unwrap_or(DEFAULT_MODEL_WIDTH),
                height: file.model_height.unwrap_or(DEFAULT_MODEL_HEIGHT),
            },
            base_confidence_threshold: file
                .base_confidence_threshold
                .unwrap_or(DEFAULT_BASE_CONFIDENCE),
            temporal: TemporalSettings {
                sequence_length: temporal.sequence_length.unwrap_or(DEFAULT_SEQUENCE_LENGTH),
                hidden_size: temporal.hidden_size.unwrap_or(DEFAULT_HIDDEN_SIZE),
                num_layers: temporal.num_layers.unwrap_or(DEFAULT_NUM_LAYERS),
                feature_dim: temporal.feature_dim.unwrap_or(DEFAULT_FEATURE_DIM),
                decision_threshold: temporal
                    .decision_threshold
                    .unwrap_or(DEFAULT_DECISION_THRESHOLD),
                fast_path: temporal.fast_path.unwrap_or(true),
                weights_path: temporal.weights_path,
                seed: temporal.seed.unwrap_or(DEFAULT_SCORER_SEED),
            },
            ingest: IngestSettings {
                skip_frames: file
                    .ingest
                    .and_then(|ingest| ingest.skip_frames)
                    .unwrap_or(0),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(backend) = std::env::var("ANIMAL_BACKEND") {
            if !backend.trim().is_empty() {
                self.backend = backend.trim().to_string();
            }
        }
        if let Ok(path) = std::env::var("ANIMAL_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(path) = std::env::var("ANIMAL_SCORER_WEIGHTS") {
            if !path.trim().is_empty() {
                self.temporal.weights_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(threshold) = std::env::var("ANIMAL_DECISION_THRESHOLD") {
            self.temporal.decision_threshold = threshold
                .trim()
                .parse()
                .map_err(|_| anyhow!("ANIMAL_DECISION_THRESHOLD must be a number"))?;
        }
        if let Ok(length) = std::env::var("ANIMAL_SEQUENCE_LENGTH") {
            self.temporal.sequence_length = length
                .trim()
                .parse()
                .map_err(|_| anyhow!("ANIMAL_SEQUENCE_LENGTH must be a positive integer"))?;
        }
        if let Ok(skip) = std::env::var("ANIMAL_SKIP_FRAMES") {
            self.ingest.skip_frames = skip
                .trim()
                .parse()
                .map_err(|_| anyhow!("ANIMAL_SKIP_FRAMES must be a non-negative integer"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend.trim().is_empty() {
            return Err(anyhow!("backend must not be empty"));
        }
        if self.temporal.feature_dim <= RESERVED_SLOTS {
            return Err(anyhow!(
                "temporal.feature_dim must be greater than {}",
                RESERVED_SLOTS
            ));
        }
        if self.temporal.hidden_size == 0 {
            return Err(anyhow!("temporal.hidden_size must be at least 1"));
        }
        if self.temporal.num_layers == 0 {
            return Err(anyhow!("temporal.num_layers must be at least 1"));
        }
        if self.model.width == 0 || self.model.height == 0 {
            return Err(anyhow!("model input size must be non-zero"));
        }
        self.temporal_config().validate()?;
        Ok(())
    }

    /// Temporal decision settings for sessions built from this config.
    pub fn temporal_config(&self) -> TemporalConfig {
        TemporalConfig {
            sequence_length: self.temporal.sequence_length,
            feature_dim: self.temporal.feature_dim,
            decision_threshold: self.temporal.decision_threshold,
            fast_path: self.temporal.fast_path,
            base_confidence_threshold: Some(self.base_confidence_threshold),
        }
    }

    /// Frozen sequence scorer: checkpoint if configured, seeded weights otherwise.
    pub fn build_scorer(&self) -> Result<Arc<dyn SequenceScorer>> {
        let t = &self.temporal;
        let weights = match &t.weights_path {
            Some(path) => {
                let weights = LstmWeights::from_json_file(path)?;
                if weights.input_size != t.feature_dim
                    || weights.hidden_size != t.hidden_size
                    || weights.num_layers() != t.num_layers
                {
                    return Err(anyhow!(
                        "scorer checkpoint {} is {}x{}x{} (input x hidden x layers), configured {}x{}x{}",
                        path.display(),
                        weights.input_size,
                        weights.hidden_size,
                        weights.num_layers(),
                        t.feature_dim,
                        t.hidden_size,
                        t.num_layers
                    ));
                }
                log::info!("scorer weights loaded from {}", path.display());
                weights
            }
            None => {
                log::info!(
                    "scorer weights seeded (seed {}, hidden {}, layers {})",
                    t.seed,
                    t.hidden_size,
                    t.num_layers
                );
                LstmWeights::seeded(t.feature_dim, t.hidden_size, t.num_layers, t.seed)
            }
        };
        let scorer = LstmScorer::new(weights, t.sequence_length)?;
        Ok(Arc::new(scorer))
    }

    /// Registry with the built-in backends plus any configured model backend.
    pub fn build_registry(&self) -> Result<BackendRegistry> {
        let mut registry = BackendRegistry::with_builtin();

        self.register_model_backend(&mut registry)?;

        if !registry.contains(&self.backend) {
            return Err(anyhow!(
                "backend '{}' is not available (available: {})",
                self.backend,
                registry.list().join(", ")
            ));
        }
        registry
            .set_default(&self.backend)
            .context("select configured backend")?;
        Ok(registry)
    }

    #[cfg(feature = "backend-tract")]
    fn register_model_backend(&self, registry: &mut BackendRegistry) -> Result<()> {
        let Some(model_path) = &self.model.model_path else {
            return Ok(());
        };
        let mut backend = TractBackend::new(model_path, self.model.width, self.model.height)
            .with_threshold(self.base_confidence_threshold);
        if let Some(labels_path) = &self.model.labels_path {
            backend = backend.with_labels(labels_path);
        }
        backend.load().context("load tract model")?;
        registry.register("tract", move || {
            Ok(Box::new(backend.clone()) as Box<dyn FrameDetector>)
        });
        Ok(())
    }

    #[cfg(not(feature = "backend-tract"))]
    fn register_model_backend(&self, _registry: &mut BackendRegistry) -> Result<()> {
        if self.model.model_path.is_some() {
            log::warn!("model_path is set but the backend-tract feature is disabled");
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<AnalyzerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = AnalyzerConfig::default();
        assert_eq!(cfg.backend, "stub");
        assert_eq!(cfg.temporal.sequence_length, 5);
        assert_eq!(cfg.temporal.feature_dim, 128);
        assert_eq!(cfg.temporal.hidden_size, 128);
        assert_eq!(cfg.temporal.num_layers, 2);
        assert_eq!(cfg.temporal.decision_threshold, 0.3);
        assert!(cfg.temporal.fast_path);
        assert_eq!(cfg.ingest.skip_frames, 0);
        assert_eq!(cfg.temporal_config(), TemporalConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_feature_dim_without_class_slots() {
        let mut cfg = AnalyzerConfig::default();
        cfg.temporal.feature_dim = RESERVED_SLOTS;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_threshold_out_of_range() {
        let mut cfg = AnalyzerConfig::default();
        cfg.temporal.decision_threshold = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn seeded_scorer_matches_configured_shape() -> Result<()> {
        let mut cfg = AnalyzerConfig::default();
        cfg.temporal.hidden_size = 16;
        cfg.temporal.num_layers = 1;
        let scorer = cfg.build_scorer()?;
        assert_eq!(scorer.feature_dim(), 128);
        assert_eq!(scorer.sequence_length(), 5);
        Ok(())
    }

    #[test]
    fn registry_requires_known_backend() {
        let mut cfg = AnalyzerConfig::default();
        assert!(cfg.build_registry().is_ok());
        cfg.backend = "yolo".to_string();
        assert!(cfg.build_registry().is_err());
    }
}
