use std::collections::BTreeMap;

use anyhow::{anyhow, Result};

use super::backend::FrameDetector;

type DetectorFactory = Box<dyn Fn() -> Result<Box<dyn FrameDetector>> + Send + Sync>;

/// Named detector factories.
///
/// The registry never hands out a shared detector: every `create` call builds
/// a fresh instance so each video session owns its detector. Factories may
/// capture already-loaded weights and share them read-only.
pub struct BackendRegistry {
    factories: BTreeMap<String, DetectorFactory>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
            default_name: None,
        }
    }

    /// Registry with the built-in backends that need no model files.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("stub", || {
            Ok(Box::new(super::StubBackend::new()) as Box<dyn FrameDetector>)
        });
        registry
    }

    /// Register a factory. The first registered backend becomes the default.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Result<Box<dyn FrameDetector>> + Send + Sync + 'static,
    {
        if self.default_name.is_none() {
            self.default_name = Some(name.to_string());
        }
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.factories.contains_key(name) {
            return Err(anyhow!("backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build a fresh detector by name.
    pub fn create(&self, name: &str) -> Result<Box<dyn FrameDetector>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| anyhow!("backend '{}' not registered", name))?;
        factory()
    }

    /// Build a fresh instance of the default backend.
    pub fn create_default(&self) -> Result<Box<dyn FrameDetector>> {
        let name = self
            .default_name
            .as_deref()
            .ok_or_else(|| anyhow!("no detector backend registered"))?;
        self.create(name)
    }

    /// List registered backends.
    pub fn list(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
