use crate::error::{GraftError, GraftResult};
use serde::Deserialize;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraftConfig {
    #[serde(default)]
    pub target: TargetConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_label")]
    pub label: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            label: default_label(),
        }
    }
}

fn default_base_url() -> String {
    "https://gitpod.io".to_string()
}
fn default_label() -> String {
    "Gitpod".to_string()
}

impl GraftConfig {
    pub fn from_file(path: &str) -> GraftResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| GraftError::Config(e.to_string()))
    }
}

/// Shared handle to the live configuration. The desired target URL can change
/// at runtime through this handle, independent of any page mutation.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<GraftConfig>>,
}

impl ConfigHandle {
    pub fn new(config: GraftConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, GraftConfig> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GraftConfig> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn base_url(&self) -> String {
        self.read().target.base_url.clone()
    }

    pub fn label(&self) -> String {
        self.read().target.label.clone()
    }

    pub fn set_base_url(&self, base_url: impl Into<String>) {
        self.write().target.base_url = base_url.into();
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(GraftConfig::default())
    }
}
