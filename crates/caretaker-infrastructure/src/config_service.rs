//! Configuration service implementation.
//!
//! Loads the root configuration from `config.toml`
//! (`~/.config/caretaker/config.toml` unless a path is given), applies
//! environment overrides for the backend connection and validates the
//! result.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use caretaker_core::config::RootConfig;
use caretaker_core::error::Result;

use crate::paths::CaretakerPaths;

/// Overrides `backend.url`.
pub const ENV_BACKEND_URL: &str = "CARETAKER_BACKEND_URL";
/// Overrides `backend.publishable_key`.
pub const ENV_BACKEND_KEY: &str = "CARETAKER_BACKEND_KEY";

/// Configuration service that loads and caches the root configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration, filled on first successful load.
    config: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Service for the platform default location.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(CaretakerPaths::config_file()?))
    }

    /// Service for `path` if given, else the default location.
    pub fn for_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Ok(Self::new(path)),
            None => Self::default_location(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the root configuration, loading it from disk if not cached.
    pub fn get_config(&self) -> Result<RootConfig> {
        {
            let cached = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(config) = cached.as_ref() {
                return Ok(config.clone());
            }
        }

        let loaded = self.load()?;
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn load(&self) -> Result<RootConfig> {
        let mut config = if self.path.exists() {
            let raw = std::fs::read_to_string(&self.path)?;
            toml::from_str::<RootConfig>(&raw)?
        } else {
            tracing::debug!(
                "[ConfigService] {} not found, using defaults",
                self.path.display()
            );
            RootConfig::default()
        };

        apply_env_overrides(&mut config, |name| std::env::var(name).ok());
        config.validate()?;
        for platform in config.auth.watchdog_shortfalls() {
            tracing::warn!(
                "[ConfigService] Retry budget {:?} exceeds the {:?} watchdog ({:?}); hanging requests end as timeouts there",
                config.auth.retry_budget(),
                platform,
                config.auth.watchdog(platform)
            );
        }

        tracing::debug!(
            "[ConfigService] Loaded config from {} (backend configured: {})",
            self.path.display(),
            config.backend.require().is_ok()
        );
        Ok(config)
    }
}

/// Applies backend overrides looked up through `lookup`. Empty values are
/// ignored.
pub fn apply_env_overrides(config: &mut RootConfig, lookup: impl Fn(&str) -> Option<String>) {
    let present = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(url) = present(ENV_BACKEND_URL) {
        config.backend.url = Some(url);
    }
    if let Some(key) = present(ENV_BACKEND_KEY) {
        config.backend.publishable_key = Some(key);
    }
}
