//! Configuration service.
//!
//! Loads [`SidekickConfig`] from `config.toml` in the Sidekick config
//! directory and caches it. A missing file means defaults.

use crate::paths::SidekickPaths;
use sidekick_core::config::SidekickConfig;
use sidekick_core::error::Result;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Loads and caches the configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: SidekickPaths,
    /// Populated lazily on first access.
    config: Arc<RwLock<Option<SidekickConfig>>>,
}

impl ConfigService {
    pub fn new(paths: SidekickPaths) -> Self {
        Self {
            paths,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the configuration, loading it on first use.
    ///
    /// Unreadable or invalid files fall back to defaults with a warning.
    pub fn get_config(&self) -> SidekickConfig {
        if let Some(cached) = self
            .config
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
        {
            return cached.clone();
        }

        let loaded = self.load().unwrap_or_else(|e| {
            tracing::warn!("[ConfigService] Using default configuration: {}", e);
            SidekickConfig::default()
        });
        *self.config.write().unwrap_or_else(|p| p.into_inner()) = Some(loaded.clone());
        loaded
    }

    /// Forces a reload on next access.
    pub fn invalidate_cache(&self) {
        *self.config.write().unwrap_or_else(|p| p.into_inner()) = None;
    }

    /// Reads the config file without touching the cache.
    ///
    /// # Errors
    ///
    /// `Config` when no config directory can be resolved, `Io` when the file
    /// exists but cannot be read and `Serialization` for invalid TOML.
    pub fn load(&self) -> Result<SidekickConfig> {
        let path = self.config_path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                tracing::debug!("[ConfigService] Loading {}", path.display());
                SidekickConfig::from_toml_str(&content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("[ConfigService] No config at {}, using defaults", path.display());
                Ok(SidekickConfig::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn config_path(&self) -> Result<PathBuf> {
        Ok(self.paths.config_file()?)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new(SidekickPaths::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> ConfigService {
        ConfigService::new(SidekickPaths::new(Some(dir.path().to_path_buf())))
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(service(&dir).get_config(), SidekickConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let path = service.config_path().unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[pipeline]\nmin_visible_ms = 250\n").unwrap();

        let config = service.get_config();
        assert_eq!(config.pipeline.min_visible_ms, 250);
        assert_eq!(config.pipeline.watchdog_ms, 1000);
        assert_eq!(config.share.max_messages, 200);
    }

    #[test]
    fn test_cache_until_invalidated() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        assert_eq!(service.get_config().seed.virtualization_threshold, 150);

        let path = service.config_path().unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[seed]\nvirtualization_threshold = 10\n").unwrap();
        assert_eq!(service.get_config().seed.virtualization_threshold, 150);

        service.invalidate_cache();
        assert_eq!(service.get_config().seed.virtualization_threshold, 10);
    }

    #[test]
    fn test_invalid_toml_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let path = service.config_path().unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[pipeline\n").unwrap();

        assert!(service.load().is_err());
        assert_eq!(service.get_config(), SidekickConfig::default());
    }
}
