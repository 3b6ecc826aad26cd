//! Path resolution for Sidekick files.
//!
//! ```text
//! ~/.config/sidekick/          # config directory
//! ├── config.toml              # SidekickConfig
//! └── state.toml               # panel width / open state
//!
//! ~/.local/share/sidekick/     # data directory
//! └── notes.json               # knowledge notes
//! ```
//!
//! A base directory override puts everything under `<base>/config` and
//! `<base>/data`, which keeps tests away from the real home directory.

use sidekick_core::error::SidekickError;
use std::path::PathBuf;
use thiserror::Error;

const APP_DIR: &str = "sidekick";

#[derive(Debug, Error)]
pub enum PathError {
    #[error("Cannot determine the {0} directory")]
    DirNotFound(&'static str),
}

impl From<PathError> for SidekickError {
    fn from(e: PathError) -> Self {
        SidekickError::config(e.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SidekickPaths {
    base: Option<PathBuf>,
}

impl SidekickPaths {
    /// `base` overrides the platform directories.
    pub fn new(base: Option<PathBuf>) -> Self {
        Self { base }
    }

    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.join("config")),
            None => dirs::config_dir()
                .map(|d| d.join(APP_DIR))
                .ok_or(PathError::DirNotFound("config")),
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.join("data")),
            None => dirs::data_dir()
                .map(|d| d.join(APP_DIR))
                .ok_or(PathError::DirNotFound("data")),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Key-value state file backing the panel layout.
    pub fn state_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("state.toml"))
    }

    pub fn notes_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("notes.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_override() {
        let paths = SidekickPaths::new(Some(PathBuf::from("/tmp/sk")));
        assert_eq!(paths.config_file().unwrap(), PathBuf::from("/tmp/sk/config/config.toml"));
        assert_eq!(paths.state_file().unwrap(), PathBuf::from("/tmp/sk/config/state.toml"));
        assert_eq!(paths.notes_file().unwrap(), PathBuf::from("/tmp/sk/data/notes.json"));
    }

    #[test]
    fn test_platform_dirs_end_with_app_dir() {
        if let Ok(dir) = SidekickPaths::default().config_dir() {
            assert!(dir.ends_with(APP_DIR));
        }
    }
}
