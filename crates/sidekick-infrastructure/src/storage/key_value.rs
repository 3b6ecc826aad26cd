//! [`KeyValueStore`] implementations.

use super::atomic_toml::AtomicTomlFile;
use serde::{Deserialize, Serialize};
use sidekick_core::error::Result;
use sidekick_core::storage::KeyValueStore;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct KeyValueDocument {
    #[serde(default)]
    values: BTreeMap<String, String>,
}

/// Key-value store persisted as a single TOML document, e.g.
///
/// ```toml
/// [values]
/// "sidekick.panel.width" = "720"
/// "sidekick.panel.open" = "true"
/// ```
#[derive(Debug, Clone)]
pub struct TomlKeyValueStore {
    file: AtomicTomlFile<KeyValueDocument>,
}

impl TomlKeyValueStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }
}

impl KeyValueStore for TomlKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let document = self.file.load()?;
        Ok(document.and_then(|mut d| d.values.remove(key)))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.file.update(|document| {
            let previous = document.values.insert(key.to_string(), value.to_string());
            previous.as_deref() != Some(value)
        })?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.file
            .update(|document| document.values.remove(key).is_some())?;
        Ok(())
    }
}

/// Process-local store, used when nothing should survive a restart.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values().remove(key);
        Ok(())
    }
}
