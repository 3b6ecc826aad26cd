//! Durable key-value storage for panel layout state.
//!
//! Width and open/closed state survive reloads under fixed keys. Values are
//! stored as strings; readers treat unparsable values as absent.

use crate::error::Result;

/// Key holding the last adopted panel width in pixels.
pub const PANEL_WIDTH_KEY: &str = "sidekick.panel.width";
/// Key holding `"true"`/`"false"` for the panel visibility.
pub const PANEL_OPEN_KEY: &str = "sidekick.panel.open";

/// Synchronous string key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Reads a persisted width, ignoring storage errors and garbage values.
pub fn read_width(store: &dyn KeyValueStore) -> Option<u32> {
    match store.get(PANEL_WIDTH_KEY) {
        Ok(value) => value.and_then(|v| v.trim().parse::<f64>().ok()).and_then(|w| {
            if w.is_finite() && w > 0.0 {
                Some(w.round() as u32)
            } else {
                None
            }
        }),
        Err(e) => {
            tracing::warn!("[Storage] Failed to read panel width: {}", e);
            None
        }
    }
}

/// Reads the persisted open flag (`None` when never stored).
pub fn read_open(store: &dyn KeyValueStore) -> Option<bool> {
    match store.get(PANEL_OPEN_KEY) {
        Ok(value) => value.and_then(|v| v.trim().parse::<bool>().ok()),
        Err(e) => {
            tracing::warn!("[Storage] Failed to read panel state: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapStore(Mutex<HashMap<String, String>>);

    impl KeyValueStore for MapStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.0.lock().unwrap().get(key).cloned())
        }
        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.0.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }
        fn remove(&self, key: &str) -> Result<()> {
            self.0.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[test]
    fn test_read_width_parses_and_rejects_garbage() {
        let store = MapStore::default();
        assert_eq!(read_width(&store), None);

        store.set(PANEL_WIDTH_KEY, "640.4").unwrap();
        assert_eq!(read_width(&store), Some(640));

        store.set(PANEL_WIDTH_KEY, "wide").unwrap();
        assert_eq!(read_width(&store), None);

        store.set(PANEL_WIDTH_KEY, "-3").unwrap();
        assert_eq!(read_width(&store), None);
    }

    #[test]
    fn test_read_open() {
        let store = MapStore::default();
        assert_eq!(read_open(&store), None);
        store.set(PANEL_OPEN_KEY, "true").unwrap();
        assert_eq!(read_open(&store), Some(true));
    }
}
