//! File-backed and in-memory storage adapters.

pub mod atomic_toml;
pub mod key_value;
pub mod notes;

pub use atomic_toml::{AtomicTomlFile, StorageError};
pub use key_value::{InMemoryKeyValueStore, TomlKeyValueStore};
pub use notes::{InMemoryNoteRepository, JsonNoteRepository};
