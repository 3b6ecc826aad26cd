//! Infrastructure layer for Sidekick.
//!
//! File-backed implementations of the storage traits from `sidekick-core`,
//! configuration loading, path resolution and logging setup.

pub mod config_service;
pub mod logging;
pub mod paths;
pub mod storage;

pub use config_service::ConfigService;
pub use logging::init_logging;
pub use paths::SidekickPaths;
pub use storage::{
    AtomicTomlFile, InMemoryKeyValueStore, InMemoryNoteRepository, JsonNoteRepository,
    StorageError, TomlKeyValueStore,
};
