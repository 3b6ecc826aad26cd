//! Domain layer of the Sidekick assistant panel.
//!
//! Pure state containers and functions: tabs and messages, knowledge notes,
//! reasoning extraction, panel width reconciliation, share/export encoding,
//! plus the traits for the external collaborators (agent, note storage,
//! key-value storage) and the typed event bus.

pub mod agent;
pub mod config;
pub mod error;
pub mod event;
pub mod export;
pub mod layout;
pub mod notes;
pub mod reasoning;
pub mod share;
pub mod storage;
pub mod tab;

// Re-export common error type
pub use error::{Result, SidekickError};
