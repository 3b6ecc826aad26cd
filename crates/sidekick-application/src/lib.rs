//! Application layer for the Sidekick assistant panel.
//!
//! Coordinates the domain types from `sidekick-core` into running services:
//! the message-processing pipeline, knowledge notes, panel layout, seeding
//! and the [`SessionFacade`] tying them together.

pub mod facade;
pub mod layout;
pub mod notes;
pub mod pending;
pub mod pipeline;
mod progress;
pub mod seed;

pub use facade::{ExportedTranscript, SessionFacade, SidekickSession, SidekickSessionBuilder};
pub use layout::{NoWidthProbe, PanelLayout, StaticWidthProbe, WidthProbe};
pub use notes::KnowledgeNotesService;
pub use pipeline::{PROCESSING_ERROR_MESSAGE, ProcessingPipeline, SharedTabStore, TurnOutcome};
pub use seed::{SeedOptions, SeedReport, Seeder};
