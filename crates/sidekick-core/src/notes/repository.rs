//! Note repository trait.
//!
//! Defines the interface for knowledge-note persistence.

use super::model::Note;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for knowledge notes.
///
/// All operations are asynchronous and may fail; callers treat failures as
/// non-fatal and keep their optimistic state.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Loads every persisted note, in storage order.
    async fn load_notes(&self) -> Result<Vec<Note>>;

    /// Persists a single note.
    async fn add_note(&self, note: &Note) -> Result<()>;

    /// Removes a note by id. Removing an unknown id succeeds.
    async fn remove_note(&self, note_id: &str) -> Result<()>;

    /// Removes all notes.
    async fn clear_notes(&self) -> Result<()>;
}
