//! [`NoteRepository`] implementations.

use super::atomic_toml::StorageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sidekick_core::error::Result;
use sidekick_core::notes::{Note, NoteRepository};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Debug, Default, Serialize, Deserialize)]
struct NotesDocument {
    #[serde(default)]
    notes: Vec<Note>,
}

/// Notes stored as one JSON document.
///
/// Writers are serialized through an async mutex and replace the file via
/// temp file + rename.
#[derive(Debug)]
pub struct JsonNoteRepository {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonNoteRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> std::result::Result<NotesDocument, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(NotesDocument::default());
            }
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(NotesDocument::default());
        }
        serde_json::from_slice(&bytes).map_err(|source| StorageError::Json {
            path: self.path.clone(),
            source,
        })
    }

    async fn write(&self, document: &NotesDocument) -> std::result::Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent, e))?;
        }

        let body = serde_json::to_vec_pretty(document).map_err(|source| StorageError::Json {
            path: self.path.clone(),
            source,
        })?;
        let tmp_path = self.path.with_extension("json.tmp");
        let mut tmp = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|e| StorageError::io(&tmp_path, e))?;
        tmp.write_all(&body)
            .await
            .map_err(|e| StorageError::io(&tmp_path, e))?;
        tmp.sync_all()
            .await
            .map_err(|e| StorageError::io(&tmp_path, e))?;
        drop(tmp);

        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| StorageError::io(&self.path, e))
    }

    /// Read-modify-write under the writer lock. Skips the write when `f`
    /// reports no change.
    async fn modify<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut NotesDocument) -> bool + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read().await?;
        if f(&mut document) {
            self.write(&document).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl NoteRepository for JsonNoteRepository {
    async fn load_notes(&self) -> Result<Vec<Note>> {
        let document = self.read().await?;
        tracing::debug!(
            "[JsonNoteRepository] Loaded {} notes from {}",
            document.notes.len(),
            self.path.display()
        );
        Ok(document.notes)
    }

    async fn add_note(&self, note: &Note) -> Result<()> {
        self.modify(|document| {
            if document.notes.iter().any(|n| n.id == note.id) {
                return false;
            }
            document.notes.push(note.clone());
            true
        })
        .await
    }

    async fn remove_note(&self, note_id: &str) -> Result<()> {
        self.modify(|document| {
            let before = document.notes.len();
            document.notes.retain(|n| n.id != note_id);
            document.notes.len() != before
        })
        .await
    }

    async fn clear_notes(&self) -> Result<()> {
        self.modify(|document| {
            let changed = !document.notes.is_empty();
            document.notes.clear();
            changed
        })
        .await
    }
}

/// Notes kept in memory only.
#[derive(Debug, Default)]
pub struct InMemoryNoteRepository {
    notes: Mutex<Vec<Note>>,
}

impl InMemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notes(notes: Vec<Note>) -> Self {
        Self {
            notes: Mutex::new(notes),
        }
    }
}

#[async_trait]
impl NoteRepository for InMemoryNoteRepository {
    async fn load_notes(&self) -> Result<Vec<Note>> {
        Ok(self.notes.lock().await.clone())
    }

    async fn add_note(&self, note: &Note) -> Result<()> {
        let mut notes = self.notes.lock().await;
        if !notes.iter().any(|n| n.id == note.id) {
            notes.push(note.clone());
        }
        Ok(())
    }

    async fn remove_note(&self, note_id: &str) -> Result<()> {
        self.notes.lock().await.retain(|n| n.id != note_id);
        Ok(())
    }

    async fn clear_notes(&self) -> Result<()> {
        self.notes.lock().await.clear();
        Ok(())
    }
}
