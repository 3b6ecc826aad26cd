//! Knowledge notes with optimistic updates.
//!
//! User actions change the in-memory list first and then persist in the
//! background of the call. Persistence failures are logged and never roll the
//! optimistic state back.

use sidekick_core::error::Result;
use sidekick_core::notes::{Note, NoteList, NoteRepository, merge_notes};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Application service owning the current note list.
pub struct KnowledgeNotesService {
    repository: Arc<dyn NoteRepository>,
    notes: RwLock<NoteList>,
}

impl KnowledgeNotesService {
    pub fn new(repository: Arc<dyn NoteRepository>) -> Self {
        Self {
            repository,
            notes: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Current list. Unchanged lists keep the same `Arc`.
    pub async fn notes(&self) -> NoteList {
        Arc::clone(&*self.notes.read().await)
    }

    /// Adds a note at the head of the list, then persists it.
    pub async fn add(&self, author: &str, content: &str) -> Note {
        let note = Note::new(author, content);
        {
            let mut notes = self.notes.write().await;
            let mut next = Vec::with_capacity(notes.len() + 1);
            next.push(note.clone());
            next.extend(notes.iter().cloned());
            *notes = Arc::new(next);
        }

        if let Err(e) = self.repository.add_note(&note).await {
            tracing::warn!("[KnowledgeNotes] Failed to persist note {}: {}", note.id, e);
        }
        note
    }

    /// Removes a note locally, then from storage.
    ///
    /// # Returns
    ///
    /// `true` if the note was in the local list.
    pub async fn remove(&self, note_id: &str) -> bool {
        let removed = {
            let mut notes = self.notes.write().await;
            if notes.iter().any(|n| n.id == note_id) {
                let next: Vec<Note> = notes.iter().filter(|n| n.id != note_id).cloned().collect();
                *notes = Arc::new(next);
                true
            } else {
                false
            }
        };

        if let Err(e) = self.repository.remove_note(note_id).await {
            tracing::warn!("[KnowledgeNotes] Failed to remove note {}: {}", note_id, e);
        }
        removed
    }

    pub async fn clear(&self) {
        *self.notes.write().await = Arc::new(Vec::new());
        if let Err(e) = self.repository.clear_notes().await {
            tracing::warn!("[KnowledgeNotes] Failed to clear notes: {}", e);
        }
    }

    /// Loads persisted notes and merges them behind the optimistic ones.
    ///
    /// # Errors
    ///
    /// Returns the load error after logging it; the local list is untouched.
    pub async fn refresh(&self) -> Result<NoteList> {
        let loaded = match self.repository.load_notes().await {
            Ok(loaded) => Arc::new(loaded),
            Err(e) => {
                tracing::warn!("[KnowledgeNotes] Failed to load notes: {}", e);
                return Err(e);
            }
        };

        let mut notes = self.notes.write().await;
        let merged = merge_notes(&notes, &loaded);
        if !Arc::ptr_eq(&merged, &notes) {
            tracing::debug!(
                "[KnowledgeNotes] Merged {} persisted notes into {} local",
                loaded.len(),
                notes.len()
            );
            *notes = Arc::clone(&merged);
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sidekick_core::error::SidekickError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct VecRepository {
        notes: Mutex<Vec<Note>>,
        broken: bool,
    }

    impl VecRepository {
        fn broken() -> Self {
            Self {
                broken: true,
                ..Default::default()
            }
        }

        fn check(&self) -> Result<()> {
            if self.broken {
                Err(SidekickError::persistence("disk full"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl NoteRepository for VecRepository {
        async fn load_notes(&self) -> Result<Vec<Note>> {
            self.check()?;
            Ok(self.notes.lock().unwrap().clone())
        }
        async fn add_note(&self, note: &Note) -> Result<()> {
            self.check()?;
            self.notes.lock().unwrap().push(note.clone());
            Ok(())
        }
        async fn remove_note(&self, note_id: &str) -> Result<()> {
            self.check()?;
            self.notes.lock().unwrap().retain(|n| n.id != note_id);
            Ok(())
        }
        async fn clear_notes(&self) -> Result<()> {
            self.check()?;
            self.notes.lock().unwrap().clear();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_add_keeps_newest_at_head() {
        let service = KnowledgeNotesService::new(Arc::new(VecRepository::default()));
        service.add("alice", "first").await;
        service.add("alice", "second").await;

        let notes = service.notes().await;
        assert_eq!(notes[0].content, "second");
        assert_eq!(notes[1].content, "first");
    }

    #[tokio::test]
    async fn test_refresh_merges_persisted_notes_once() {
        let repo = Arc::new(VecRepository::default());
        repo.notes.lock().unwrap().push(Note::new("bob", "from disk"));
        let service = KnowledgeNotesService::new(repo.clone());
        let local = service.add("alice", "typed").await;

        let merged = service.refresh().await.unwrap();
        // "typed" was also persisted, so only "from disk" is new.
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, local.id);
        assert_eq!(merged[1].content, "from disk");

        let before = service.notes().await;
        let again = service.refresh().await.unwrap();
        assert!(Arc::ptr_eq(&before, &again));
    }

    #[tokio::test]
    async fn test_persistence_failures_keep_optimistic_state() {
        let service = KnowledgeNotesService::new(Arc::new(VecRepository::broken()));
        let note = service.add("alice", "kept").await;

        assert!(service.refresh().await.unwrap_err().is_persistence());
        assert_eq!(service.notes().await.len(), 1);

        assert!(service.remove(&note.id).await);
        assert!(service.notes().await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_and_remove_unknown() {
        let repo = Arc::new(VecRepository::default());
        let service = KnowledgeNotesService::new(repo.clone());
        service.add("a", "x").await;
        assert!(!service.remove("nope").await);

        service.clear().await;
        assert!(service.notes().await.is_empty());
        assert!(repo.notes.lock().unwrap().is_empty());
    }
}
