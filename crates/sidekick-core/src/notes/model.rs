//! Knowledge note model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// A knowledge item attached to the assistant panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

impl Note {
    /// Creates a note with a fresh id stamped with the current time.
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            author: author.into(),
            timestamp: Utc::now(),
            content: content.into(),
        }
    }
}

/// Shared, immutable note list.
///
/// Lists are swapped wholesale; `Arc::ptr_eq` tells observers whether anything
/// changed since the last snapshot.
pub type NoteList = Arc<Vec<Note>>;
