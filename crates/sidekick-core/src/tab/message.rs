//! Conversation message types.
//!
//! Messages carry a role, their text content and an optional tagged metadata
//! payload. Transient progress markers are ordinary assistant messages whose
//! metadata is tagged `planning`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Metadata tag used for transient progress messages.
pub const PLANNING_METADATA: &str = "planning";

/// Represents the role of a message in a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageRole {
    /// Message typed by the user.
    User,
    /// Message produced by the assistant (or an error/progress notice).
    Assistant,
}

/// Tagged metadata attached to a message (`{type, data}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl MessageMetadata {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }
}

/// A single message in a tab's conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender.
    pub role: MessageRole,
    /// The content of the message. Assistant content may embed a reasoning block.
    pub content: String,
    /// Optional tagged payload (progress markers, seeded flags, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Returns the metadata tag, if any.
    pub fn metadata_kind(&self) -> Option<&str> {
        self.metadata.as_ref().map(|m| m.kind.as_str())
    }

    /// True for progress markers that must never survive turn finalization.
    pub fn is_transient_progress(&self) -> bool {
        self.metadata_kind() == Some(PLANNING_METADATA)
    }
}
