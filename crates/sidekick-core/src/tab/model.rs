//! Chat tab domain model.
//!
//! A `ChatTab` is one independent conversation thread with its own message
//! history and processing state. All partial writes go through [`TabPatch`].

use super::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Interaction mode of a tab.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TabMode {
    /// Tool-using agent that may emit progress and actions.
    #[default]
    Agent,
    /// Plain question/answer assistant.
    Assistant,
}

/// Processing status of a tab.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TabStatus {
    #[default]
    Idle,
    Processing,
    Error,
}

/// Lifecycle state of a retryable agent action.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Pending,
    InProgress,
    Done,
    Failed,
}

/// An action produced while processing a message, retryable by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAction {
    pub id: String,
    /// Short human-readable label ("Retry message", tool name, ...)
    pub label: String,
    pub status: ActionStatus,
    /// Tab that produced the action
    pub tab_id: String,
    /// Index of the message the action is attached to
    pub message_index: usize,
    /// Prompt re-submitted when the action is retried
    pub prompt: String,
}

/// Represents one conversation tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTab {
    /// Unique tab identifier (UUID format)
    pub id: String,
    /// Human-readable tab name
    pub name: String,
    /// Ordered conversation history
    pub messages: Vec<Message>,
    /// Current draft text
    pub input: String,
    pub mode: TabMode,
    pub is_processing: bool,
    pub status: TabStatus,
    pub pinned: bool,
    pub last_activity: DateTime<Utc>,
    #[serde(default)]
    pub agent_actions: Vec<AgentAction>,
}

impl ChatTab {
    /// Creates an empty idle tab.
    pub fn new(id: String, name: String, mode: TabMode) -> Self {
        Self {
            id,
            name,
            messages: Vec::new(),
            input: String::new(),
            mode,
            is_processing: false,
            status: TabStatus::Idle,
            pinned: false,
            last_activity: Utc::now(),
            agent_actions: Vec::new(),
        }
    }

    /// Shallow-merges the fields present in `patch`.
    ///
    /// `last_activity` only changes when the patch carries it.
    pub fn apply(&mut self, patch: TabPatch) {
        let TabPatch {
            name,
            messages,
            input,
            mode,
            is_processing,
            status,
            pinned,
            last_activity,
            agent_actions,
        } = patch;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(messages) = messages {
            self.messages = messages;
        }
        if let Some(input) = input {
            self.input = input;
        }
        if let Some(mode) = mode {
            self.mode = mode;
        }
        if let Some(is_processing) = is_processing {
            self.is_processing = is_processing;
        }
        if let Some(status) = status {
            self.status = status;
        }
        if let Some(pinned) = pinned {
            self.pinned = pinned;
        }
        if let Some(last_activity) = last_activity {
            self.last_activity = last_activity;
        }
        if let Some(agent_actions) = agent_actions {
            self.agent_actions = agent_actions;
        }
    }

    /// Messages that are part of the conversation proper (no progress markers).
    pub fn visible_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| !m.is_transient_progress())
    }

    pub fn action(&self, action_id: &str) -> Option<&AgentAction> {
        self.agent_actions.iter().find(|a| a.id == action_id)
    }
}

/// Partial update for a [`ChatTab`]; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabPatch {
    pub name: Option<String>,
    pub messages: Option<Vec<Message>>,
    pub input: Option<String>,
    pub mode: Option<TabMode>,
    pub is_processing: Option<bool>,
    pub status: Option<TabStatus>,
    pub pinned: Option<bool>,
    pub last_activity: Option<DateTime<Utc>>,
    pub agent_actions: Option<Vec<AgentAction>>,
}

impl TabPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn mode(mut self, mode: TabMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn processing(mut self, is_processing: bool) -> Self {
        self.is_processing = Some(is_processing);
        self
    }

    pub fn status(mut self, status: TabStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = Some(pinned);
        self
    }

    pub fn touched_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_activity = Some(at);
        self
    }

    pub fn touched_now(self) -> Self {
        self.touched_at(Utc::now())
    }

    pub fn agent_actions(mut self, actions: Vec<AgentAction>) -> Self {
        self.agent_actions = Some(actions);
        self
    }

    /// Patch for the idle state (`status=idle`, `is_processing=false`).
    pub fn idle() -> Self {
        Self::new().status(TabStatus::Idle).processing(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tab() -> ChatTab {
        ChatTab::new("t1".to_string(), "Chat 1".to_string(), TabMode::Agent)
    }

    #[test]
    fn test_apply_merges_only_present_fields() {
        let mut t = tab();
        t.input = "draft".to_string();
        let before = t.last_activity;

        t.apply(TabPatch::new().status(TabStatus::Processing).processing(true));

        assert_eq!(t.status, TabStatus::Processing);
        assert!(t.is_processing);
        assert_eq!(t.input, "draft");
        assert_eq!(t.name, "Chat 1");
        assert_eq!(t.last_activity, before);
    }

    #[test]
    fn test_apply_sets_last_activity_when_supplied() {
        let mut t = tab();
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        t.apply(TabPatch::new().touched_at(at));
        assert_eq!(t.last_activity, at);
    }

    #[test]
    fn test_visible_messages_skip_progress() {
        use crate::tab::message::{MessageMetadata, PLANNING_METADATA};

        let mut t = tab();
        t.messages.push(Message::user("hello"));
        t.messages.push(
            Message::assistant("Step 1/2")
                .with_metadata(MessageMetadata::new(PLANNING_METADATA, serde_json::Value::Null)),
        );
        t.messages.push(Message::assistant("done"));

        let visible: Vec<_> = t.visible_messages().map(|m| m.content.as_str()).collect();
        assert_eq!(visible, vec!["hello", "done"]);
    }

    #[test]
    fn test_status_string_forms() {
        assert_eq!(TabStatus::Error.to_string(), "error");
        assert_eq!(ActionStatus::InProgress.to_string(), "in_progress");
        assert_eq!(TabMode::default(), TabMode::Agent);
    }
}
