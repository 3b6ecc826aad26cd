//! The external agent capability.
//!
//! An agent turns a user message into an assistant reply and may report
//! progress while it works. Agents are opaque collaborators: this module only
//! fixes the interface and the normalization boundary for their replies.

use crate::error::Result;
use crate::tab::{Message, MessageMetadata, MessageRole};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Progress notification emitted by an agent while processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub step_index: Option<u32>,
    pub total_steps: Option<u32>,
    pub tool_name: Option<String>,
}

impl ProgressEvent {
    /// Text shown for the transient progress message.
    pub fn display_text(&self) -> String {
        let step = match (self.step_index, self.total_steps) {
            (Some(i), Some(n)) => Some(format!("Step {}/{}", i, n)),
            (Some(i), None) => Some(format!("Step {}", i)),
            _ => None,
        };
        let mut parts: Vec<String> = step.into_iter().collect();
        if let Some(tool) = &self.tool_name {
            parts.push(format!("[{}]", tool));
        }
        if !self.message.is_empty() {
            parts.push(self.message.clone());
        }
        if parts.is_empty() {
            "Working...".to_string()
        } else {
            parts.join(" ")
        }
    }
}

/// Callback receiving progress events. Must not block.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Role reported by an agent reply.
///
/// Agents are loose about roles; `Agent` and unknown values are folded into
/// [`MessageRole::Assistant`] by [`AgentReply::normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyRole {
    User,
    Assistant,
    Agent,
    #[serde(other)]
    Unknown,
}

impl ReplyRole {
    pub fn normalize(self) -> MessageRole {
        match self {
            ReplyRole::User => MessageRole::User,
            ReplyRole::Assistant | ReplyRole::Agent | ReplyRole::Unknown => MessageRole::Assistant,
        }
    }
}

/// An action suggested by the agent alongside its reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub label: String,
    pub prompt: String,
}

/// Raw reply returned by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    pub role: ReplyRole,
    pub content: String,
    #[serde(default)]
    pub metadata: Option<MessageMetadata>,
    #[serde(default)]
    pub actions: Vec<SuggestedAction>,
}

impl AgentReply {
    pub fn new(role: ReplyRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            metadata: None,
            actions: Vec::new(),
        }
    }

    /// The single conversion point from agent replies into conversation messages.
    pub fn normalize(self) -> Message {
        Message {
            role: self.role.normalize(),
            content: self.content,
            metadata: self.metadata,
        }
    }
}

/// External capability processing one message at a time.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Processes a user message. May take arbitrarily long or fail.
    async fn process_message(&self, message: &Message) -> Result<AgentReply>;

    /// Installs (or clears) the progress callback used by later calls.
    fn set_progress_callback(&self, callback: Option<ProgressCallback>);
}

/// Resolves the agent instance bound to a tab.
///
/// Resolution may miss while the agent is still being constructed.
pub trait AgentProvider: Send + Sync {
    fn agent_for(&self, tab_id: &str) -> Option<Arc<dyn Agent>>;
}

/// Provider handing the same agent to every tab.
pub struct SharedAgentProvider {
    agent: Arc<dyn Agent>,
}

impl SharedAgentProvider {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent }
    }
}

impl AgentProvider for SharedAgentProvider {
    fn agent_for(&self, _tab_id: &str) -> Option<Arc<dyn Agent>> {
        Some(Arc::clone(&self.agent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_role_normalizes_to_assistant() {
        let reply: AgentReply =
            serde_json::from_str(r#"{"role":"agent","content":"hi"}"#).unwrap();
        assert_eq!(reply.role, ReplyRole::Agent);
        let message = reply.normalize();
        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.content, "hi");
    }

    #[test]
    fn test_unknown_role_normalizes_to_assistant() {
        let reply: AgentReply =
            serde_json::from_str(r#"{"role":"tool","content":"x"}"#).unwrap();
        assert_eq!(reply.role, ReplyRole::Unknown);
        assert_eq!(reply.normalize().role, MessageRole::Assistant);
        assert_eq!(ReplyRole::User.normalize(), MessageRole::User);
    }

    #[test]
    fn test_progress_display_text() {
        let event = ProgressEvent {
            kind: "tool".to_string(),
            message: "Fetching balances".to_string(),
            step_index: Some(2),
            total_steps: Some(5),
            tool_name: Some("get_balance".to_string()),
        };
        assert_eq!(event.display_text(), "Step 2/5 [get_balance] Fetching balances");

        let bare = ProgressEvent {
            kind: "tool".to_string(),
            message: String::new(),
            step_index: None,
            total_steps: None,
            tool_name: None,
        };
        assert_eq!(bare.display_text(), "Working...");
    }

    #[test]
    fn test_progress_event_wire_names() {
        let event: ProgressEvent = serde_json::from_str(
            r#"{"type":"step","message":"m","stepIndex":1,"totalSteps":3,"toolName":"t"}"#,
        )
        .unwrap();
        assert_eq!(event.step_index, Some(1));
        assert_eq!(event.tool_name.as_deref(), Some("t"));
    }
}
