//! Share-link encoding of a conversation.
//!
//! A conversation is reduced to `(role, content)` pairs, serialized as
//! compact JSON and encoded as URL-safe base64 without padding, so the
//! payload can be carried verbatim in a query parameter.

use crate::error::{Result, SidekickError};
use crate::tab::{ChatTab, Message, MessageRole};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use url::{ParseError, Url};

const PAYLOAD_VERSION: u8 = 1;

/// Base for resolving relative share links; only their query is read.
const RELATIVE_BASE: &str = "http://localhost/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedMessage {
    #[serde(rename = "r")]
    pub role: MessageRole,
    #[serde(rename = "c")]
    pub content: String,
}

/// Decoded share payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedConversation {
    #[serde(rename = "v")]
    pub version: u8,
    /// Name of the tab the conversation was shared from.
    #[serde(rename = "o")]
    pub origin: String,
    #[serde(rename = "m")]
    pub messages: Vec<SharedMessage>,
}

impl SharedConversation {
    /// Builds the payload from a tab's visible messages, keeping the most
    /// recent `max_messages`.
    pub fn from_tab(tab: &ChatTab, max_messages: usize) -> Self {
        let visible: Vec<&Message> = tab.visible_messages().collect();
        let skip = visible.len().saturating_sub(max_messages);
        Self {
            version: PAYLOAD_VERSION,
            origin: tab.name.clone(),
            messages: visible
                .into_iter()
                .skip(skip)
                .map(|m| SharedMessage {
                    role: m.role,
                    content: m.content.clone(),
                })
                .collect(),
        }
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
            .into_iter()
            .map(|m| Message {
                role: m.role,
                content: m.content,
                metadata: None,
            })
            .collect()
    }
}

pub fn encode_conversation(conversation: &SharedConversation) -> Result<String> {
    let json = serde_json::to_vec(conversation)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decodes a payload produced by [`encode_conversation`].
///
/// # Errors
///
/// Returns [`SidekickError::MalformedPayload`] for bad base64, bad JSON, an
/// unknown version or an empty conversation.
pub fn decode_conversation(payload: &str) -> Result<SharedConversation> {
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim())?;
    let conversation: SharedConversation = serde_json::from_slice(&bytes)
        .map_err(|e| SidekickError::malformed_payload(e.to_string()))?;

    if conversation.version != PAYLOAD_VERSION {
        return Err(SidekickError::malformed_payload(format!(
            "unsupported version {}",
            conversation.version
        )));
    }
    if conversation.messages.is_empty() {
        return Err(SidekickError::malformed_payload("no messages"));
    }
    Ok(conversation)
}

/// Sets `param=payload` on `base_url`, replacing an existing value and
/// keeping the other query pairs and the fragment.
///
/// # Errors
///
/// Returns [`SidekickError::Config`] if `base_url` is not an absolute URL.
pub fn share_url(base_url: &str, param: &str, payload: &str) -> Result<String> {
    let mut url = Url::parse(base_url).map_err(|e| {
        SidekickError::config(format!("invalid share base URL '{}': {}", base_url, e))
    })?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != param)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(param, payload);
    Ok(url.to_string())
}

/// Finds the percent-decoded value of `param` in an absolute URL, a relative
/// URL or a bare `?query`.
pub fn payload_from_url(url: &str, param: &str) -> Option<String> {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(ParseError::RelativeUrlWithoutBase) => {
            Url::parse(RELATIVE_BASE).and_then(|base| base.join(url)).ok()?
        }
        Err(_) => return None,
    };
    parsed
        .query_pairs()
        .find(|(key, _)| key == param)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
