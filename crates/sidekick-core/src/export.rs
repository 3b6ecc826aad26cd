//! Plain-text transcript export.

use crate::reasoning;
use crate::tab::{ChatTab, MessageRole};
use chrono::{DateTime, Utc};

/// Renders a tab's conversation as a plain-text document.
///
/// Progress markers are skipped and assistant messages are reduced to their
/// visible text (reasoning and plan blocks removed).
pub fn export_transcript(tab: &ChatTab, exported_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n", tab.name));
    out.push_str(&format!("Exported: {}\n", exported_at.to_rfc3339()));
    out.push_str(&format!("Mode: {}\n\n", tab.mode));

    for message in tab.visible_messages() {
        let (label, body) = match message.role {
            MessageRole::User => ("User", message.content.trim().to_string()),
            MessageRole::Assistant => ("Assistant", reasoning::extract(&message.content).visible),
        };
        out.push_str(label);
        out.push_str(":\n");
        out.push_str(&body);
        out.push_str("\n\n");
    }
    out
}

/// Suggested download name, e.g. `sidekick-whale-watch-20240102-0304.txt`.
pub fn export_file_name(tab: &ChatTab, exported_at: DateTime<Utc>) -> String {
    let mut slug = String::new();
    for ch in tab.name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "chat" } else { slug };
    format!(
        "sidekick-{}-{}.txt",
        slug,
        exported_at.format("%Y%m%d-%H%M")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tab::{Message, TabMode};
    use chrono::TimeZone;

    #[test]
    fn test_transcript_strips_reasoning() {
        let mut tab = ChatTab::new("t".to_string(), "Whale watch!".to_string(), TabMode::Agent);
        tab.messages.push(Message::user("Who moved funds?"));
        tab.messages
            .push(Message::assistant("<think>look at transfers</think>Wallet A did."));
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let text = export_transcript(&tab, at);
        assert!(text.starts_with("# Whale watch!\n"));
        assert!(text.contains("User:\nWho moved funds?\n\n"));
        assert!(text.contains("Assistant:\nWallet A did.\n\n"));
        assert!(!text.contains("look at transfers"));

        assert_eq!(
            export_file_name(&tab, at),
            "sidekick-whale-watch-20240102-0304.txt"
        );
    }

    #[test]
    fn test_file_name_fallback_slug() {
        let tab = ChatTab::new("t".to_string(), "???".to_string(), TabMode::Agent);
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(export_file_name(&tab, at), "sidekick-chat-20240102-0304.txt");
    }
}
