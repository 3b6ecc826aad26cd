//! Typed session events and the in-process broadcast bus carrying them.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::tab::TabStatus;

/// Notifications published across components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Global pending indicator changed.
    PendingChanged { pending: bool },
    /// A turn started processing in a tab.
    TurnStarted { tab_id: String },
    /// A turn finished; `status` is the tab status after finalization.
    TurnFinished { tab_id: String, status: TabStatus },
    /// The watchdog forced the pending indicator off for a tab's turn.
    WatchdogFired { tab_id: String },
    /// Seeding finished for a tab.
    SeedCompleted { tab_id: String, total: usize },
    /// A tab's message list crossed the virtualization threshold.
    VirtualizationReady { tab_id: String, count: usize },
    /// The adopted panel width changed.
    WidthChanged { width: u32 },
    /// Panel visibility changed.
    PanelToggled { open: bool },
    /// A shared conversation was imported as a new tab.
    SharedImported { tab_id: String, message_count: usize },
}

impl SessionEvent {
    /// Topic name, stable for logging and filtering.
    pub fn topic(&self) -> &'static str {
        match self {
            SessionEvent::PendingChanged { .. } => "pending",
            SessionEvent::TurnStarted { .. } => "turn-started",
            SessionEvent::TurnFinished { .. } => "turn-finished",
            SessionEvent::WatchdogFired { .. } => "watchdog",
            SessionEvent::SeedCompleted { .. } => "seed-complete",
            SessionEvent::VirtualizationReady { .. } => "virtualization-ready",
            SessionEvent::WidthChanged { .. } => "width",
            SessionEvent::PanelToggled { .. } => "panel",
            SessionEvent::SharedImported { .. } => "shared-import",
        }
    }
}

const DEFAULT_CAPACITY: usize = 256;

/// Fire-and-forget broadcast bus with any number of listeners.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event. Having no listeners is not an error.
    pub fn publish(&self, event: SessionEvent) {
        tracing::trace!("[EventBus] {} {:?}", event.topic(), event);
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_listener() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.listener_count(), 2);

        bus.publish(SessionEvent::PendingChanged { pending: true });

        assert_eq!(a.recv().await.unwrap(), SessionEvent::PendingChanged { pending: true });
        assert_eq!(b.recv().await.unwrap(), SessionEvent::PendingChanged { pending: true });
    }

    #[test]
    fn test_publish_without_listeners_is_fine() {
        let bus = EventBus::new();
        bus.publish(SessionEvent::PanelToggled { open: true });
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(SessionEvent::VirtualizationReady {
            tab_id: "t".to_string(),
            count: 160,
        })
        .unwrap();
        assert_eq!(json["type"], "virtualization_ready");
        assert_eq!(json["count"], 160);
    }
}
