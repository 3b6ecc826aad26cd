//! Global "pending" indicator shared by all in-flight turns.

use sidekick_core::event::{EventBus, SessionEvent};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Counts the turns currently holding the pending indicator.
///
/// `PendingChanged { pending: true }` is published on the 0 → 1 transition
/// and `PendingChanged { pending: false }` on 1 → 0.
#[derive(Debug)]
pub struct PendingSignal {
    holders: AtomicUsize,
    events: EventBus,
}

impl PendingSignal {
    pub fn new(events: EventBus) -> Self {
        Self {
            holders: AtomicUsize::new(0),
            events,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.holders.load(Ordering::SeqCst) > 0
    }

    /// Takes a hold on the indicator.
    pub fn acquire(self: &Arc<Self>) -> PendingHold {
        if self.holders.fetch_add(1, Ordering::SeqCst) == 0 {
            self.events
                .publish(SessionEvent::PendingChanged { pending: true });
        }
        PendingHold {
            signal: Arc::clone(self),
            released: AtomicBool::new(false),
        }
    }

    fn release_one(&self) {
        if self.holders.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.events
                .publish(SessionEvent::PendingChanged { pending: false });
        }
    }
}

/// One turn's hold on the pending indicator. Released exactly once, at the
/// latest when dropped.
#[derive(Debug)]
pub struct PendingHold {
    signal: Arc<PendingSignal>,
    released: AtomicBool,
}

impl PendingHold {
    /// Releases the hold.
    ///
    /// # Returns
    ///
    /// `true` for the call that actually released it, `false` afterwards.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.signal.release_one();
        true
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl Drop for PendingHold {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_publish_once() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let signal = Arc::new(PendingSignal::new(bus));

        let a = signal.acquire();
        let b = signal.acquire();
        assert!(signal.is_pending());

        assert!(a.release());
        assert!(!a.release());
        assert!(signal.is_pending());
        drop(b);
        assert!(!signal.is_pending());

        assert_eq!(rx.try_recv().unwrap(), SessionEvent::PendingChanged { pending: true });
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::PendingChanged { pending: false });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_drop_after_release_does_not_double_count() {
        let signal = Arc::new(PendingSignal::new(EventBus::new()));
        let keep = signal.acquire();
        let hold = signal.acquire();
        hold.release();
        drop(hold);
        assert!(signal.is_pending());
        drop(keep);
        assert!(!signal.is_pending());
    }
}
