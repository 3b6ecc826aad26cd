//! Progress routing between agents and the turns that call them.
//!
//! An [`Agent`] exposes a single progress-callback slot, but one agent may
//! serve several tabs at once (see `SharedAgentProvider`) and a cancelled turn
//! may still be running when the next turn in the same tab starts. The
//! pipeline therefore never installs a per-turn callback. Each agent gets a
//! dispatching callback that never needs clearing, and each turn registers a
//! [`ProgressRoute`] that owns its channel.
//!
//! Events emitted while the agent's future is being polled are routed through
//! a task-local set by [`ProgressRoute::scope`]. Events emitted from outside
//! that future (e.g. from a task the agent spawned) fall back to the agent's
//! only active turn and are dropped when that is ambiguous.

use sidekick_core::agent::{Agent, ProgressEvent};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::futures::TaskLocalFuture;
use tokio::time::Instant;

type TurnSender = mpsc::UnboundedSender<ProgressEvent>;

tokio::task_local! {
    static TURN_PROGRESS: TurnSender;
}

/// Identity of an agent instance, used as the routing key.
fn agent_key(agent: &Arc<dyn Agent>) -> usize {
    Arc::as_ptr(agent) as *const () as usize
}

/// Routes agent progress to the turn that produced it.
#[derive(Debug, Default)]
pub(crate) struct ProgressRouter {
    next_turn: AtomicU64,
    /// Active turns per agent, in registration order.
    routes: Mutex<HashMap<usize, Vec<(u64, TurnSender)>>>,
}

impl ProgressRouter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a turn on `agent` and (re)installs the dispatching callback.
    pub(crate) fn register(
        self: &Arc<Self>,
        agent: &Arc<dyn Agent>,
    ) -> (ProgressRoute, mpsc::UnboundedReceiver<ProgressEvent>) {
        let key = agent_key(agent);
        let turn = self.next_turn.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.routes()
            .entry(key)
            .or_default()
            .push((turn, sender.clone()));

        let router = Arc::clone(self);
        agent.set_progress_callback(Some(Arc::new(move |event| router.dispatch(key, event))));

        let route = ProgressRoute {
            router: Arc::clone(self),
            agent_key: key,
            turn,
            sender,
        };
        (route, receiver)
    }

    #[cfg(test)]
    fn active_turns(&self) -> usize {
        self.routes().values().map(Vec::len).sum()
    }

    fn dispatch(&self, agent_key: usize, event: ProgressEvent) {
        let sender = TURN_PROGRESS.try_with(Clone::clone).ok().or_else(|| {
            match self.routes().get(&agent_key).map(Vec::as_slice) {
                Some([(_, only)]) => Some(only.clone()),
                _ => None,
            }
        });
        match sender {
            Some(sender) => {
                let _ = sender.send(event);
            }
            None => tracing::debug!(
                "[Pipeline] Dropping progress event '{}' with no owning turn",
                event.kind
            ),
        }
    }

    fn unregister(&self, agent_key: usize, turn: u64) {
        let mut routes = self.routes();
        if let Some(turns) = routes.get_mut(&agent_key) {
            turns.retain(|(id, _)| *id != turn);
            if turns.is_empty() {
                routes.remove(&agent_key);
            }
        }
    }

    fn routes(&self) -> MutexGuard<'_, HashMap<usize, Vec<(u64, TurnSender)>>> {
        self.routes.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// One turn's registration. Dropping it stops routing to the turn.
pub(crate) struct ProgressRoute {
    router: Arc<ProgressRouter>,
    agent_key: usize,
    turn: u64,
    sender: TurnSender,
}

impl ProgressRoute {
    /// Wraps the agent call so progress emitted while it is polled reaches this turn.
    pub(crate) fn scope<F: Future>(&self, call: F) -> TaskLocalFuture<TurnSender, F> {
        TURN_PROGRESS.scope(self.sender.clone(), call)
    }
}

impl Drop for ProgressRoute {
    fn drop(&mut self) {
        self.router.unregister(self.agent_key, self.turn);
    }
}

/// Forwards at most one progress update per window.
#[derive(Debug)]
pub(crate) struct ProgressThrottle {
    window: Duration,
    last_forwarded: Option<Instant>,
}

impl ProgressThrottle {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            last_forwarded: None,
        }
    }

    pub(crate) fn admit(&mut self, now: Instant) -> bool {
        match self.last_forwarded {
            Some(last) if now.duration_since(last) < self.window => false,
            _ => {
                self.last_forwarded = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sidekick_core::agent::{AgentReply, ProgressCallback, ReplyRole};
    use sidekick_core::error::Result;
    use sidekick_core::tab::Message;

    /// Agent reporting the message content as progress while it processes.
    #[derive(Default)]
    struct ReportingAgent {
        callback: Mutex<Option<ProgressCallback>>,
    }

    impl ReportingAgent {
        fn report(&self, message: &str) {
            let callback = self.callback.lock().unwrap().clone();
            if let Some(cb) = callback {
                cb(event(message));
            }
        }
    }

    #[async_trait]
    impl Agent for ReportingAgent {
        async fn process_message(&self, message: &Message) -> Result<AgentReply> {
            self.report(&message.content);
            Ok(AgentReply::new(ReplyRole::Agent, "done"))
        }

        fn set_progress_callback(&self, callback: Option<ProgressCallback>) {
            *self.callback.lock().unwrap() = callback;
        }
    }

    fn event(message: &str) -> ProgressEvent {
        ProgressEvent {
            kind: "step".to_string(),
            message: message.to_string(),
            step_index: None,
            total_steps: None,
            tool_name: None,
        }
    }

    #[tokio::test]
    async fn test_inline_progress_reaches_the_calling_turn() {
        let router = Arc::new(ProgressRouter::new());
        let concrete = Arc::new(ReportingAgent::default());
        let agent: Arc<dyn Agent> = concrete.clone();

        let (first, mut first_rx) = router.register(&agent);
        let (second, mut second_rx) = router.register(&agent);

        first.scope(agent.process_message(&Message::user("a"))).await.unwrap();
        second.scope(agent.process_message(&Message::user("b"))).await.unwrap();

        assert_eq!(first_rx.try_recv().unwrap().message, "a");
        assert!(first_rx.try_recv().is_err());
        assert_eq!(second_rx.try_recv().unwrap().message, "b");
        assert!(second_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_out_of_scope_progress_needs_a_single_owner() {
        let router = Arc::new(ProgressRouter::new());
        let concrete = Arc::new(ReportingAgent::default());
        let agent: Arc<dyn Agent> = concrete.clone();

        let (only, mut only_rx) = router.register(&agent);
        concrete.report("lone");
        assert_eq!(only_rx.try_recv().unwrap().message, "lone");

        let (other, mut other_rx) = router.register(&agent);
        concrete.report("ambiguous");
        assert!(only_rx.try_recv().is_err());
        assert!(other_rx.try_recv().is_err());

        drop(only);
        drop(other);
        assert_eq!(router.active_turns(), 0);
    }

    #[test]
    fn test_throttle_windows() {
        let mut throttle = ProgressThrottle::new(Duration::from_millis(500));
        let t0 = Instant::now();
        assert!(throttle.admit(t0));
        assert!(!throttle.admit(t0 + Duration::from_millis(499)));
        assert!(throttle.admit(t0 + Duration::from_millis(500)));
    }
}
