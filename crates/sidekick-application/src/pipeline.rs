//! Message-processing pipeline.
//!
//! One call to [`ProcessingPipeline::submit`] drives a single turn for one tab:
//!
//! 1. append the user message and mark the tab `processing`
//! 2. resolve the tab's agent (one delayed retry, then degrade to idle)
//! 3. race the agent call against the watchdog while forwarding throttled
//!    progress updates as transient `planning` messages
//! 4. replace the transient messages with the reply or a fixed error message
//! 5. hold the processing state for at least the configured floor, then go idle
//!
//! Each turn carries a generation number. Cancelling a turn (or starting a new
//! one) bumps the generation, and every write made after the agent call checks
//! it first, so a late reply can never resurrect a cancelled conversation.

use crate::pending::{PendingHold, PendingSignal};
use crate::progress::{ProgressRouter, ProgressThrottle};
use sidekick_core::agent::{Agent, AgentProvider, ProgressEvent};
use sidekick_core::config::PipelineConfig;
use sidekick_core::error::{Result, SidekickError};
use sidekick_core::event::{EventBus, SessionEvent};
use sidekick_core::tab::{
    ActionStatus, AgentAction, Message, MessageMetadata, PLANNING_METADATA, TabPatch, TabStatus,
    TabStore,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{Instant, sleep, sleep_until};
use uuid::Uuid;

/// Assistant message appended when the agent call fails.
pub const PROCESSING_ERROR_MESSAGE: &str =
    "I encountered an error while processing your request. Please try again.";

/// Tab collection shared between the pipeline, the facade and importers.
pub type SharedTabStore = Arc<RwLock<TabStore>>;

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Empty input; nothing happened.
    Ignored,
    /// The tab was already processing a turn.
    Busy,
    /// The agent replied and the reply was appended.
    Completed,
    /// The agent failed; the error message was appended.
    Failed,
    /// No agent could be resolved; the tab went back to idle.
    AgentUnavailable,
    /// The turn was cancelled while in flight; its result was dropped.
    Discarded,
}

#[derive(Debug, Default)]
struct TurnState {
    generation: u64,
    hold: Option<Arc<PendingHold>>,
}

/// Orchestrates message turns for all tabs.
pub struct ProcessingPipeline {
    tabs: SharedTabStore,
    agents: Arc<dyn AgentProvider>,
    events: EventBus,
    pending: Arc<PendingSignal>,
    progress: Arc<ProgressRouter>,
    config: PipelineConfig,
    /// Per-tab turn bookkeeping. Never held across an `.await`.
    turns: Mutex<HashMap<String, TurnState>>,
}

impl ProcessingPipeline {
    pub fn new(
        tabs: SharedTabStore,
        agents: Arc<dyn AgentProvider>,
        events: EventBus,
        config: PipelineConfig,
    ) -> Self {
        Self {
            tabs,
            agents,
            pending: Arc::new(PendingSignal::new(events.clone())),
            progress: Arc::new(ProgressRouter::new()),
            events,
            config,
            turns: Mutex::new(HashMap::new()),
        }
    }

    /// Whether any turn currently holds the global pending indicator.
    pub fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Submits `text` as a new user message in `tab_id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the tab does not exist. Agent failures are not
    /// errors: they end the turn with [`TurnOutcome::Failed`].
    pub async fn submit(&self, tab_id: &str, text: &str) -> Result<TurnOutcome> {
        self.run_turn(tab_id, text, None).await
    }

    /// Re-submits the prompt stored in a retryable action.
    pub async fn retry_action(&self, tab_id: &str, action_id: &str) -> Result<TurnOutcome> {
        let prompt = {
            let mut tabs = self.tabs.write().await;
            let tab = tabs
                .get(tab_id)
                .ok_or_else(|| SidekickError::not_found("Tab", tab_id))?;
            let action = tab
                .action(action_id)
                .ok_or_else(|| SidekickError::not_found("AgentAction", action_id))?;
            if action.status == ActionStatus::InProgress || tab.is_processing {
                return Ok(TurnOutcome::Busy);
            }
            let prompt = action.prompt.clone();
            tabs.set_action_status(tab_id, action_id, ActionStatus::InProgress);
            prompt
        };

        tracing::info!(
            "[Pipeline] Retrying action {} in tab {}",
            action_id,
            tab_id
        );
        let outcome = self.run_turn(tab_id, &prompt, Some(action_id)).await;

        let status = match &outcome {
            Ok(TurnOutcome::Completed) => ActionStatus::Done,
            Ok(TurnOutcome::Discarded) | Ok(TurnOutcome::Busy) | Ok(TurnOutcome::Ignored) => {
                ActionStatus::Pending
            }
            _ => ActionStatus::Failed,
        };
        self.tabs
            .write()
            .await
            .set_action_status(tab_id, action_id, status);
        outcome
    }

    /// Unblocks a processing tab immediately.
    ///
    /// The in-flight agent call keeps running; its result is discarded when it
    /// arrives.
    ///
    /// # Returns
    ///
    /// `true` if the tab was processing.
    pub async fn cancel(&self, tab_id: &str) -> bool {
        let hold = {
            let mut tabs = self.tabs.write().await;
            match self.stop_turn(&mut tabs, tab_id) {
                Some(hold) => hold,
                None => return false,
            }
        };
        if let Some(hold) = hold {
            hold.release();
        }

        tracing::info!("[Pipeline] Cancelled turn in tab {}", tab_id);
        self.events.publish(SessionEvent::TurnFinished {
            tab_id: tab_id.to_string(),
            status: TabStatus::Idle,
        });
        true
    }

    /// Marks a processing tab idle and makes its in-flight turn stale.
    ///
    /// Runs under the caller's tab lock, so a finishing turn either writes
    /// before the tab goes idle or sees a stale generation afterwards.
    /// Returns `None` if the tab was not processing, otherwise the turn's hold.
    fn stop_turn(&self, tabs: &mut TabStore, tab_id: &str) -> Option<Option<Arc<PendingHold>>> {
        let processing = tabs
            .get(tab_id)
            .map(|t| t.is_processing || t.status == TabStatus::Processing)
            .unwrap_or(false);
        if !processing {
            return None;
        }
        tabs.retain_messages(tab_id, |m| !m.is_transient_progress());
        tabs.update_tab(tab_id, TabPatch::idle().touched_now());

        let mut turns = self.turns();
        let state = turns.entry(tab_id.to_string()).or_default();
        state.generation += 1;
        Some(state.hold.take())
    }

    /// Drops the turn bookkeeping of a closed tab. Any in-flight turn becomes
    /// stale and its result is discarded.
    pub fn forget(&self, tab_id: &str) {
        let state = self.turns().remove(tab_id);
        if let Some(hold) = state.and_then(|s| s.hold) {
            hold.release();
        }
    }

    async fn run_turn(
        &self,
        tab_id: &str,
        text: &str,
        retry_of: Option<&str>,
    ) -> Result<TurnOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }

        let started = Instant::now();
        let user_message = Message::user(text);
        {
            let mut tabs = self.tabs.write().await;
            let tab = tabs
                .get(tab_id)
                .ok_or_else(|| SidekickError::not_found("Tab", tab_id))?;
            if tab.is_processing {
                tracing::debug!("[Pipeline] Tab {} is busy, ignoring submit", tab_id);
                return Ok(TurnOutcome::Busy);
            }
            tabs.append_message(tab_id, user_message.clone());
            tabs.update_tab(
                tab_id,
                TabPatch::new()
                    .status(TabStatus::Processing)
                    .processing(true)
                    .input("")
                    .touched_now(),
            );
        }

        let (generation, hold) = self.begin_turn(tab_id);
        self.events.publish(SessionEvent::TurnStarted {
            tab_id: tab_id.to_string(),
        });
        tracing::debug!(
            "[Pipeline] Turn {} started in tab {} ({} chars)",
            generation,
            tab_id,
            text.len()
        );

        let Some(agent) = self.resolve_agent(tab_id).await else {
            tracing::warn!(
                "[Pipeline] {} after retry, staying idle",
                SidekickError::agent_unavailable(tab_id)
            );
            return Ok(self
                .finish_turn(tab_id, generation, started, TabStatus::Idle, TurnOutcome::AgentUnavailable)
                .await);
        };

        let result = self
            .call_agent(&agent, tab_id, generation, &user_message, started, &hold)
            .await;

        let (final_status, outcome) = {
            let mut tabs = self.tabs.write().await;
            if !self.is_current(tab_id, generation) {
                tracing::info!(
                    "[Pipeline] Dropping late result of cancelled turn {} in tab {}",
                    generation,
                    tab_id
                );
                return Ok(TurnOutcome::Discarded);
            }

            tabs.retain_messages(tab_id, |m| !m.is_transient_progress());
            match result {
                Ok(reply) => {
                    let suggestions = reply.actions.clone();
                    tabs.append_message(tab_id, reply.normalize());
                    let index = tabs
                        .get(tab_id)
                        .map(|t| t.messages.len().saturating_sub(1))
                        .unwrap_or_default();
                    for suggestion in suggestions {
                        tabs.push_action(
                            tab_id,
                            AgentAction {
                                id: Uuid::new_v4().to_string(),
                                label: suggestion.label,
                                status: ActionStatus::Pending,
                                tab_id: tab_id.to_string(),
                                message_index: index,
                                prompt: suggestion.prompt,
                            },
                        );
                    }
                    (TabStatus::Idle, TurnOutcome::Completed)
                }
                Err(e) => {
                    tracing::error!("[Pipeline] Agent failed in tab {}: {}", tab_id, e);
                    tabs.append_message(tab_id, Message::assistant(PROCESSING_ERROR_MESSAGE));
                    if retry_of.is_none() {
                        let index = tabs
                            .get(tab_id)
                            .map(|t| t.messages.len().saturating_sub(1))
                            .unwrap_or_default();
                        tabs.push_action(
                            tab_id,
                            AgentAction {
                                id: Uuid::new_v4().to_string(),
                                label: "Retry message".to_string(),
                                status: ActionStatus::Failed,
                                tab_id: tab_id.to_string(),
                                message_index: index,
                                prompt: text.to_string(),
                            },
                        );
                    }
                    (TabStatus::Error, TurnOutcome::Failed)
                }
            }
        };

        Ok(self
            .finish_turn(tab_id, generation, started, final_status, outcome)
            .await)
    }

    /// Runs the agent call, forwarding throttled progress and arming the watchdog.
    async fn call_agent(
        &self,
        agent: &Arc<dyn Agent>,
        tab_id: &str,
        generation: u64,
        user_message: &Message,
        started: Instant,
        hold: &PendingHold,
    ) -> Result<sidekick_core::agent::AgentReply> {
        let (route, mut progress_rx) = self.progress.register(agent);
        let mut throttle = ProgressThrottle::new(self.config.progress_throttle());
        let call = route.scope(agent.process_message(user_message));
        tokio::pin!(call);
        let watchdog = sleep_until(started + self.config.watchdog());
        tokio::pin!(watchdog);
        let mut watchdog_armed = true;

        let result = loop {
            tokio::select! {
                result = &mut call => break result,
                Some(event) = progress_rx.recv() => {
                    if throttle.admit(Instant::now()) {
                        self.push_progress(tab_id, generation, event).await;
                    }
                }
                _ = &mut watchdog, if watchdog_armed => {
                    watchdog_armed = false;
                    if hold.release() {
                        tracing::warn!(
                            "[Pipeline] Watchdog released pending state for tab {} after {:?}",
                            tab_id,
                            started.elapsed()
                        );
                        self.events.publish(SessionEvent::WatchdogFired {
                            tab_id: tab_id.to_string(),
                        });
                    }
                }
            }
        };

        result
    }

    async fn push_progress(&self, tab_id: &str, generation: u64, event: ProgressEvent) {
        let mut tabs = self.tabs.write().await;
        if !self.is_current(tab_id, generation) {
            return;
        }
        let data = serde_json::json!({
            "stepIndex": event.step_index,
            "totalSteps": event.total_steps,
            "toolName": event.tool_name,
            "kind": event.kind,
        });
        let message = Message::assistant(event.display_text())
            .with_metadata(MessageMetadata::new(PLANNING_METADATA, data));
        tabs.append_message(tab_id, message);
    }

    async fn resolve_agent(&self, tab_id: &str) -> Option<Arc<dyn Agent>> {
        if let Some(agent) = self.agents.agent_for(tab_id) {
            return Some(agent);
        }
        tracing::debug!(
            "[Pipeline] Agent not ready for tab {}, retrying in {:?}",
            tab_id,
            self.config.agent_retry_delay()
        );
        sleep(self.config.agent_retry_delay()).await;
        self.agents.agent_for(tab_id)
    }

    /// Waits out the visibility floor, then performs the idle transition.
    async fn finish_turn(
        &self,
        tab_id: &str,
        generation: u64,
        started: Instant,
        final_status: TabStatus,
        outcome: TurnOutcome,
    ) -> TurnOutcome {
        let floor = self.config.min_visible();
        let elapsed = started.elapsed();
        if elapsed < floor {
            sleep(floor - elapsed).await;
        }

        {
            let mut tabs = self.tabs.write().await;
            if !self.is_current(tab_id, generation) {
                return TurnOutcome::Discarded;
            }
            tabs.update_tab(
                tab_id,
                TabPatch::new()
                    .processing(false)
                    .status(final_status)
                    .touched_now(),
            );
        }

        let hold = self.turns().get_mut(tab_id).and_then(|s| s.hold.take());
        if let Some(hold) = hold {
            hold.release();
        }

        tracing::debug!(
            "[Pipeline] Turn {} in tab {} finished as {:?} after {:?}",
            generation,
            tab_id,
            outcome,
            started.elapsed()
        );
        self.events.publish(SessionEvent::TurnFinished {
            tab_id: tab_id.to_string(),
            status: final_status,
        });
        outcome
    }

    fn begin_turn(&self, tab_id: &str) -> (u64, Arc<PendingHold>) {
        let hold = Arc::new(self.pending.acquire());
        let mut turns = self.turns();
        let state = turns.entry(tab_id.to_string()).or_default();
        state.generation += 1;
        if let Some(previous) = state.hold.replace(Arc::clone(&hold)) {
            previous.release();
        }
        (state.generation, hold)
    }

    fn is_current(&self, tab_id: &str, generation: u64) -> bool {
        self.turns()
            .get(tab_id)
            .map(|s| s.generation == generation)
            .unwrap_or(false)
    }

    fn turns(&self) -> MutexGuard<'_, HashMap<String, TurnState>> {
        self.turns.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
