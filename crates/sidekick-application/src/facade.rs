//! The control surface used by the host UI and by test harnesses.
//!
//! [`SidekickSession`] is built once at startup through
//! [`SidekickSession::builder`] and handed out behind the [`SessionFacade`]
//! trait, so callers can swap in a fake.

use crate::layout::{NoWidthProbe, PanelLayout, WidthProbe};
use crate::notes::KnowledgeNotesService;
use crate::pipeline::{ProcessingPipeline, SharedTabStore, TurnOutcome};
use crate::seed::{SeedOptions, SeedReport, Seeder};
use async_trait::async_trait;
use chrono::Utc;
use sidekick_core::agent::AgentProvider;
use sidekick_core::config::SidekickConfig;
use sidekick_core::error::{Result, SidekickError};
use sidekick_core::event::{EventBus, SessionEvent};
use sidekick_core::export::{export_file_name, export_transcript};
use sidekick_core::layout::ResizeStep;
use sidekick_core::notes::NoteRepository;
use sidekick_core::share::{
    SharedConversation, decode_conversation, encode_conversation, payload_from_url, share_url,
};
use sidekick_core::storage::KeyValueStore;
use sidekick_core::tab::{ChatTab, TabMode, TabPatch, TabStore};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use uuid::Uuid;

const DEFAULT_VIEWPORT: u32 = 1440;

/// A rendered transcript ready for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedTranscript {
    pub file_name: String,
    pub content: String,
}

#[async_trait]
pub trait SessionFacade: Send + Sync {
    /// Synthesizes `count` messages into a tab.
    async fn seed(&self, count: usize, options: SeedOptions) -> SeedReport;

    /// Writes `text` into the active tab's draft and optionally submits it.
    ///
    /// # Returns
    ///
    /// The turn outcome when submitted, `None` for a draft-only call.
    async fn prompt(&self, text: &str, submit: bool) -> Result<Option<TurnOutcome>>;

    fn open(&self);

    fn close(&self);

    /// Applies an explicit panel width and returns the clamped value.
    fn set_width(&self, width: u32) -> u32;

    async fn create_tab(&self, name: Option<&str>, mode: Option<TabMode>) -> String;

    async fn close_tab(&self, tab_id: &str) -> bool;

    async fn switch_to_tab(&self, tab_id: &str) -> bool;

    async fn rename_tab(&self, tab_id: &str, name: &str) -> bool;

    async fn toggle_pin(&self, tab_id: &str) -> Option<bool>;

    async fn fork_tab_at_message(&self, tab_id: &str, index: usize, name: &str)
    -> Option<String>;

    async fn cancel(&self, tab_id: &str) -> bool;

    /// Share link for the active tab, `None` when there is nothing to share.
    async fn share_url(&self, base_url: &str) -> Result<Option<String>>;

    /// Imports a shared conversation from a URL or bare payload.
    ///
    /// Malformed input is ignored and yields `None`.
    async fn import_shared(&self, url_or_payload: &str) -> Option<String>;

    async fn export_tab(&self, tab_id: &str) -> Result<ExportedTranscript>;
}

/// Default [`SessionFacade`] implementation wiring every service together.
pub struct SidekickSession {
    tabs: SharedTabStore,
    pipeline: Arc<ProcessingPipeline>,
    seeder: Seeder,
    layout: Arc<PanelLayout>,
    notes: KnowledgeNotesService,
    events: EventBus,
    config: SidekickConfig,
}

impl SidekickSession {
    pub fn builder(agents: Arc<dyn AgentProvider>) -> SidekickSessionBuilder {
        SidekickSessionBuilder::new(agents)
    }

    /// Starts the panel width re-evaluation schedule.
    pub fn mount(&self) -> JoinHandle<()> {
        self.layout.start_schedule()
    }

    /// Cancels timers owned by the session.
    pub fn shutdown(&self) {
        self.layout.shutdown();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &SidekickConfig {
        &self.config
    }

    pub fn notes(&self) -> &KnowledgeNotesService {
        &self.notes
    }

    pub fn layout(&self) -> &PanelLayout {
        &self.layout
    }

    pub fn pipeline(&self) -> &ProcessingPipeline {
        &self.pipeline
    }

    pub fn is_pending(&self) -> bool {
        self.pipeline.is_pending()
    }

    pub async fn tab(&self, tab_id: &str) -> Option<ChatTab> {
        self.tabs.read().await.get(tab_id).cloned()
    }

    pub async fn active_tab(&self) -> Option<ChatTab> {
        self.tabs.read().await.active_tab().cloned()
    }

    pub async fn tabs(&self) -> Vec<ChatTab> {
        self.tabs.read().await.tabs().to_vec()
    }

    /// Submits `text` to a specific tab.
    pub async fn submit(&self, tab_id: &str, text: &str) -> Result<TurnOutcome> {
        self.pipeline.submit(tab_id, text).await
    }

    pub async fn retry_action(&self, tab_id: &str, action_id: &str) -> Result<TurnOutcome> {
        self.pipeline.retry_action(tab_id, action_id).await
    }

    pub async fn set_input(&self, tab_id: &str, text: &str) -> bool {
        self.tabs
            .write()
            .await
            .update_tab(tab_id, TabPatch::new().input(text))
    }

    pub fn resize_by_key(&self, step: ResizeStep) -> u32 {
        self.layout.resize_by_key(step)
    }

    /// Re-evaluates width candidates after an external width-set signal.
    pub fn signal_width(&self) -> Option<u32> {
        self.layout.reconcile_now()
    }

    pub async fn export_active(&self) -> Result<ExportedTranscript> {
        let active = self
            .tabs
            .read()
            .await
            .active_tab_id()
            .map(str::to_string)
            .ok_or_else(|| SidekickError::not_found("Tab", "active"))?;
        self.export_tab(&active).await
    }

    async fn active_tab_id(&self) -> String {
        self.tabs.write().await.ensure_initialized()
    }
}

#[async_trait]
impl SessionFacade for SidekickSession {
    async fn seed(&self, count: usize, options: SeedOptions) -> SeedReport {
        self.seeder.seed(count, options).await
    }

    async fn prompt(&self, text: &str, submit: bool) -> Result<Option<TurnOutcome>> {
        let tab_id = self.active_tab_id().await;
        self.set_input(&tab_id, text).await;
        if !submit {
            return Ok(None);
        }
        self.pipeline.submit(&tab_id, text).await.map(Some)
    }

    fn open(&self) {
        self.layout.open();
    }

    fn close(&self) {
        self.layout.close();
    }

    fn set_width(&self, width: u32) -> u32 {
        self.layout.set_width(width)
    }

    async fn create_tab(&self, name: Option<&str>, mode: Option<TabMode>) -> String {
        self.tabs.write().await.create_tab(name, mode)
    }

    async fn close_tab(&self, tab_id: &str) -> bool {
        let closed = self.tabs.write().await.close_tab(tab_id);
        if closed {
            // Drop any in-flight turn so its result cannot land anywhere.
            self.pipeline.forget(tab_id);
        }
        closed
    }

    async fn switch_to_tab(&self, tab_id: &str) -> bool {
        self.tabs.write().await.switch_to_tab(tab_id)
    }

    async fn rename_tab(&self, tab_id: &str, name: &str) -> bool {
        self.tabs.write().await.rename_tab(tab_id, name)
    }

    async fn toggle_pin(&self, tab_id: &str) -> Option<bool> {
        self.tabs.write().await.toggle_pin(tab_id)
    }

    async fn fork_tab_at_message(
        &self,
        tab_id: &str,
        index: usize,
        name: &str,
    ) -> Option<String> {
        self.tabs
            .write()
            .await
            .fork_tab_at_message(tab_id, index, name)
    }

    async fn cancel(&self, tab_id: &str) -> bool {
        self.pipeline.cancel(tab_id).await
    }

    async fn share_url(&self, base_url: &str) -> Result<Option<String>> {
        let conversation = {
            let tabs = self.tabs.read().await;
            let Some(tab) = tabs.active_tab() else {
                return Ok(None);
            };
            SharedConversation::from_tab(tab, self.config.share.max_messages)
        };
        if conversation.messages.is_empty() {
            return Ok(None);
        }

        let payload = encode_conversation(&conversation)?;
        tracing::debug!(
            "[SessionFacade] Sharing {} messages ({} bytes)",
            conversation.messages.len(),
            payload.len()
        );
        Ok(Some(share_url(base_url, &self.config.share.query_param, &payload)?))
    }

    async fn import_shared(&self, url_or_payload: &str) -> Option<String> {
        let payload = payload_from_url(url_or_payload, &self.config.share.query_param)
            .unwrap_or_else(|| url_or_payload.to_string());
        let conversation = match decode_conversation(&payload) {
            Ok(conversation) => conversation,
            Err(e) => {
                tracing::warn!("[SessionFacade] Ignoring shared payload: {}", e);
                return None;
            }
        };

        let name = match conversation.origin.trim() {
            "" => "Shared chat".to_string(),
            origin => origin.to_string(),
        };
        let mut tab = ChatTab::new(Uuid::new_v4().to_string(), name, TabMode::default());
        tab.messages = conversation.into_messages();
        let message_count = tab.messages.len();

        let tab_id = self.tabs.write().await.insert_tab(tab);
        tracing::info!(
            "[SessionFacade] Imported shared conversation into tab {} ({} messages)",
            tab_id,
            message_count
        );
        self.events.publish(SessionEvent::SharedImported {
            tab_id: tab_id.clone(),
            message_count,
        });
        Some(tab_id)
    }

    async fn export_tab(&self, tab_id: &str) -> Result<ExportedTranscript> {
        let tabs = self.tabs.read().await;
        let tab = tabs
            .get(tab_id)
            .ok_or_else(|| SidekickError::not_found("Tab", tab_id))?;
        let now = Utc::now();
        Ok(ExportedTranscript {
            file_name: export_file_name(tab, now),
            content: export_transcript(tab, now),
        })
    }
}

/// Builder for [`SidekickSession`].
pub struct SidekickSessionBuilder {
    agents: Arc<dyn AgentProvider>,
    config: SidekickConfig,
    storage: Option<Arc<dyn KeyValueStore>>,
    notes: Option<Arc<dyn NoteRepository>>,
    probe: Arc<dyn WidthProbe>,
    viewport: u32,
    events: Option<EventBus>,
}

impl SidekickSessionBuilder {
    fn new(agents: Arc<dyn AgentProvider>) -> Self {
        Self {
            agents,
            config: SidekickConfig::default(),
            storage: None,
            notes: None,
            probe: Arc::new(NoWidthProbe),
            viewport: DEFAULT_VIEWPORT,
            events: None,
        }
    }

    pub fn config(mut self, config: SidekickConfig) -> Self {
        self.config = config;
        self
    }

    pub fn storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn note_repository(mut self, repository: Arc<dyn NoteRepository>) -> Self {
        self.notes = Some(repository);
        self
    }

    pub fn width_probe(mut self, probe: Arc<dyn WidthProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn viewport(mut self, viewport: u32) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Builds the session with one initial tab.
    ///
    /// # Errors
    ///
    /// Returns `Config` when the key-value store or the note repository was
    /// not supplied.
    pub fn build(self) -> Result<SidekickSession> {
        let storage = self
            .storage
            .ok_or_else(|| SidekickError::config("key-value store not configured"))?;
        let note_repository = self
            .notes
            .ok_or_else(|| SidekickError::config("note repository not configured"))?;
        let events = self.events.unwrap_or_default();

        let mut store = TabStore::new();
        let first = store.ensure_initialized();
        let tabs: SharedTabStore = Arc::new(RwLock::new(store));

        let pipeline = Arc::new(ProcessingPipeline::new(
            Arc::clone(&tabs),
            self.agents,
            events.clone(),
            self.config.pipeline.clone(),
        ));
        let seeder = Seeder::new(Arc::clone(&tabs), events.clone(), self.config.seed.clone());
        let layout = Arc::new(PanelLayout::new(
            self.viewport,
            &self.config.layout,
            storage,
            self.probe,
            events.clone(),
        ));

        tracing::info!("[SessionFacade] Session ready with initial tab {}", first);
        Ok(SidekickSession {
            tabs,
            pipeline,
            seeder,
            layout,
            notes: KnowledgeNotesService::new(note_repository),
            events,
            config: self.config,
        })
    }
}

impl Drop for SidekickSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
