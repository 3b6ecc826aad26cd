//! In-memory tab collection with an active-tab pointer.
//!
//! `TabStore` is a pure state container: every operation is synchronous and
//! touches nothing outside the store. Callers that share it across tasks wrap
//! it in `Arc<tokio::sync::RwLock<TabStore>>`.

use super::message::Message;
use super::model::{ActionStatus, AgentAction, ChatTab, TabMode, TabPatch};
use uuid::Uuid;

/// Manages the collection of conversation tabs and the active tab.
///
/// Invariants:
/// - once [`TabStore::ensure_initialized`] ran, at least one tab exists
/// - `active_tab_id` always references an existing tab, or is `None` only
///   while the collection is empty
#[derive(Debug, Default, Clone)]
pub struct TabStore {
    tabs: Vec<ChatTab>,
    active_tab_id: Option<String>,
    /// Monotonic counter used for default tab names ("Chat 1", "Chat 2", ...)
    created_count: usize,
}

impl TabStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the first tab if the collection is empty and returns the active id.
    pub fn ensure_initialized(&mut self) -> String {
        if let Some(id) = &self.active_tab_id {
            return id.clone();
        }
        match self.tabs.first() {
            Some(tab) => {
                let id = tab.id.clone();
                self.active_tab_id = Some(id.clone());
                id
            }
            None => self.create_tab(None, None),
        }
    }

    /// Creates a new empty tab, makes it active and returns its id.
    ///
    /// # Arguments
    ///
    /// * `source_name` - Name for the tab; defaults to "Chat N"
    /// * `mode` - Interaction mode; defaults to [`TabMode::Agent`]
    pub fn create_tab(&mut self, source_name: Option<&str>, mode: Option<TabMode>) -> String {
        self.created_count += 1;
        let name = source_name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Chat {}", self.created_count));

        let tab = ChatTab::new(Uuid::new_v4().to_string(), name, mode.unwrap_or_default());
        self.insert_tab(tab)
    }

    /// Inserts a fully-formed tab (fork/import), makes it active and returns its id.
    pub fn insert_tab(&mut self, tab: ChatTab) -> String {
        let id = tab.id.clone();
        tracing::debug!("[TabStore] Adding tab: id={}, name={}", tab.id, tab.name);
        self.tabs.push(tab);
        self.active_tab_id = Some(id.clone());
        id
    }

    /// Closes a tab. Closing the only remaining tab, or an unknown tab, is a no-op.
    ///
    /// When the active tab is closed its right-hand neighbour becomes active,
    /// or the left one if it was the last in order.
    ///
    /// # Returns
    ///
    /// `true` if a tab was removed.
    pub fn close_tab(&mut self, tab_id: &str) -> bool {
        if self.tabs.len() <= 1 {
            return false;
        }
        let Some(index) = self.position(tab_id) else {
            return false;
        };

        self.tabs.remove(index);

        if self.active_tab_id.as_deref() == Some(tab_id) {
            let next = index.min(self.tabs.len() - 1);
            self.active_tab_id = Some(self.tabs[next].id.clone());
        }
        true
    }

    /// Sets the active tab. Unknown ids are ignored.
    pub fn switch_to_tab(&mut self, tab_id: &str) -> bool {
        if self.position(tab_id).is_none() {
            return false;
        }
        self.active_tab_id = Some(tab_id.to_string());
        true
    }

    /// Shallow-merges `patch` into the tab. Returns `false` for unknown ids.
    pub fn update_tab(&mut self, tab_id: &str, patch: TabPatch) -> bool {
        match self.get_mut(tab_id) {
            Some(tab) => {
                tab.apply(patch);
                true
            }
            None => false,
        }
    }

    pub fn rename_tab(&mut self, tab_id: &str, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.update_tab(tab_id, TabPatch::new().name(name))
    }

    /// Flips the pinned flag and returns the new value.
    pub fn toggle_pin(&mut self, tab_id: &str) -> Option<bool> {
        let tab = self.get_mut(tab_id)?;
        tab.pinned = !tab.pinned;
        Some(tab.pinned)
    }

    /// Creates a new tab holding `messages[0..=message_index]` of the source tab.
    ///
    /// # Returns
    ///
    /// The new tab id, or `None` if the source tab is unknown or the index is
    /// out of range.
    pub fn fork_tab_at_message(
        &mut self,
        tab_id: &str,
        message_index: usize,
        new_name: &str,
    ) -> Option<String> {
        let source = self.get(tab_id)?;
        if message_index >= source.messages.len() {
            return None;
        }

        let name = if new_name.trim().is_empty() {
            format!("{} (fork)", source.name)
        } else {
            new_name.trim().to_string()
        };
        let mut tab = ChatTab::new(Uuid::new_v4().to_string(), name, source.mode);
        tab.messages = source.messages[..=message_index].to_vec();

        self.created_count += 1;
        Some(self.insert_tab(tab))
    }

    // ============================================================================
    // Message / action helpers (all built on the same merge semantics)
    // ============================================================================

    pub fn append_message(&mut self, tab_id: &str, message: Message) -> bool {
        match self.get_mut(tab_id) {
            Some(tab) => {
                tab.messages.push(message);
                true
            }
            None => false,
        }
    }

    /// Keeps only the messages for which `keep` returns true.
    pub fn retain_messages<F>(&mut self, tab_id: &str, keep: F) -> bool
    where
        F: FnMut(&Message) -> bool,
    {
        match self.get_mut(tab_id) {
            Some(tab) => {
                tab.messages.retain(keep);
                true
            }
            None => false,
        }
    }

    pub fn push_action(&mut self, tab_id: &str, action: AgentAction) -> bool {
        match self.get_mut(tab_id) {
            Some(tab) => {
                tab.agent_actions.push(action);
                true
            }
            None => false,
        }
    }

    pub fn set_action_status(&mut self, tab_id: &str, action_id: &str, status: ActionStatus) -> bool {
        let Some(tab) = self.get_mut(tab_id) else {
            return false;
        };
        match tab.agent_actions.iter_mut().find(|a| a.id == action_id) {
            Some(action) => {
                action.status = status;
                true
            }
            None => false,
        }
    }

    // ============================================================================
    // Queries
    // ============================================================================

    pub fn get(&self, tab_id: &str) -> Option<&ChatTab> {
        self.tabs.iter().find(|t| t.id == tab_id)
    }

    fn get_mut(&mut self, tab_id: &str) -> Option<&mut ChatTab> {
        self.tabs.iter_mut().find(|t| t.id == tab_id)
    }

    fn position(&self, tab_id: &str) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == tab_id)
    }

    pub fn contains(&self, tab_id: &str) -> bool {
        self.position(tab_id).is_some()
    }

    pub fn tabs(&self) -> &[ChatTab] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn active_tab_id(&self) -> Option<&str> {
        self.active_tab_id.as_deref()
    }

    pub fn active_tab(&self) -> Option<&ChatTab> {
        self.active_tab_id.as_deref().and_then(|id| self.get(id))
    }
}
