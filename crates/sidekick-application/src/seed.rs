//! Synthetic message seeding for load and virtualization checks.

use crate::pipeline::SharedTabStore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use sidekick_core::config::SeedConfig;
use sidekick_core::event::{EventBus, SessionEvent};
use sidekick_core::tab::{Message, TabPatch};
use std::time::Duration;
use tokio::time::sleep;

const SEED_PHRASES: &[&str] = &[
    "What moved in this wallet over the last day?",
    "Summarize the largest transfers in this block range.",
    "Which programs did this account interact with?",
    "Show me the token balances again.",
    "Compare fees between these two transactions.",
    "Here is the breakdown you asked for.",
    "The account received three inbound transfers.",
    "No suspicious activity was found in that window.",
];

/// Options for [`Seeder::seed`].
#[derive(Debug, Clone, Default)]
pub struct SeedOptions {
    /// Target tab. Falls back to the active tab, or a new tab.
    pub tab_id: Option<String>,
    /// Replace the existing history instead of appending.
    pub replace: bool,
    /// Prefix of every synthesized message.
    pub prefix: Option<String>,
    /// Fixed RNG seed for reproducible content.
    pub rng_seed: Option<u64>,
}

/// Result of a seed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub tab_id: String,
    /// Message count of the tab after seeding.
    pub total: usize,
}

pub struct Seeder {
    tabs: SharedTabStore,
    events: EventBus,
    config: SeedConfig,
}

impl Seeder {
    pub fn new(tabs: SharedTabStore, events: EventBus, config: SeedConfig) -> Self {
        Self {
            tabs,
            events,
            config,
        }
    }

    /// Synthesizes `count` alternating user/assistant messages.
    ///
    /// An explicit target tab that is not materialized yet is polled with
    /// exponential backoff; after the last attempt a fresh tab is created.
    pub async fn seed(&self, count: usize, options: SeedOptions) -> SeedReport {
        let target = match &options.tab_id {
            Some(id) => self.await_tab(id).await,
            None => None,
        };

        let messages = synthesize(count, &options);

        let (tab_id, total) = {
            let mut tabs = self.tabs.write().await;
            let active = tabs.active_tab_id().map(str::to_string);
            let tab_id = match (target, active) {
                (Some(id), _) => id,
                (None, Some(active)) if options.tab_id.is_none() => active,
                _ => tabs.create_tab(Some("Seeded chat"), None),
            };

            let mut history = if options.replace {
                Vec::new()
            } else {
                tabs.get(&tab_id).map(|t| t.messages.clone()).unwrap_or_default()
            };
            history.extend(messages);
            let total = history.len();
            tabs.update_tab(&tab_id, TabPatch::new().messages(history).touched_now());
            (tab_id, total)
        };

        tracing::info!("[Seeder] Seeded {} messages into tab {} (total {})", count, tab_id, total);
        self.events.publish(SessionEvent::SeedCompleted {
            tab_id: tab_id.clone(),
            total,
        });
        if total > self.config.virtualization_threshold {
            self.events.publish(SessionEvent::VirtualizationReady {
                tab_id: tab_id.clone(),
                count: total,
            });
        }

        SeedReport { tab_id, total }
    }

    async fn await_tab(&self, tab_id: &str) -> Option<String> {
        for attempt in 0..self.config.max_attempts {
            if self.tabs.read().await.contains(tab_id) {
                return Some(tab_id.to_string());
            }
            let delay = Duration::from_millis(self.config.backoff_base_ms << attempt.min(16));
            tracing::debug!(
                "[Seeder] Tab {} not ready (attempt {}), retrying in {:?}",
                tab_id,
                attempt + 1,
                delay
            );
            sleep(delay).await;
        }
        if self.tabs.read().await.contains(tab_id) {
            return Some(tab_id.to_string());
        }
        tracing::warn!("[Seeder] Tab {} never appeared, seeding a new tab", tab_id);
        None
    }
}

fn synthesize(count: usize, options: &SeedOptions) -> Vec<Message> {
    let mut rng = match options.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let prefix = options.prefix.as_deref().unwrap_or("Seed");

    (0..count)
        .map(|i| {
            let phrase = SEED_PHRASES.choose(&mut rng).copied().unwrap_or_default();
            let content = format!("{} #{}: {}", prefix, i + 1, phrase);
            if i % 2 == 0 {
                Message::user(content)
            } else {
                Message::assistant(content)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidekick_core::tab::{MessageRole, TabStore};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    fn seeder() -> (Seeder, SharedTabStore, EventBus) {
        let mut store = TabStore::new();
        store.ensure_initialized();
        let tabs = Arc::new(RwLock::new(store));
        let events = EventBus::new();
        (
            Seeder::new(Arc::clone(&tabs), events.clone(), SeedConfig::default()),
            tabs,
            events,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_seed_active_tab_alternates_roles() {
        let (seeder, tabs, _) = seeder();
        let active = tabs.read().await.active_tab_id().unwrap().to_string();

        let report = seeder.seed(5, SeedOptions::default()).await;

        assert_eq!(report.tab_id, active);
        assert_eq!(report.total, 5);
        let tabs = tabs.read().await;
        let messages = &tabs.get(&active).unwrap().messages;
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert!(messages[4].content.starts_with("Seed #5: "));
    }

    #[tokio::test(start_paused = true)]
    async fn test_seed_appends_unless_replacing() {
        let (seeder, _, _) = seeder();
        seeder.seed(3, SeedOptions::default()).await;
        assert_eq!(seeder.seed(2, SeedOptions::default()).await.total, 5);

        let replaced = seeder
            .seed(
                4,
                SeedOptions {
                    replace: true,
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(replaced.total, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_seed_waits_for_late_tab() {
        let (seeder, tabs, _) = seeder();
        let late = {
            let tabs = Arc::clone(&tabs);
            tokio::spawn(async move {
                sleep(Duration::from_millis(120)).await;
                let mut tabs = tabs.write().await;
                let tab = sidekick_core::tab::ChatTab::new(
                    "late".to_string(),
                    "Late".to_string(),
                    Default::default(),
                );
                tabs.insert_tab(tab)
            })
        };

        let report = seeder
            .seed(
                2,
                SeedOptions {
                    tab_id: Some("late".to_string()),
                    ..Default::default()
                },
            )
            .await;
        late.await.unwrap();
        assert_eq!(report.tab_id, "late");
        assert_eq!(report.total, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_seed_missing_tab_falls_back_to_new_tab() {
        let (seeder, tabs, _) = seeder();
        let report = seeder
            .seed(
                1,
                SeedOptions {
                    tab_id: Some("ghost".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert_ne!(report.tab_id, "ghost");
        assert_eq!(tabs.read().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_virtualization_ready_only_above_threshold() {
        let (seeder, _, events) = seeder();
        let mut rx = events.subscribe();

        seeder.seed(150, SeedOptions::default()).await;
        assert!(matches!(rx.try_recv().unwrap(), SessionEvent::SeedCompleted { total: 150, .. }));
        assert!(rx.try_recv().is_err());

        seeder.seed(1, SeedOptions::default()).await;
        assert!(matches!(rx.try_recv().unwrap(), SessionEvent::SeedCompleted { total: 151, .. }));
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::VirtualizationReady { count: 151, .. }
        ));
    }

    #[test]
    fn test_fixed_rng_seed_is_reproducible() {
        let options = SeedOptions {
            rng_seed: Some(7),
            ..Default::default()
        };
        let a: Vec<_> = synthesize(6, &options).into_iter().map(|m| m.content).collect();
        let b: Vec<_> = synthesize(6, &options).into_iter().map(|m| m.content).collect();
        assert_eq!(a, b);
    }
}
