//! Panel layout service: width reconciliation schedule and visibility.
//!
//! Wraps the pure [`WidthReconciler`] with the moving parts around it: width
//! candidates read from a [`WidthProbe`] and the key-value store, a timed
//! re-evaluation schedule, persistence of explicit changes and
//! [`SessionEvent`] notifications.

use sidekick_core::config::LayoutConfig;
use sidekick_core::event::{EventBus, SessionEvent};
use sidekick_core::layout::{ResizeStep, WidthCandidates, WidthReconciler};
use sidekick_core::storage::{KeyValueStore, PANEL_OPEN_KEY, PANEL_WIDTH_KEY, read_open, read_width};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// Source of the width candidates that do not come from storage.
pub trait WidthProbe: Send + Sync {
    /// Width injected before first paint.
    fn injected_width(&self) -> Option<u32> {
        None
    }

    /// Width supplied by the embedding caller.
    fn prop_width(&self) -> Option<u32> {
        None
    }

    /// Width attribute currently observed on the rendered panel.
    fn observed_width(&self) -> Option<u32> {
        None
    }
}

/// Probe reporting nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWidthProbe;

impl WidthProbe for NoWidthProbe {}

/// Probe with values that can be changed after construction.
#[derive(Debug, Default)]
pub struct StaticWidthProbe {
    values: Mutex<WidthCandidates>,
}

impl StaticWidthProbe {
    pub fn new(injected: Option<u32>, prop: Option<u32>, observed: Option<u32>) -> Self {
        Self {
            values: Mutex::new(WidthCandidates {
                injected,
                persisted: None,
                prop,
                observed,
            }),
        }
    }

    pub fn set_observed(&self, width: Option<u32>) {
        self.lock().observed = width;
    }

    pub fn set_prop(&self, width: Option<u32>) {
        self.lock().prop = width;
    }

    fn lock(&self) -> MutexGuard<'_, WidthCandidates> {
        self.values.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl WidthProbe for StaticWidthProbe {
    fn injected_width(&self) -> Option<u32> {
        self.lock().injected
    }

    fn prop_width(&self) -> Option<u32> {
        self.lock().prop
    }

    fn observed_width(&self) -> Option<u32> {
        self.lock().observed
    }
}

pub struct PanelLayout {
    reconciler: Mutex<WidthReconciler>,
    storage: Arc<dyn KeyValueStore>,
    probe: Arc<dyn WidthProbe>,
    events: EventBus,
    schedule: Vec<Duration>,
    open: AtomicBool,
    shutdown: CancellationToken,
}

impl PanelLayout {
    /// Builds the layout and adopts the initial width.
    ///
    /// Visibility starts from the persisted flag, closed when none is stored.
    pub fn new(
        viewport: u32,
        config: &LayoutConfig,
        storage: Arc<dyn KeyValueStore>,
        probe: Arc<dyn WidthProbe>,
        events: EventBus,
    ) -> Self {
        let candidates = collect_candidates(storage.as_ref(), probe.as_ref());
        let reconciler = WidthReconciler::new(viewport, config, candidates);
        let open = read_open(storage.as_ref()).unwrap_or(false);
        tracing::debug!(
            "[PanelLayout] Initial width {} (viewport {}, open {})",
            reconciler.width(),
            viewport,
            open
        );

        Self {
            reconciler: Mutex::new(reconciler),
            storage,
            probe,
            events,
            schedule: config
                .reconcile_schedule_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            open: AtomicBool::new(open),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.reconciler().width()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn candidates(&self) -> WidthCandidates {
        collect_candidates(self.storage.as_ref(), self.probe.as_ref())
    }

    /// Re-evaluates all candidates now. Used by the schedule and by external
    /// width-set signals.
    ///
    /// # Returns
    ///
    /// The new width if it was raised.
    pub fn reconcile_now(&self) -> Option<u32> {
        let candidates = self.candidates();
        let raised = self.reconciler().reconcile(&candidates)?;
        self.persist_width(raised);
        self.events.publish(SessionEvent::WidthChanged { width: raised });
        Some(raised)
    }

    /// Applies an explicit width (drag or API call) and persists it.
    pub fn set_width(&self, width: u32) -> u32 {
        let (before, adopted) = {
            let mut reconciler = self.reconciler();
            let before = reconciler.width();
            (before, reconciler.set_explicit(width))
        };
        self.persist_width(adopted);
        if adopted != before {
            self.events.publish(SessionEvent::WidthChanged { width: adopted });
        }
        adopted
    }

    /// Applies one keyboard resize step and persists the result.
    pub fn resize_by_key(&self, step: ResizeStep) -> u32 {
        let (before, adopted) = {
            let mut reconciler = self.reconciler();
            let before = reconciler.width();
            (before, reconciler.step(step))
        };
        self.persist_width(adopted);
        if adopted != before {
            self.events.publish(SessionEvent::WidthChanged { width: adopted });
        }
        adopted
    }

    pub fn set_viewport(&self, viewport: u32) {
        let changed = self.reconciler().set_viewport(viewport);
        if let Some(width) = changed {
            self.persist_width(width);
            self.events.publish(SessionEvent::WidthChanged { width });
        }
    }

    pub fn open(&self) {
        self.set_open(true);
    }

    pub fn close(&self) {
        self.set_open(false);
    }

    fn set_open(&self, open: bool) {
        if let Err(e) = self.storage.set(PANEL_OPEN_KEY, if open { "true" } else { "false" }) {
            tracing::warn!("[PanelLayout] Failed to persist panel state: {}", e);
        }
        if self.open.swap(open, Ordering::SeqCst) != open {
            tracing::debug!("[PanelLayout] Panel {}", if open { "opened" } else { "closed" });
            self.events.publish(SessionEvent::PanelToggled { open });
        }
    }

    /// Spawns the post-mount re-evaluation schedule.
    ///
    /// The task only holds a weak reference and stops at [`shutdown`](Self::shutdown)
    /// or once the layout is dropped. Each re-evaluation runs on the blocking
    /// pool since the store may write to disk.
    pub fn start_schedule(self: &Arc<Self>) -> JoinHandle<()> {
        let layout: Weak<Self> = Arc::downgrade(self);
        let offsets = self.schedule.clone();
        let token = self.shutdown.child_token();

        tokio::spawn(async move {
            let mounted = Instant::now();
            for offset in offsets {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!("[PanelLayout] Reconcile schedule cancelled");
                        return;
                    }
                    _ = sleep_until(mounted + offset) => {}
                }
                let Some(layout) = layout.upgrade() else {
                    return;
                };
                // A raised width is persisted, which may block on file I/O.
                if let Err(e) = tokio::task::spawn_blocking(move || layout.reconcile_now()).await {
                    tracing::warn!("[PanelLayout] Scheduled reconcile failed: {}", e);
                }
            }
        })
    }

    /// Cancels pending scheduled re-evaluations.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn persist_width(&self, width: u32) {
        if let Err(e) = self.storage.set(PANEL_WIDTH_KEY, &width.to_string()) {
            tracing::warn!("[PanelLayout] Failed to persist width {}: {}", width, e);
        }
    }

    fn reconciler(&self) -> MutexGuard<'_, WidthReconciler> {
        self.reconciler.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Drop for PanelLayout {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn collect_candidates(storage: &dyn KeyValueStore, probe: &dyn WidthProbe) -> WidthCandidates {
    WidthCandidates {
        injected: probe.injected_width(),
        persisted: read_width(storage),
        prop: probe.prop_width(),
        observed: probe.observed_width(),
    }
}
