//! Panel width reconciliation.
//!
//! Four sources may report a width, each possibly absent and arriving at
//! different times: a value injected before first paint, the persisted value,
//! a caller-supplied prop and an attribute observed on the rendered panel.
//! The reconciler picks the initial width by priority, then only ever raises
//! the adopted width as new candidates show up. Explicit user resizes bypass
//! the candidates entirely.

use crate::config::LayoutConfig;

/// Width values reported by the external sources at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WidthCandidates {
    /// Value injected before first paint.
    pub injected: Option<u32>,
    /// Value read back from durable storage.
    pub persisted: Option<u32>,
    /// Value supplied by the embedding caller.
    pub prop: Option<u32>,
    /// Width attribute observed on the rendered panel.
    pub observed: Option<u32>,
}

impl WidthCandidates {
    /// First available candidate in priority order.
    pub fn by_priority(&self) -> Option<u32> {
        self.injected
            .or(self.persisted)
            .or(self.prop)
            .or(self.observed)
    }

    /// Largest available candidate.
    pub fn max(&self) -> Option<u32> {
        [self.injected, self.persisted, self.prop, self.observed]
            .into_iter()
            .flatten()
            .max()
    }
}

/// Direction of a keyboard resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeStep {
    Grow,
    Shrink,
}

/// Authoritative panel width state.
#[derive(Debug, Clone)]
pub struct WidthReconciler {
    viewport: u32,
    min_width: u32,
    keyboard_step: u32,
    default_ratio: f64,
    adopted: u32,
    /// Set once the user resized explicitly; candidates no longer apply.
    user_adjusted: bool,
}

impl WidthReconciler {
    /// Creates a reconciler and adopts the initial width from `candidates`.
    pub fn new(viewport: u32, config: &LayoutConfig, candidates: WidthCandidates) -> Self {
        let mut reconciler = Self {
            viewport,
            min_width: config.min_width,
            keyboard_step: config.keyboard_step,
            default_ratio: config.default_ratio,
            adopted: 0,
            user_adjusted: false,
        };
        let initial = candidates
            .by_priority()
            .unwrap_or_else(|| reconciler.default_width());
        reconciler.adopted = reconciler.clamp(initial);
        reconciler
    }

    pub fn width(&self) -> u32 {
        self.adopted
    }

    pub fn viewport(&self) -> u32 {
        self.viewport
    }

    pub fn is_user_adjusted(&self) -> bool {
        self.user_adjusted
    }

    /// Clamps to `[min(min_width, viewport), viewport]`.
    pub fn clamp(&self, width: u32) -> u32 {
        let lower = self.min_width.min(self.viewport);
        width.clamp(lower, self.viewport)
    }

    fn default_width(&self) -> u32 {
        (self.viewport as f64 * self.default_ratio).round() as u32
    }

    /// Re-evaluates the candidates and raises the adopted width if any is larger.
    ///
    /// # Returns
    ///
    /// The new width when it changed, `None` otherwise. Never shrinks.
    pub fn reconcile(&mut self, candidates: &WidthCandidates) -> Option<u32> {
        if self.user_adjusted {
            return None;
        }
        let target = self.clamp(candidates.max()?);
        if target > self.adopted {
            tracing::debug!(
                "[WidthReconciler] Raising width {} -> {}",
                self.adopted,
                target
            );
            self.adopted = target;
            Some(target)
        } else {
            None
        }
    }

    /// Applies an explicit width (drag or API call), bypassing the candidates.
    pub fn set_explicit(&mut self, width: u32) -> u32 {
        self.user_adjusted = true;
        self.adopted = self.clamp(width);
        self.adopted
    }

    /// Applies one keyboard resize step.
    pub fn step(&mut self, step: ResizeStep) -> u32 {
        let next = match step {
            ResizeStep::Grow => self.adopted.saturating_add(self.keyboard_step),
            ResizeStep::Shrink => self.adopted.saturating_sub(self.keyboard_step),
        };
        self.set_explicit(next)
    }

    /// Updates the viewport and re-clamps the adopted width.
    ///
    /// # Returns
    ///
    /// The new width when clamping changed it.
    pub fn set_viewport(&mut self, viewport: u32) -> Option<u32> {
        self.viewport = viewport;
        let clamped = self.clamp(self.adopted);
        if clamped != self.adopted {
            self.adopted = clamped;
            Some(clamped)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LayoutConfig {
        LayoutConfig::default()
    }

    fn candidates(
        injected: Option<u32>,
        persisted: Option<u32>,
        prop: Option<u32>,
        observed: Option<u32>,
    ) -> WidthCandidates {
        WidthCandidates {
            injected,
            persisted,
            prop,
            observed,
        }
    }

    #[test]
    fn test_initial_width_follows_priority() {
        let c = candidates(Some(700), Some(900), Some(800), Some(1000));
        assert_eq!(WidthReconciler::new(1600, &config(), c).width(), 700);

        let c = candidates(None, Some(900), Some(800), Some(1000));
        assert_eq!(WidthReconciler::new(1600, &config(), c).width(), 900);

        let c = candidates(None, None, Some(800), Some(1000));
        assert_eq!(WidthReconciler::new(1600, &config(), c).width(), 800);

        let c = candidates(None, None, None, Some(1000));
        assert_eq!(WidthReconciler::new(1600, &config(), c).width(), 1000);
    }

    #[test]
    fn test_default_width_uses_viewport_ratio() {
        let r = WidthReconciler::new(2000, &config(), WidthCandidates::default());
        assert_eq!(r.width(), 800);
        // 40% of 1000 is below the minimum.
        let r = WidthReconciler::new(1000, &config(), WidthCandidates::default());
        assert_eq!(r.width(), 560);
    }

    #[test]
    fn test_clamp_handles_narrow_viewport() {
        let r = WidthReconciler::new(400, &config(), candidates(Some(900), None, None, None));
        assert_eq!(r.width(), 400);
        assert_eq!(r.clamp(10), 400);
    }

    #[test]
    fn test_reconcile_only_raises() {
        let mut r = WidthReconciler::new(1600, &config(), candidates(None, Some(700), None, None));
        assert_eq!(r.reconcile(&candidates(None, Some(650), None, None)), None);
        assert_eq!(r.width(), 700);

        assert_eq!(
            r.reconcile(&candidates(None, Some(650), None, Some(900))),
            Some(900)
        );
        assert_eq!(r.reconcile(&candidates(None, Some(600), None, None)), None);
        assert_eq!(r.width(), 900);

        assert_eq!(r.reconcile(&candidates(Some(5000), None, None, None)), Some(1600));
    }

    #[test]
    fn test_width_never_decreases_across_schedule() {
        let mut r = WidthReconciler::new(1800, &config(), WidthCandidates::default());
        let mut last = r.width();
        let samples = [
            candidates(None, Some(600), None, None),
            candidates(None, None, Some(1200), None),
            candidates(None, None, None, Some(580)),
            candidates(Some(900), None, None, None),
            candidates(None, None, None, None),
            candidates(None, Some(1300), None, Some(100)),
        ];
        for c in samples.iter() {
            r.reconcile(c);
            assert!(r.width() >= last);
            last = r.width();
        }
        assert_eq!(last, 1300);
    }

    #[test]
    fn test_explicit_resize_wins_and_freezes_candidates() {
        let mut r = WidthReconciler::new(1600, &config(), candidates(None, Some(1000), None, None));
        assert_eq!(r.set_explicit(700), 700);
        assert!(r.is_user_adjusted());
        assert_eq!(r.reconcile(&candidates(None, Some(1000), None, None)), None);
        assert_eq!(r.width(), 700);
        assert_eq!(r.set_explicit(10), 560);
    }

    #[test]
    fn test_keyboard_steps() {
        let mut r = WidthReconciler::new(1600, &config(), candidates(None, Some(800), None, None));
        assert_eq!(r.step(ResizeStep::Grow), 824);
        assert_eq!(r.step(ResizeStep::Shrink), 800);
        r.set_explicit(1600);
        assert_eq!(r.step(ResizeStep::Grow), 1600);
    }

    #[test]
    fn test_viewport_change_reclamps() {
        let mut r = WidthReconciler::new(1600, &config(), candidates(None, Some(1200), None, None));
        assert_eq!(r.set_viewport(1000), Some(1000));
        assert_eq!(r.set_viewport(1400), None);
        assert_eq!(r.width(), 1000);
    }
}
