//! Runtime configuration.
//!
//! Every section and field has a default, so an empty or partial
//! `config.toml` is valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SidekickConfig {
    pub pipeline: PipelineConfig,
    pub seed: SeedConfig,
    pub share: ShareConfig,
    pub layout: LayoutConfig,
    pub logging: LoggingConfig,
}

impl SidekickConfig {
    /// Parses a TOML document, filling missing fields with defaults.
    pub fn from_toml_str(content: &str) -> crate::error::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Timings of the message-processing pipeline (milliseconds).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum time the processing indicator stays visible.
    pub min_visible_ms: u64,
    /// Window after which the global pending signal is forced off.
    pub watchdog_ms: u64,
    /// At most one progress update is forwarded per window.
    pub progress_throttle_ms: u64,
    /// Delay before the single agent-resolution retry.
    pub agent_retry_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_visible_ms: 400,
            watchdog_ms: 1000,
            progress_throttle_ms: 500,
            agent_retry_delay_ms: 120,
        }
    }
}

impl PipelineConfig {
    pub fn min_visible(&self) -> Duration {
        Duration::from_millis(self.min_visible_ms)
    }

    pub fn watchdog(&self) -> Duration {
        Duration::from_millis(self.watchdog_ms)
    }

    pub fn progress_throttle(&self) -> Duration {
        Duration::from_millis(self.progress_throttle_ms)
    }

    pub fn agent_retry_delay(&self) -> Duration {
        Duration::from_millis(self.agent_retry_delay_ms)
    }
}

/// Synthetic message seeding.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SeedConfig {
    /// Message count above which the list is considered virtualized.
    pub virtualization_threshold: usize,
    /// Attempts made to resolve a target tab that is not materialized yet.
    pub max_attempts: u32,
    /// First backoff delay; doubles on each attempt.
    pub backoff_base_ms: u64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            virtualization_threshold: 150,
            max_attempts: 5,
            backoff_base_ms: 50,
        }
    }
}

/// Share-link encoding.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ShareConfig {
    pub max_messages: usize,
    /// Query parameter carrying the encoded conversation.
    pub query_param: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            max_messages: 200,
            query_param: "chat".to_string(),
        }
    }
}

/// Panel width reconciliation.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    pub min_width: u32,
    /// Pixels per keyboard resize step.
    pub keyboard_step: u32,
    /// Fraction of the viewport used when no candidate is known.
    pub default_ratio: f64,
    /// Re-evaluation offsets after mount.
    pub reconcile_schedule_ms: Vec<u64>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_width: 560,
            keyboard_step: 24,
            default_ratio: 0.4,
            reconcile_schedule_ms: vec![0, 50, 150, 300, 600, 1200],
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter directive when `SIDEKICK_LOG` is not set.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = SidekickConfig::from_toml_str("").unwrap();
        assert_eq!(config, SidekickConfig::default());
        assert_eq!(config.pipeline.min_visible(), Duration::from_millis(400));
        assert_eq!(config.layout.reconcile_schedule_ms.len(), 6);
    }

    #[test]
    fn test_partial_override() {
        let config = SidekickConfig::from_toml_str(
            r#"
            [pipeline]
            watchdog_ms = 2500

            [share]
            query_param = "c"
            "#,
        )
        .unwrap();
        assert_eq!(config.pipeline.watchdog_ms, 2500);
        assert_eq!(config.pipeline.min_visible_ms, 400);
        assert_eq!(config.share.query_param, "c");
        assert_eq!(config.share.max_messages, 200);
    }

    #[test]
    fn test_invalid_toml_is_serialization_error() {
        let err = SidekickConfig::from_toml_str("[pipeline\nwatchdog_ms = ").unwrap_err();
        assert!(matches!(err, crate::error::SidekickError::Serialization { .. }));
    }
}
