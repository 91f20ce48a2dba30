// Subsystem configuration
//
// Every component takes its own config struct; `SubsystemConfig` bundles
// them so a host can load the whole set from one JSON document. Durations
// are stored as integer milliseconds to keep the serialized form plain.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Permission gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionConfig {
    /// Show an explanatory dialog before the OS prompt
    pub show_rationale: bool,
    pub rationale_title: String,
    pub rationale_message: String,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            show_rationale: true,
            rationale_title: "Bluetooth access needed".to_string(),
            rationale_message: "The app uses Bluetooth to find and talk to your vehicle's OBD-II adapter. \
                Location access is required by the OS for Bluetooth scanning; your location is never stored."
                .to_string(),
        }
    }
}

/// State monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// How often the stability timer fires
    pub stability_check_interval_ms: u64,
    /// How long the state must stay unchanged to count as stable
    pub stability_threshold_ms: u64,
    /// Maximum number of retained state change events
    pub max_history: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            stability_check_interval_ms: 1000,
            stability_threshold_ms: 3000,
            max_history: 100,
        }
    }
}

impl MonitorConfig {
    pub fn stability_check_interval(&self) -> Duration {
        Duration::from_millis(self.stability_check_interval_ms)
    }

    pub fn stability_threshold(&self) -> Duration {
        Duration::from_millis(self.stability_threshold_ms)
    }
}

/// Automatic retry policy used by the error classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Backoff base for strategies whose own `retry_interval_ms` is zero,
    /// which includes the fallback strategy for unclassified errors
    pub base_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
    pub jitter_enabled: bool,
    pub max_jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 30_000,
            jitter_enabled: true,
            max_jitter_ms: 1000,
        }
    }
}

impl RetryConfig {
    /// Reject policies that would make the backoff shrink between attempts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid {
                field: "retry.backoff_multiplier",
                reason: "must be a finite value of at least 1.0",
            });
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigError::Invalid {
                field: "retry.max_delay_ms",
                reason: "must not be below retry.base_delay_ms",
            });
        }
        Ok(())
    }
}

/// Initialization orchestrator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitConfig {
    /// Hard bound on radio manager construction
    pub manager_timeout_ms: u64,
    /// How long the functional scan test listens for errors
    pub scan_test_duration_ms: u64,
    /// Wait before re-reading a `Resetting` power state
    pub resetting_wait_ms: u64,
    /// Upper bound on `Resetting` re-checks per attempt
    pub max_resetting_rechecks: u32,
    /// Ceiling on attempts before `retry()` gives up
    pub max_retry_attempts: u32,
    /// Linear backoff step for user-initiated retries
    pub retry_step_ms: u64,
    /// Bound on a whole pipeline run
    pub initialization_timeout_ms: u64,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            manager_timeout_ms: 10_000,
            scan_test_duration_ms: 1000,
            resetting_wait_ms: 2000,
            max_resetting_rechecks: 1,
            max_retry_attempts: 3,
            retry_step_ms: 1000,
            initialization_timeout_ms: 30_000,
        }
    }
}

impl InitConfig {
    pub fn manager_timeout(&self) -> Duration {
        Duration::from_millis(self.manager_timeout_ms)
    }

    pub fn scan_test_duration(&self) -> Duration {
        Duration::from_millis(self.scan_test_duration_ms)
    }

    pub fn resetting_wait(&self) -> Duration {
        Duration::from_millis(self.resetting_wait_ms)
    }

    pub fn initialization_timeout(&self) -> Duration {
        Duration::from_millis(self.initialization_timeout_ms)
    }
}

/// Diagnostics buffer sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub max_log_entries: usize,
    pub max_state_history: usize,
    pub max_permission_history: usize,
    /// How many history entries go into an error's diagnostic snapshot
    pub snapshot_history_len: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            max_log_entries: 1000,
            max_state_history: 100,
            max_permission_history: 50,
            snapshot_history_len: 10,
        }
    }
}

/// Configuration for the whole radio subsystem
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsystemConfig {
    pub permissions: PermissionConfig,
    pub monitor: MonitorConfig,
    pub retry: RetryConfig,
    pub init: InitConfig,
    pub diagnostics: DiagnosticsConfig,
}

impl SubsystemConfig {
    /// Parse a JSON document; missing sections fall back to defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SubsystemConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall timers or disable buffers
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn nonzero(value: u64, field: &'static str) -> Result<(), ConfigError> {
            if value == 0 {
                return Err(ConfigError::Invalid { field, reason: "must be greater than zero" });
            }
            Ok(())
        }

        nonzero(self.monitor.stability_check_interval_ms, "monitor.stability_check_interval_ms")?;
        nonzero(self.monitor.stability_threshold_ms, "monitor.stability_threshold_ms")?;
        nonzero(self.monitor.max_history as u64, "monitor.max_history")?;
        nonzero(self.init.manager_timeout_ms, "init.manager_timeout_ms")?;
        nonzero(self.init.scan_test_duration_ms, "init.scan_test_duration_ms")?;
        nonzero(self.init.initialization_timeout_ms, "init.initialization_timeout_ms")?;
        nonzero(self.diagnostics.max_log_entries as u64, "diagnostics.max_log_entries")?;
        nonzero(self.diagnostics.max_state_history as u64, "diagnostics.max_state_history")?;
        nonzero(self.diagnostics.max_permission_history as u64, "diagnostics.max_permission_history")?;

        self.retry.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SubsystemConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.monitor.stability_check_interval_ms, 1000);
        assert_eq!(config.monitor.stability_threshold_ms, 3000);
        assert_eq!(config.diagnostics.max_log_entries, 1000);
        assert_eq!(config.diagnostics.max_permission_history, 50);
        assert_eq!(config.init.max_retry_attempts, 3);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SubsystemConfig::from_json_str(r#"{"monitor": {"stability_threshold_ms": 200}}"#)
            .expect("partial config should parse");
        assert_eq!(config.monitor.stability_threshold_ms, 200);
        assert_eq!(config.monitor.stability_check_interval_ms, 1000);
        assert_eq!(config.init, InitConfig::default());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = SubsystemConfig::from_json_str(r#"{"monitor": {"stability_check_interval_ms": 0}}"#);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { field: "monitor.stability_check_interval_ms", .. })
        ));
    }

    #[test]
    fn test_shrinking_backoff_rejected() {
        let result = SubsystemConfig::from_json_str(r#"{"retry": {"backoff_multiplier": 0.5}}"#);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { field: "retry.backoff_multiplier", .. })
        ));

        let inverted = RetryConfig {
            base_delay_ms: 5000,
            max_delay_ms: 1000,
            ..RetryConfig::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(ConfigError::Invalid { field: "retry.max_delay_ms", .. })
        ));
        assert!(RetryConfig::default().validate().is_ok());
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            SubsystemConfig::from_json_str("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
