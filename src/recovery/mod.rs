// Error classification and recovery
//
// Maps an initialization error to its strategy, builds the consumer-facing
// response, computes backoff delays and executes a strategy's primary
// recovery action. Per-code metrics accumulate until cleared.

pub mod instructions;
pub mod strategies;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::config::RetryConfig;
use crate::error::ConfigError;
use crate::diagnostics::{LogLevel, RadioDiagnostics};
use crate::init::InitError;
use crate::permissions::PermissionGateway;
use crate::platform::SettingsLauncher;
use crate::types::{ErrorCategory, InitErrorCode, RecoveryAction, Severity};

pub use instructions::recovery_instructions;
pub use strategies::{default_strategy, strategy_for};
pub use types::{
    ErrorMetrics, ErrorResponse, ErrorStrategy, RecoveryInstructions, RecoveryOption, RecoveryResult,
};

pub struct ErrorClassifier {
    retry_config: RwLock<RetryConfig>,
    launcher: Arc<dyn SettingsLauncher>,
    gateway: Arc<PermissionGateway>,
    diagnostics: Arc<RadioDiagnostics>,
    metrics: Mutex<HashMap<InitErrorCode, ErrorMetrics>>,
}

impl ErrorClassifier {
    pub fn new(
        retry_config: RetryConfig,
        launcher: Arc<dyn SettingsLauncher>,
        gateway: Arc<PermissionGateway>,
        diagnostics: Arc<RadioDiagnostics>,
    ) -> Self {
        Self {
            retry_config: RwLock::new(retry_config),
            launcher,
            gateway,
            diagnostics,
            metrics: Mutex::new(HashMap::new()),
        }
    }

    /// Strategy for `code`, or the default strategy
    pub fn get_error_strategy(&self, code: InitErrorCode) -> ErrorStrategy {
        strategy_for(code).unwrap_or_else(default_strategy)
    }

    /// Build the response a consumer shows for `error`, counting the occurrence
    pub async fn handle_error(&self, error: &InitError) -> ErrorResponse {
        let strategy = self.get_error_strategy(error.code);
        let exhausted = error.retry_count >= strategy.max_retries;

        let mut recovery_options: Vec<RecoveryOption> = strategy
            .recovery_options
            .iter()
            .filter(|option| !(exhausted && option.action.is_retry()))
            .cloned()
            .collect();
        recovery_options.sort_by_key(|option| option.priority);

        let should_retry = self.can_recover(error);
        let retry_delay_ms = if should_retry {
            self.calculate_retry_delay(error).await
        } else {
            0
        };

        self.metrics
            .lock()
            .await
            .entry(error.code)
            .or_insert_with(|| ErrorMetrics::new(Utc::now()))
            .record_occurrence(Utc::now());

        let level = match strategy.severity {
            Severity::Critical => LogLevel::Critical,
            Severity::High => LogLevel::Error,
            Severity::Medium | Severity::Low => LogLevel::Warn,
        };
        self.diagnostics
            .log(
                level,
                "error",
                format!("{}: {} (retry {})", error.code, error.message, error.retry_count),
                Some(serde_json::json!({
                    "category": strategy.category,
                    "should_retry": should_retry,
                    "retry_delay_ms": retry_delay_ms,
                })),
            )
            .await;

        ErrorResponse {
            user_message: strategy.user_message,
            technical_message: strategy.technical_message,
            recovery_options,
            should_retry,
            retry_delay_ms,
            severity: strategy.severity,
            category: strategy.category,
        }
    }

    /// Whether an automatic retry is allowed for `error`
    pub fn can_recover(&self, error: &InitError) -> bool {
        let strategy = self.get_error_strategy(error.code);
        strategy.category != ErrorCategory::Permanent
            && strategy.auto_retry
            && error.retry_count < strategy.max_retries
    }

    /// Exponential backoff: `min(base * multiplier^retry_count, max)` plus optional jitter.
    /// `base` is the strategy's interval, or `RetryConfig::base_delay_ms` when that is zero.
    pub async fn calculate_retry_delay(&self, error: &InitError) -> u64 {
        let config = self.retry_config.read().await.clone();
        let strategy = self.get_error_strategy(error.code);
        let base = if strategy.retry_interval_ms > 0 {
            strategy.retry_interval_ms
        } else {
            config.base_delay_ms
        };
        compute_backoff(&config, base, error.retry_count)
    }

    /// Execute the primary action for `error`'s strategy
    pub async fn attempt_recovery(&self, error: &InitError) -> RecoveryResult {
        let strategy = self.get_error_strategy(error.code);
        info!("🔧 Attempting recovery for {} via {:?}", error.code, strategy.action);

        let result = match strategy.action {
            RecoveryAction::OpenBluetoothSettings => match self.launcher.open_bluetooth_settings().await {
                Ok(()) => RecoveryResult {
                    success: true,
                    message: "Opened Bluetooth settings".to_string(),
                    next_action: Some(RecoveryAction::RetryInitialization),
                    retry_after_ms: None,
                },
                Err(e) => self.settings_failure("Bluetooth", e),
            },
            RecoveryAction::OpenAppSettings => match self.launcher.open_app_settings().await {
                Ok(()) => RecoveryResult {
                    success: true,
                    message: "Opened app settings".to_string(),
                    next_action: Some(RecoveryAction::RetryInitialization),
                    retry_after_ms: None,
                },
                Err(e) => self.settings_failure("app", e),
            },
            RecoveryAction::RequestPermissions => match self.gateway.request_permissions().await {
                Ok(outcome) if outcome.success => RecoveryResult {
                    success: true,
                    message: "Permissions granted".to_string(),
                    next_action: Some(RecoveryAction::RetryInitialization),
                    retry_after_ms: Some(0),
                },
                Ok(outcome) if !outcome.never_ask_again_permissions.is_empty() => RecoveryResult {
                    success: false,
                    message: "Permissions are blocked; enable them in app settings".to_string(),
                    next_action: Some(RecoveryAction::OpenAppSettings),
                    retry_after_ms: None,
                },
                Ok(_) => RecoveryResult {
                    success: false,
                    message: "Permissions were not granted".to_string(),
                    next_action: Some(RecoveryAction::ShowInstructions),
                    retry_after_ms: None,
                },
                Err(e) => RecoveryResult {
                    success: false,
                    message: format!("Permission request failed: {}", e),
                    next_action: Some(RecoveryAction::ManualIntervention),
                    retry_after_ms: None,
                },
            },
            RecoveryAction::RestartRadioManager | RecoveryAction::RetryInitialization => {
                if self.can_recover(error) {
                    RecoveryResult {
                        success: true,
                        message: "Retry scheduled".to_string(),
                        next_action: Some(RecoveryAction::RetryInitialization),
                        retry_after_ms: Some(self.calculate_retry_delay(error).await),
                    }
                } else {
                    RecoveryResult {
                        success: false,
                        message: "Retry limit reached".to_string(),
                        next_action: Some(RecoveryAction::ContactSupport),
                        retry_after_ms: None,
                    }
                }
            }
            RecoveryAction::EnableLimitedMode => RecoveryResult {
                success: true,
                message: "Continuing in limited mode without Bluetooth".to_string(),
                next_action: None,
                retry_after_ms: None,
            },
            RecoveryAction::ShowInstructions => RecoveryResult {
                success: true,
                message: recovery_instructions(error.code).title,
                next_action: Some(RecoveryAction::ShowInstructions),
                retry_after_ms: None,
            },
            RecoveryAction::ContactSupport | RecoveryAction::ManualIntervention => RecoveryResult {
                success: false,
                message: "Manual intervention required".to_string(),
                next_action: Some(strategy.action),
                retry_after_ms: None,
            },
        };

        self.metrics
            .lock()
            .await
            .entry(error.code)
            .or_insert_with(|| ErrorMetrics::new(Utc::now()))
            .record_recovery(result.success);

        self.diagnostics
            .log(
                if result.success { LogLevel::Info } else { LogLevel::Warn },
                "recovery",
                format!("Recovery for {}: {}", error.code, result.message),
                None,
            )
            .await;

        result
    }

    pub fn get_recovery_instructions(&self, error: &InitError) -> RecoveryInstructions {
        recovery_instructions(error.code)
    }

    pub async fn get_retry_config(&self) -> RetryConfig {
        self.retry_config.read().await.clone()
    }

    /// Replace the retry policy; an invalid policy leaves the current one in place
    pub async fn update_retry_config(&self, config: RetryConfig) -> Result<(), ConfigError> {
        if let Err(e) = config.validate() {
            warn!("⚠️ Rejected retry config {:?}: {}", config, e);
            return Err(e);
        }
        info!("Retry config updated: {:?}", config);
        *self.retry_config.write().await = config;
        Ok(())
    }

    pub async fn get_error_metrics(&self, code: InitErrorCode) -> Option<ErrorMetrics> {
        self.metrics.lock().await.get(&code).cloned()
    }

    pub async fn get_all_error_metrics(&self) -> HashMap<InitErrorCode, ErrorMetrics> {
        self.metrics.lock().await.clone()
    }

    pub async fn clear_error_metrics(&self) {
        self.metrics.lock().await.clear();
    }

    fn settings_failure(&self, which: &str, error: anyhow::Error) -> RecoveryResult {
        warn!("⚠️ Failed to open {} settings: {}", which, error);
        RecoveryResult {
            success: false,
            message: format!("Couldn't open {} settings; open them manually", which),
            next_action: Some(RecoveryAction::ManualIntervention),
            retry_after_ms: None,
        }
    }
}

impl std::fmt::Debug for ErrorClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorClassifier").finish_non_exhaustive()
    }
}

/// Backoff delay in whole milliseconds, never above `config.max_delay_ms`
pub fn compute_backoff(config: &RetryConfig, base_ms: u64, retry_count: u32) -> u64 {
    let exponent = retry_count.min(i32::MAX as u32) as i32;
    let raw = base_ms as f64 * config.backoff_multiplier.powi(exponent);
    let mut delay = raw.min(config.max_delay_ms as f64);

    if config.jitter_enabled && config.max_jitter_ms > 0 {
        let jitter = rand::thread_rng().gen_range(0..=config.max_jitter_ms);
        delay = (delay + jitter as f64).min(config.max_delay_ms as f64);
    }
    delay.floor() as u64
}
