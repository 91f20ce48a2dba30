// Recovery policy and outcome records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ErrorCategory, RecoveryAction, Severity};

/// One remedial option offered to the user; lower priority sorts first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryOption {
    pub action: RecoveryAction,
    pub label: String,
    pub priority: u8,
}

impl RecoveryOption {
    pub fn new(action: RecoveryAction, label: &str, priority: u8) -> Self {
        Self {
            action,
            label: label.to_string(),
            priority,
        }
    }
}

/// Recovery policy for one error code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorStrategy {
    pub user_message: String,
    pub technical_message: String,
    pub action: RecoveryAction,
    pub auto_retry: bool,
    pub max_retries: u32,
    /// Base interval for exponential backoff; 0 means "use the retry config base"
    pub retry_interval_ms: u64,
    pub severity: Severity,
    pub category: ErrorCategory,
    pub recovery_options: Vec<RecoveryOption>,
}

/// What a consumer shows for an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub user_message: String,
    pub technical_message: String,
    /// Sorted by ascending priority; retry options dropped once retries are exhausted
    pub recovery_options: Vec<RecoveryOption>,
    pub should_retry: bool,
    pub retry_delay_ms: u64,
    pub severity: Severity,
    pub category: ErrorCategory,
}

/// Outcome of executing a strategy's primary action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryResult {
    pub success: bool,
    pub message: String,
    pub next_action: Option<RecoveryAction>,
    pub retry_after_ms: Option<u64>,
}

/// Static human-readable guidance for an error code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryInstructions {
    pub title: String,
    pub description: String,
    pub steps: Vec<String>,
    pub automatic_recovery: bool,
    pub estimated_time: String,
    pub success_indicators: Vec<String>,
}

/// Per-code statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    pub occurrence_count: u32,
    pub first_occurrence: DateTime<Utc>,
    pub last_occurrence: DateTime<Utc>,
    pub recovery_attempts: u32,
    /// Fraction of recovery attempts that succeeded, `0.0..=1.0`
    pub recovery_success_rate: f64,
}

impl ErrorMetrics {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            occurrence_count: 0,
            first_occurrence: now,
            last_occurrence: now,
            recovery_attempts: 0,
            recovery_success_rate: 0.0,
        }
    }

    pub fn record_occurrence(&mut self, now: DateTime<Utc>) {
        self.occurrence_count += 1;
        self.last_occurrence = now;
    }

    /// Incremental mean over recovery outcomes
    pub fn record_recovery(&mut self, success: bool) {
        self.recovery_attempts += 1;
        let n = self.recovery_attempts as f64;
        let outcome = if success { 1.0 } else { 0.0 };
        self.recovery_success_rate = (self.recovery_success_rate * (n - 1.0) + outcome) / n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_rate_is_running_mean() {
        let mut metrics = ErrorMetrics::new(Utc::now());
        metrics.record_recovery(true);
        assert_eq!(metrics.recovery_success_rate, 1.0);
        metrics.record_recovery(false);
        assert_eq!(metrics.recovery_success_rate, 0.5);
        metrics.record_recovery(false);
        metrics.record_recovery(true);
        assert_eq!(metrics.recovery_success_rate, 0.5);
        assert_eq!(metrics.recovery_attempts, 4);
    }
}
