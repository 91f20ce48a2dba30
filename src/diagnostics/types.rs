// Diagnostic record types
//
// Log lines, permission records, the diagnostic snapshot attached to every
// initialization error, and the report/export shapes.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::PlatformInfo;
use crate::types::{InitErrorCode, Permission, StateChangeEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

/// Structured log line kept in the diagnostics ring buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticLogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub category: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// One permission check/request outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub timestamp: DateTime<Utc>,
    pub granted: bool,
    pub permissions: Vec<Permission>,
    pub previously_granted: bool,
}

/// Last recorded initialization failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub code: InitErrorCode,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot attached to every initialization error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticInfo {
    pub collected_at: DateTime<Utc>,
    pub initialization_attempts: u32,
    pub successful_initializations: u32,
    pub last_success_time: Option<DateTime<Utc>>,
    pub last_error: Option<ErrorSummary>,
    pub state_history: Vec<StateChangeEvent>,
    pub permission_history: Vec<PermissionRecord>,
    pub device: PlatformInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub initialization_attempts: u32,
    pub successful_initializations: u32,
    pub failed_initializations: u32,
    /// Percentage in `0.0..=100.0`
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub errors_by_code: BTreeMap<InitErrorCode, u32>,
    pub info: DiagnosticInfo,
    pub recent_logs: Vec<DiagnosticLogEntry>,
    pub recommendations: Vec<String>,
}

/// Envelope written by `export_diagnostic_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticExport {
    pub export_timestamp: DateTime<Utc>,
    pub app_version: String,
    pub platform: String,
    pub device_class: String,
    pub report: DiagnosticReport,
}

/// Fixed-capacity FIFO; pushing past capacity drops the oldest entry
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T: Clone> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            items: VecDeque::with_capacity(capacity.clamp(1, 1024)),
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    /// The newest `n` items, oldest first
    pub fn recent(&self, n: usize) -> Vec<T> {
        let skip = self.items.len().saturating_sub(n);
        self.items.iter().skip(skip).cloned().collect()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
