// Radio diagnostics: append-only histories, counters and reports
//
// Every other component records into this one: initialization attempts,
// permission changes, state transitions and free-form log lines. All
// histories are bounded ring buffers. Each log line is mirrored to tracing.

pub mod types;

use std::collections::BTreeMap;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::DiagnosticsConfig;
use crate::init::InitError;
use crate::platform::PlatformInfo;
use crate::types::{InitErrorCode, Permission, PowerState, StateChangeEvent};

pub use types::{
    DiagnosticExport, DiagnosticInfo, DiagnosticLogEntry, DiagnosticReport, ErrorSummary, LogLevel,
    PermissionRecord, ReportSummary, RingBuffer,
};

const REPORT_LOG_LINES: usize = 50;
const FLAPPING_THRESHOLD: usize = 10;

struct DiagnosticsState {
    logs: RingBuffer<DiagnosticLogEntry>,
    state_history: RingBuffer<StateChangeEvent>,
    permission_history: RingBuffer<PermissionRecord>,
    initialization_attempts: u32,
    successful_initializations: u32,
    last_success_time: Option<chrono::DateTime<Utc>>,
    last_error: Option<ErrorSummary>,
    errors_by_code: BTreeMap<InitErrorCode, u32>,
}

impl DiagnosticsState {
    fn new(config: &DiagnosticsConfig) -> Self {
        Self {
            logs: RingBuffer::new(config.max_log_entries),
            state_history: RingBuffer::new(config.max_state_history),
            permission_history: RingBuffer::new(config.max_permission_history),
            initialization_attempts: 0,
            successful_initializations: 0,
            last_success_time: None,
            last_error: None,
            errors_by_code: BTreeMap::new(),
        }
    }

    fn push_log(&mut self, entry: DiagnosticLogEntry) {
        match entry.level {
            LogLevel::Debug => debug!(category = %entry.category, "{}", entry.message),
            LogLevel::Info => info!(category = %entry.category, "{}", entry.message),
            LogLevel::Warn => warn!(category = %entry.category, "{}", entry.message),
            LogLevel::Error | LogLevel::Critical => {
                error!(category = %entry.category, level = ?entry.level, "{}", entry.message)
            }
        }
        self.logs.push(entry);
    }
}

/// Diagnostics recorder shared by every radio component
pub struct RadioDiagnostics {
    config: DiagnosticsConfig,
    device: PlatformInfo,
    state: Mutex<DiagnosticsState>,
}

impl RadioDiagnostics {
    pub fn new(config: DiagnosticsConfig, device: PlatformInfo) -> Self {
        let state = Mutex::new(DiagnosticsState::new(&config));
        Self { config, device, state }
    }

    pub fn device_info(&self) -> &PlatformInfo {
        &self.device
    }

    /// Append a structured log line
    pub async fn log(
        &self,
        level: LogLevel,
        category: &str,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) {
        let entry = DiagnosticLogEntry {
            timestamp: Utc::now(),
            level,
            category: category.to_string(),
            message: message.into(),
            details,
        };
        self.state.lock().await.push_log(entry);
    }

    /// Count one initialization attempt and its outcome
    pub async fn log_initialization_attempt(&self, success: bool, error: Option<&InitError>) {
        let mut state = self.state.lock().await;
        state.initialization_attempts += 1;

        if success {
            state.successful_initializations += 1;
            state.last_success_time = Some(Utc::now());
            let attempt = state.initialization_attempts;
            state.push_log(DiagnosticLogEntry {
                timestamp: Utc::now(),
                level: LogLevel::Info,
                category: "initialization".to_string(),
                message: format!("Initialization attempt {} succeeded", attempt),
                details: None,
            });
            return;
        }

        let (code, message) = match error {
            Some(err) => (err.code, err.message.clone()),
            None => (InitErrorCode::UnknownError, "Initialization failed".to_string()),
        };
        *state.errors_by_code.entry(code).or_insert(0) += 1;
        state.last_error = Some(ErrorSummary {
            code,
            message: message.clone(),
            timestamp: Utc::now(),
        });

        let attempt = state.initialization_attempts;
        let details = error.map(|err| {
            serde_json::json!({
                "code": err.code,
                "recoverable": err.recoverable,
                "technical_details": err.technical_details,
            })
        });
        state.push_log(DiagnosticLogEntry {
            timestamp: Utc::now(),
            level: if code.is_recoverable() { LogLevel::Error } else { LogLevel::Critical },
            category: "initialization".to_string(),
            message: format!("Initialization attempt {} failed: {} ({})", attempt, message, code),
            details,
        });
    }

    /// Record a permission check/request outcome
    pub async fn log_permission_change(&self, granted: bool, permissions: &[Permission]) {
        let mut state = self.state.lock().await;
        let previously_granted = state.permission_history.last().map(|r| r.granted).unwrap_or(false);

        state.permission_history.push(PermissionRecord {
            timestamp: Utc::now(),
            granted,
            permissions: permissions.to_vec(),
            previously_granted,
        });

        if granted != previously_granted {
            state.push_log(DiagnosticLogEntry {
                timestamp: Utc::now(),
                level: if granted { LogLevel::Info } else { LogLevel::Warn },
                category: "permissions".to_string(),
                message: format!(
                    "Permissions {} ({} entries)",
                    if granted { "granted" } else { "denied" },
                    permissions.len()
                ),
                details: Some(serde_json::json!({ "permissions": permissions })),
            });
        }
    }

    /// Record a radio state transition
    pub async fn add_state_change(&self, event: StateChangeEvent) {
        let mut state = self.state.lock().await;
        let message = if event.is_stability_change {
            format!("Radio state became stable ({})", event.new_state.power_state)
        } else {
            format!(
                "Radio state {} -> {} ({})",
                event.previous_state.power_state, event.new_state.power_state, event.trigger
            )
        };
        state.push_log(DiagnosticLogEntry {
            timestamp: event.timestamp,
            level: LogLevel::Debug,
            category: "state".to_string(),
            message,
            details: None,
        });
        state.state_history.push(event);
    }

    /// Snapshot attached to initialization errors
    pub async fn collect_diagnostic_info(&self) -> DiagnosticInfo {
        let state = self.state.lock().await;
        let n = self.config.snapshot_history_len;
        DiagnosticInfo {
            collected_at: Utc::now(),
            initialization_attempts: state.initialization_attempts,
            successful_initializations: state.successful_initializations,
            last_success_time: state.last_success_time,
            last_error: state.last_error.clone(),
            state_history: state.state_history.recent(n),
            permission_history: state.permission_history.recent(n),
            device: self.device.clone(),
        }
    }

    pub async fn generate_diagnostic_report(&self) -> DiagnosticReport {
        let info = self.collect_diagnostic_info().await;
        let state = self.state.lock().await;

        let attempts = state.initialization_attempts;
        let successes = state.successful_initializations;
        let success_rate = if attempts == 0 {
            0.0
        } else {
            successes as f64 / attempts as f64 * 100.0
        };

        let summary = ReportSummary {
            initialization_attempts: attempts,
            successful_initializations: successes,
            failed_initializations: attempts - successes,
            success_rate,
        };
        let recommendations = build_recommendations(&summary, &state);

        DiagnosticReport {
            generated_at: Utc::now(),
            summary,
            errors_by_code: state.errors_by_code.clone(),
            info,
            recent_logs: state.logs.recent(REPORT_LOG_LINES),
            recommendations,
        }
    }

    /// Serialize the current report with an export header
    pub async fn export_diagnostic_data(&self) -> Result<String, serde_json::Error> {
        let report = self.generate_diagnostic_report().await;
        let export = DiagnosticExport {
            export_timestamp: Utc::now(),
            app_version: self.device.app_version.clone(),
            platform: format!("{} {}", self.device.platform, self.device.os_version),
            device_class: self.device.device_class().to_string(),
            report,
        };
        serde_json::to_string_pretty(&export)
    }

    pub async fn clear_diagnostic_history(&self) {
        let mut state = self.state.lock().await;
        *state = DiagnosticsState::new(&self.config);
        info!("🧹 Diagnostic history cleared");
    }

    /// The newest `count` log lines, oldest first
    pub async fn get_recent_logs(&self, count: usize) -> Vec<DiagnosticLogEntry> {
        self.state.lock().await.logs.recent(count)
    }

    pub async fn get_state_history(&self) -> Vec<StateChangeEvent> {
        self.state.lock().await.state_history.to_vec()
    }

    pub async fn get_permission_history(&self) -> Vec<PermissionRecord> {
        self.state.lock().await.permission_history.to_vec()
    }
}

impl std::fmt::Debug for RadioDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioDiagnostics")
            .field("config", &self.config)
            .field("device", &self.device)
            .finish()
    }
}

fn build_recommendations(summary: &ReportSummary, state: &DiagnosticsState) -> Vec<String> {
    let mut recommendations = Vec::new();

    if summary.initialization_attempts > 0 && summary.success_rate < 50.0 {
        recommendations.push(
            "Bluetooth initialization fails more often than it succeeds; restart Bluetooth and the app".to_string(),
        );
    }

    if state.permission_history.last().map(|r| !r.granted).unwrap_or(false) {
        recommendations.push("Grant the Bluetooth and location permissions in app settings".to_string());
    }

    if let Some(last) = state.state_history.last() {
        if last.new_state.power_state == PowerState::PoweredOff {
            recommendations.push("Turn Bluetooth on".to_string());
        }
    }

    let transitions = state
        .state_history
        .to_vec()
        .iter()
        .filter(|e| !e.is_stability_change)
        .count();
    if transitions > FLAPPING_THRESHOLD {
        recommendations.push(format!(
            "Radio state changed {} times recently; the adapter may be unstable",
            transitions
        ));
    }

    if state.errors_by_code.contains_key(&InitErrorCode::BluetoothNotSupported) {
        recommendations.push("This device does not support Bluetooth Low Energy".to_string());
    }

    if recommendations.is_empty() {
        recommendations.push("No issues detected".to_string());
    }
    recommendations
}
