// Aggregate radio state validation
//
// Checks run in a fixed order; every failing check contributes one issue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Severity, SystemState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    NotSupported,
    PermissionsMissing,
    RadioDisabled,
    Unstable,
    AdapterMissing,
    /// An underlying check failed before the state could be evaluated
    CheckFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    pub recoverable: bool,
    pub recovery_steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
    pub recommendations: Vec<String>,
    pub last_validated: DateTime<Utc>,
}

impl ValidationResult {
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let recommendations = issues.iter().map(|issue| recommendation_for(issue.kind).to_string()).collect();
        Self {
            is_valid: issues.is_empty(),
            issues,
            recommendations,
            last_validated: Utc::now(),
        }
    }

    pub fn has_issue(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|issue| issue.kind == kind)
    }
}

fn issue(kind: IssueKind, severity: Severity, message: &str, recoverable: bool, steps: &[&str]) -> ValidationIssue {
    ValidationIssue {
        kind,
        severity,
        message: message.to_string(),
        recoverable,
        recovery_steps: steps.iter().map(|s| s.to_string()).collect(),
    }
}

fn recommendation_for(kind: IssueKind) -> &'static str {
    match kind {
        IssueKind::NotSupported => "Use a device with Bluetooth Low Energy support",
        IssueKind::PermissionsMissing => "Grant the Bluetooth permissions",
        IssueKind::RadioDisabled => "Turn Bluetooth on",
        IssueKind::Unstable => "Wait for the Bluetooth state to settle",
        IssueKind::AdapterMissing => "Initialize the Bluetooth manager",
        IssueKind::CheckFailed => "Retry the state check",
    }
}

/// Evaluate `state` in order: support, permissions, power, stability, adapter handle
pub fn evaluate(state: &SystemState, adapter_present: bool) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if !state.is_supported {
        issues.push(issue(
            IssueKind::NotSupported,
            Severity::Critical,
            "Bluetooth Low Energy is not supported on this device",
            false,
            &[
                "Confirm the device has Bluetooth 4.0 or later",
                "Use a different device",
            ],
        ));
    }

    if !state.has_permissions {
        issues.push(issue(
            IssueKind::PermissionsMissing,
            Severity::High,
            "Required Bluetooth permissions are missing",
            true,
            &[
                "Grant the requested permissions",
                "If no prompt appears, enable them in app settings",
            ],
        ));
    }

    if !state.is_enabled {
        issues.push(issue(
            IssueKind::RadioDisabled,
            Severity::High,
            "Bluetooth is turned off",
            true,
            &["Open Bluetooth settings", "Turn Bluetooth on"],
        ));
    }

    if !state.is_stable {
        issues.push(issue(
            IssueKind::Unstable,
            Severity::Medium,
            "Bluetooth state is still changing",
            true,
            &["Wait a few seconds", "Check again"],
        ));
    }

    if !adapter_present {
        issues.push(issue(
            IssueKind::AdapterMissing,
            Severity::High,
            "Bluetooth manager is not initialized",
            true,
            &["Run Bluetooth initialization", "Restart the app if it keeps failing"],
        ));
    }

    issues
}

/// Result for a validation whose underlying checks failed
pub fn check_failed(reason: &str) -> ValidationResult {
    ValidationResult::from_issues(vec![ValidationIssue {
        kind: IssueKind::CheckFailed,
        severity: Severity::High,
        message: format!("State check failed: {}", reason),
        recoverable: true,
        recovery_steps: vec!["Check again".to_string(), "Restart Bluetooth".to_string()],
    }])
}
