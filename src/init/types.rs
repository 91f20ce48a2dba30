// Initialization status and result records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diagnostics::DiagnosticInfo;
use crate::recovery::ErrorResponse;
use crate::types::{Capabilities, InitErrorCode};

/// Orchestrator state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InitStatus {
    #[default]
    NotStarted,
    InProgress,
    Retrying,
    CompletedSuccess,
    CompletedError,
}

impl InitStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InitStatus::CompletedSuccess | InitStatus::CompletedError)
    }
}

/// Terminal failure description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitError {
    pub code: InitErrorCode,
    pub message: String,
    pub technical_details: String,
    pub timestamp: DateTime<Utc>,
    pub recoverable: bool,
    pub recovery_steps: Vec<String>,
    /// How many attempts preceded this one
    pub retry_count: u32,
    pub diagnostic_info: Option<DiagnosticInfo>,
}

impl InitError {
    pub fn new(code: InitErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            technical_details: String::new(),
            timestamp: Utc::now(),
            recoverable: code.is_recoverable(),
            recovery_steps: Vec::new(),
            retry_count: 0,
            diagnostic_info: None,
        }
    }

    pub fn with_technical_details(mut self, details: impl Into<String>) -> Self {
        self.technical_details = details.into();
        self
    }

    pub fn with_recovery_steps(mut self, steps: Vec<String>) -> Self {
        self.recovery_steps = steps;
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_diagnostics(mut self, info: DiagnosticInfo) -> Self {
        self.diagnostic_info = Some(info);
        self
    }
}

impl std::fmt::Display for InitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for InitError {}

/// Outcome delivered by `initialize()`/`retry()` and to completion listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitResult {
    pub success: bool,
    pub status: InitStatus,
    pub capabilities: Capabilities,
    pub error: Option<InitError>,
    /// What to show the user for `error`
    pub error_response: Option<ErrorResponse>,
    pub recommendations: Vec<String>,
    pub attempt: u32,
    pub completed_at: DateTime<Utc>,
}
