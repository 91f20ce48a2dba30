// Errors crossing the collaborator seams
//
// Consumer-facing failures are always expressed as `InitError`,
// `ErrorResponse` or `ValidationResult`; these enums only travel between the
// platform collaborators and the components that wrap them.

use crate::types::Permission;

/// Errors reported by the platform permission provider
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("Permission provider unavailable: {0}")]
    Unavailable(String),

    #[error("Permission {permission} is not known to the platform")]
    UnknownPermission { permission: Permission },

    #[error("Platform error: {0}")]
    Platform(String),
}

/// Errors raised by the permission gateway's request flow
#[derive(Debug, thiserror::Error)]
pub enum PermissionError {
    #[error("Permission request failed: {0}")]
    RequestFailed(#[from] ProviderError),
}

/// Errors reported by the radio adapter or its factory
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdapterError {
    #[error("Radio manager construction failed: {0}")]
    Construction(String),

    #[error("Radio manager construction timed out after {timeout_ms}ms")]
    ConstructionTimeout { timeout_ms: u64 },

    #[error("Scan failed: {0}")]
    Scan(String),

    #[error("Radio adapter has been destroyed")]
    Destroyed,

    #[error("Radio adapter error: {0}")]
    Other(String),
}

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {field} {reason}")]
    Invalid { field: &'static str, reason: &'static str },
}
