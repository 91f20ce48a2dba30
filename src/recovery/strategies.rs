// Error strategy table
//
// One entry per known error code. Codes without an entry use
// `default_strategy()`.

use super::types::{ErrorStrategy, RecoveryOption};
use crate::types::{ErrorCategory, InitErrorCode, RecoveryAction, Severity};

use RecoveryAction::*;

pub fn strategy_for(code: InitErrorCode) -> Option<ErrorStrategy> {
    let strategy = match code {
        InitErrorCode::BluetoothNotSupported => ErrorStrategy {
            user_message: "This device doesn't support Bluetooth Low Energy, which is needed to reach your vehicle adapter."
                .to_string(),
            technical_message: "BLE hardware absent or not exposed by the OS".to_string(),
            action: EnableLimitedMode,
            auto_retry: false,
            max_retries: 0,
            retry_interval_ms: 0,
            severity: Severity::Critical,
            category: ErrorCategory::Permanent,
            recovery_options: vec![
                RecoveryOption::new(EnableLimitedMode, "Continue without Bluetooth", 1),
                RecoveryOption::new(ContactSupport, "Contact support", 2),
            ],
        },
        InitErrorCode::BluetoothDisabled => ErrorStrategy {
            user_message: "Bluetooth is turned off. Turn it on to connect to your vehicle.".to_string(),
            technical_message: "Adapter power state is PoweredOff".to_string(),
            action: OpenBluetoothSettings,
            auto_retry: false,
            max_retries: 3,
            retry_interval_ms: 2000,
            severity: Severity::High,
            category: ErrorCategory::UserActionRequired,
            recovery_options: vec![
                RecoveryOption::new(OpenBluetoothSettings, "Open Bluetooth settings", 1),
                RecoveryOption::new(ShowInstructions, "Show me how", 2),
                RecoveryOption::new(RetryInitialization, "I turned it on - try again", 3),
            ],
        },
        InitErrorCode::PermissionsDenied => ErrorStrategy {
            user_message: "Bluetooth permissions are needed to find your vehicle adapter.".to_string(),
            technical_message: "One or more required runtime permissions were denied".to_string(),
            action: RequestPermissions,
            auto_retry: false,
            max_retries: 3,
            retry_interval_ms: 1000,
            severity: Severity::High,
            category: ErrorCategory::Permissions,
            recovery_options: vec![
                RecoveryOption::new(RequestPermissions, "Grant permissions", 1),
                RecoveryOption::new(ShowInstructions, "Why are these needed?", 2),
                RecoveryOption::new(OpenAppSettings, "Open app settings", 3),
            ],
        },
        InitErrorCode::PermissionsNeverAskAgain => ErrorStrategy {
            user_message: "Bluetooth permissions were blocked. Enable them in the app settings to continue."
                .to_string(),
            technical_message: "Permission prompt suppressed by the OS (never ask again)".to_string(),
            action: OpenAppSettings,
            auto_retry: false,
            max_retries: 0,
            retry_interval_ms: 0,
            severity: Severity::High,
            category: ErrorCategory::Permissions,
            recovery_options: vec![
                RecoveryOption::new(OpenAppSettings, "Open app settings", 1),
                RecoveryOption::new(ShowInstructions, "Show me how", 2),
            ],
        },
        InitErrorCode::BleManagerInitFailed => ErrorStrategy {
            user_message: "Bluetooth couldn't be started. Retrying...".to_string(),
            technical_message: "Radio manager construction, timeout or smoke test failure".to_string(),
            action: RestartRadioManager,
            auto_retry: true,
            max_retries: 3,
            retry_interval_ms: 2000,
            severity: Severity::High,
            category: ErrorCategory::Temporary,
            recovery_options: vec![
                RecoveryOption::new(RestartRadioManager, "Restart Bluetooth", 1),
                RecoveryOption::new(RetryInitialization, "Try again", 2),
                RecoveryOption::new(ContactSupport, "Contact support", 3),
            ],
        },
        InitErrorCode::ConnectionFailed => ErrorStrategy {
            user_message: "Couldn't connect to the vehicle adapter.".to_string(),
            technical_message: "Connection attempt failed or dropped".to_string(),
            action: RetryInitialization,
            auto_retry: true,
            max_retries: 3,
            retry_interval_ms: 1000,
            severity: Severity::Medium,
            category: ErrorCategory::Temporary,
            recovery_options: vec![
                RecoveryOption::new(RetryInitialization, "Try again", 1),
                RecoveryOption::new(OpenBluetoothSettings, "Check Bluetooth settings", 2),
                RecoveryOption::new(ShowInstructions, "Troubleshooting tips", 3),
            ],
        },
        InitErrorCode::TimeoutError => ErrorStrategy {
            user_message: "Bluetooth took too long to respond.".to_string(),
            technical_message: "Operation exceeded its time bound".to_string(),
            action: RetryInitialization,
            auto_retry: true,
            max_retries: 2,
            retry_interval_ms: 1000,
            severity: Severity::Medium,
            category: ErrorCategory::Temporary,
            recovery_options: vec![
                RecoveryOption::new(RetryInitialization, "Try again", 1),
                RecoveryOption::new(ShowInstructions, "Troubleshooting tips", 2),
            ],
        },
        InitErrorCode::ScanFailed => ErrorStrategy {
            user_message: "Scanning for devices failed.".to_string(),
            technical_message: "Adapter reported a scan error".to_string(),
            action: RetryInitialization,
            auto_retry: true,
            max_retries: 3,
            retry_interval_ms: 1500,
            severity: Severity::Medium,
            category: ErrorCategory::Temporary,
            recovery_options: vec![
                RecoveryOption::new(RetryInitialization, "Scan again", 1),
                RecoveryOption::new(RestartRadioManager, "Restart Bluetooth", 2),
            ],
        },
        InitErrorCode::DeviceNotFound => ErrorStrategy {
            user_message: "No vehicle adapter found nearby. Make sure it is plugged in and the ignition is on."
                .to_string(),
            technical_message: "Scan completed without a matching peripheral".to_string(),
            action: ShowInstructions,
            auto_retry: true,
            max_retries: 2,
            retry_interval_ms: 3000,
            severity: Severity::Medium,
            category: ErrorCategory::UserActionRequired,
            recovery_options: vec![
                RecoveryOption::new(ShowInstructions, "How to set up the adapter", 1),
                RecoveryOption::new(RetryInitialization, "Scan again", 2),
            ],
        },
        InitErrorCode::LocationServicesDisabled => ErrorStrategy {
            user_message: "Location services are off. This Android version needs them on to scan for Bluetooth devices."
                .to_string(),
            technical_message: "Legacy BLE scanning requires system location services".to_string(),
            action: ShowInstructions,
            auto_retry: false,
            max_retries: 0,
            retry_interval_ms: 0,
            severity: Severity::High,
            category: ErrorCategory::UserActionRequired,
            recovery_options: vec![
                RecoveryOption::new(ShowInstructions, "Show me how", 1),
                RecoveryOption::new(OpenAppSettings, "Open settings", 2),
            ],
        },
        InitErrorCode::UnknownError => return None,
    };
    Some(strategy)
}

/// Fallback for codes without a table entry
pub fn default_strategy() -> ErrorStrategy {
    ErrorStrategy {
        user_message: "Something went wrong while starting Bluetooth.".to_string(),
        technical_message: "Unclassified error".to_string(),
        action: RetryInitialization,
        auto_retry: true,
        max_retries: 1,
        retry_interval_ms: 0,
        severity: Severity::Medium,
        category: ErrorCategory::Temporary,
        recovery_options: vec![
            RecoveryOption::new(RetryInitialization, "Try again", 1),
            RecoveryOption::new(ContactSupport, "Contact support", 2),
        ],
    }
}
