use super::types::RecoveryInstructions;
use crate::types::InitErrorCode;

fn build(
    title: &str,
    description: &str,
    steps: &[&str],
    automatic_recovery: bool,
    estimated_time: &str,
    success_indicators: &[&str],
) -> RecoveryInstructions {
    RecoveryInstructions {
        title: title.to_string(),
        description: description.to_string(),
        steps: steps.iter().map(|s| s.to_string()).collect(),
        automatic_recovery,
        estimated_time: estimated_time.to_string(),
        success_indicators: success_indicators.iter().map(|s| s.to_string()).collect(),
    }
}

/// Step-by-step guidance for `code`; unmapped codes get generic troubleshooting
pub fn recovery_instructions(code: InitErrorCode) -> RecoveryInstructions {
    match code {
        InitErrorCode::BluetoothNotSupported => build(
            "Bluetooth Low Energy not available",
            "This device can't talk to Bluetooth LE vehicle adapters.",
            &[
                "Check that your device supports Bluetooth 4.0 (Bluetooth Low Energy) or later",
                "Use a different phone or tablet with Bluetooth LE",
                "Continue in limited mode to review saved trips and reports",
            ],
            false,
            "N/A",
            &["Limited mode is active"],
        ),
        InitErrorCode::BluetoothDisabled => build(
            "Turn on Bluetooth",
            "Bluetooth must be on to reach the vehicle adapter.",
            &[
                "Open the quick settings panel or the Settings app",
                "Turn Bluetooth on",
                "Return to the app; the connection continues automatically",
            ],
            false,
            "Under a minute",
            &["The Bluetooth icon is shown in the status bar", "The app shows 'Ready to scan'"],
        ),
        InitErrorCode::PermissionsDenied => build(
            "Allow Bluetooth access",
            "The app needs permission to discover and connect to nearby devices.",
            &[
                "Tap 'Grant permissions'",
                "Choose 'Allow' for Nearby devices",
                "Choose 'Allow' for Location if asked",
            ],
            false,
            "Under a minute",
            &["No permission prompt is shown on the next launch"],
        ),
        InitErrorCode::PermissionsNeverAskAgain => build(
            "Enable permissions in Settings",
            "The permission prompt was turned off, so access must be granted from Settings.",
            &[
                "Tap 'Open app settings'",
                "Select Permissions",
                "Allow Nearby devices and Location",
                "Return to the app",
            ],
            false,
            "1-2 minutes",
            &["Permissions show as 'Allowed' in app settings"],
        ),
        InitErrorCode::BleManagerInitFailed => build(
            "Bluetooth failed to start",
            "The Bluetooth stack didn't respond. This is usually temporary.",
            &[
                "Wait a few seconds while the app retries",
                "Turn Bluetooth off and back on",
                "Restart the app",
                "Restart the device if the problem persists",
            ],
            true,
            "10-30 seconds",
            &["The app shows 'Ready to scan'"],
        ),
        InitErrorCode::ConnectionFailed => build(
            "Connection failed",
            "The vehicle adapter didn't accept the connection.",
            &[
                "Make sure the adapter is plugged into the OBD-II port",
                "Turn the ignition on",
                "Move closer to the vehicle",
                "Try connecting again",
            ],
            true,
            "Under a minute",
            &["The adapter shows as connected"],
        ),
        InitErrorCode::TimeoutError => build(
            "Bluetooth timed out",
            "Bluetooth took too long to respond.",
            &[
                "Wait a moment and try again",
                "Turn Bluetooth off and back on",
                "Restart the app",
            ],
            true,
            "Under a minute",
            &["The app shows 'Ready to scan'"],
        ),
        InitErrorCode::ScanFailed => build(
            "Scan failed",
            "Scanning for nearby devices stopped with an error.",
            &[
                "Try scanning again",
                "Turn Bluetooth off and back on",
                "Close other apps that use Bluetooth",
            ],
            true,
            "Under a minute",
            &["Nearby devices appear in the list"],
        ),
        InitErrorCode::DeviceNotFound => build(
            "Adapter not found",
            "No vehicle adapter was found nearby.",
            &[
                "Plug the adapter into the OBD-II port under the dashboard",
                "Turn the ignition to ON",
                "Check the adapter's power light",
                "Scan again",
            ],
            true,
            "1-2 minutes",
            &["The adapter appears in the device list"],
        ),
        InitErrorCode::LocationServicesDisabled => build(
            "Turn on location services",
            "This Android version requires location services for Bluetooth scanning.",
            &[
                "Open the quick settings panel",
                "Turn Location on",
                "Return to the app",
            ],
            false,
            "Under a minute",
            &["Nearby devices appear in the list"],
        ),
        InitErrorCode::UnknownError => generic_instructions(),
    }
}

pub fn generic_instructions() -> RecoveryInstructions {
    build(
        "Something went wrong",
        "An unexpected Bluetooth problem occurred.",
        &[
            "Try again",
            "Turn Bluetooth off and back on",
            "Restart the app",
            "Contact support and include the diagnostic report",
        ],
        false,
        "1-5 minutes",
        &["The app shows 'Ready to scan'"],
    )
}
