// Core radio types shared by every component
//
// This module contains the value records passed between the permission
// gateway, the state monitor, the error classifier and the initialization
// orchestrator: power states, permissions, capability snapshots, state
// change records and the closed error/recovery taxonomies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Power state reported by the radio adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    /// Radio stack is mid-reset; not a terminal answer
    Resetting,
    Unauthorized,
    Unsupported,
    Unknown,
}

impl PowerState {
    pub fn is_powered_on(&self) -> bool {
        matches!(self, PowerState::PoweredOn)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PowerState::PoweredOn => "PoweredOn",
            PowerState::PoweredOff => "PoweredOff",
            PowerState::Resetting => "Resetting",
            PowerState::Unauthorized => "Unauthorized",
            PowerState::Unsupported => "Unsupported",
            PowerState::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host platform family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Desktop,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Desktop => "desktop",
        };
        f.write_str(name)
    }
}

/// OS-level permissions the radio may need
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    BluetoothScan,
    BluetoothConnect,
    AccessFineLocation,
    AccessCoarseLocation,
}

impl Permission {
    /// Platform identifier for the permission
    pub fn id(&self) -> &'static str {
        match self {
            Permission::BluetoothScan => "android.permission.BLUETOOTH_SCAN",
            Permission::BluetoothConnect => "android.permission.BLUETOOTH_CONNECT",
            Permission::AccessFineLocation => "android.permission.ACCESS_FINE_LOCATION",
            Permission::AccessCoarseLocation => "android.permission.ACCESS_COARSE_LOCATION",
        }
    }

    /// Human-readable name shown in rationale dialogs
    pub fn display_name(&self) -> &'static str {
        match self {
            Permission::BluetoothScan => "Nearby devices (scan)",
            Permission::BluetoothConnect => "Nearby devices (connect)",
            Permission::AccessFineLocation => "Precise location",
            Permission::AccessCoarseLocation => "Approximate location",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Outcome of a single OS permission prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionResult {
    Granted,
    Denied,
    NeverAskAgain,
}

/// Point-in-time radio capability snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub ble_supported: bool,
    pub permissions_granted: bool,
    pub bluetooth_enabled: bool,
    pub can_scan: bool,
    pub can_connect: bool,
}

impl Capabilities {
    /// Derive scan/connect ability from the three prerequisite flags
    pub fn from_flags(ble_supported: bool, permissions_granted: bool, bluetooth_enabled: bool) -> Self {
        let ready = ble_supported && permissions_granted && bluetooth_enabled;
        Self {
            ble_supported,
            permissions_granted,
            bluetooth_enabled,
            can_scan: ready,
            can_connect: ready,
        }
    }
}

/// Live radio state maintained by the state monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    pub is_enabled: bool,
    pub is_supported: bool,
    pub has_permissions: bool,
    pub power_state: PowerState,
    pub last_checked: DateTime<Utc>,
    pub is_stable: bool,
}

impl SystemState {
    /// State before anything has been observed
    pub fn unknown() -> Self {
        Self {
            is_enabled: false,
            is_supported: false,
            has_permissions: false,
            power_state: PowerState::Unknown,
            last_checked: Utc::now(),
            is_stable: false,
        }
    }

    /// Whether the observable radio fields differ, ignoring timestamps and stability
    pub fn differs_from(&self, other: &SystemState) -> bool {
        self.is_enabled != other.is_enabled
            || self.is_supported != other.is_supported
            || self.has_permissions != other.has_permissions
            || self.power_state != other.power_state
    }
}

/// Transition record appended to the state history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChangeEvent {
    pub timestamp: DateTime<Utc>,
    pub previous_state: SystemState,
    pub new_state: SystemState,
    pub trigger: String,
    pub is_stability_change: bool,
}

/// Error severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    /// Reserved; no built-in strategy uses it
    Low,
}

/// Error category used to decide whether automatic recovery applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Hardware,
    Permissions,
    UserActionRequired,
    Temporary,
    Permanent,
}

/// Named remedial step attached to an error strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryAction {
    OpenBluetoothSettings,
    OpenAppSettings,
    RequestPermissions,
    RestartRadioManager,
    RetryInitialization,
    EnableLimitedMode,
    ContactSupport,
    ShowInstructions,
    ManualIntervention,
}

impl RecoveryAction {
    /// Actions that simply re-run the pipeline
    pub fn is_retry(&self) -> bool {
        matches!(
            self,
            RecoveryAction::RetryInitialization | RecoveryAction::RestartRadioManager
        )
    }
}

/// Closed set of initialization failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InitErrorCode {
    BluetoothNotSupported,
    BluetoothDisabled,
    PermissionsDenied,
    PermissionsNeverAskAgain,
    BleManagerInitFailed,
    ConnectionFailed,
    TimeoutError,
    ScanFailed,
    DeviceNotFound,
    LocationServicesDisabled,
    UnknownError,
}

impl InitErrorCode {
    pub const ALL: [InitErrorCode; 11] = [
        InitErrorCode::BluetoothNotSupported,
        InitErrorCode::BluetoothDisabled,
        InitErrorCode::PermissionsDenied,
        InitErrorCode::PermissionsNeverAskAgain,
        InitErrorCode::BleManagerInitFailed,
        InitErrorCode::ConnectionFailed,
        InitErrorCode::TimeoutError,
        InitErrorCode::ScanFailed,
        InitErrorCode::DeviceNotFound,
        InitErrorCode::LocationServicesDisabled,
        InitErrorCode::UnknownError,
    ];

    /// Whether the failure can be resolved without new hardware or a manual settings visit
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            InitErrorCode::BluetoothNotSupported | InitErrorCode::PermissionsNeverAskAgain
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InitErrorCode::BluetoothNotSupported => "BLUETOOTH_NOT_SUPPORTED",
            InitErrorCode::BluetoothDisabled => "BLUETOOTH_DISABLED",
            InitErrorCode::PermissionsDenied => "PERMISSIONS_DENIED",
            InitErrorCode::PermissionsNeverAskAgain => "PERMISSIONS_NEVER_ASK_AGAIN",
            InitErrorCode::BleManagerInitFailed => "BLE_MANAGER_INIT_FAILED",
            InitErrorCode::ConnectionFailed => "CONNECTION_FAILED",
            InitErrorCode::TimeoutError => "TIMEOUT_ERROR",
            InitErrorCode::ScanFailed => "SCAN_FAILED",
            InitErrorCode::DeviceNotFound => "DEVICE_NOT_FOUND",
            InitErrorCode::LocationServicesDisabled => "LOCATION_SERVICES_DISABLED",
            InitErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl std::fmt::Display for InitErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device seen during a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub id: String,
    pub name: Option<String>,
    pub rssi: Option<i16>,
}

/// Scan filter; the default matches every advertisement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFilter {
    pub service_uuids: Vec<String>,
}
