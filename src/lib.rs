pub mod config;
pub mod diagnostics;
pub mod error;
pub mod init;
pub mod listeners;
pub mod log;
pub mod monitor;
pub mod permissions;
pub mod platform;
pub mod recovery;
pub mod subsystem;
pub mod types;

// Re-export the component types for hosts and tests
pub use config::{
    DiagnosticsConfig, InitConfig, MonitorConfig, PermissionConfig, RetryConfig, SubsystemConfig,
};
pub use diagnostics::{DiagnosticExport, DiagnosticInfo, DiagnosticReport, LogLevel, RadioDiagnostics};
pub use error::{AdapterError, ConfigError, PermissionError, ProviderError};
pub use init::{InitError, InitResult, InitStatus, InitializationOrchestrator};
pub use listeners::ListenerId;
pub use monitor::{IssueKind, StateMonitor, ValidationResult};
pub use permissions::{
    PermissionGateway, PermissionRationale, PermissionRequestResult, PermissionStatus, PlatformProfile,
};
pub use platform::{
    HostPlatformProbe, HostSettingsLauncher, PermissionProvider, PlatformInfo, PlatformProbe,
    PowerStateStream, RadioAdapter, RadioAdapterFactory, ScanStream, SettingsLauncher,
};
pub use recovery::{
    ErrorClassifier, ErrorMetrics, ErrorResponse, ErrorStrategy, RecoveryInstructions, RecoveryOption,
    RecoveryResult,
};
pub use subsystem::{Collaborators, RadioSubsystem};
pub use types::{
    Capabilities, DiscoveredDevice, ErrorCategory, InitErrorCode, Permission, PermissionResult, Platform,
    PowerState, RecoveryAction, ScanFilter, Severity, StateChangeEvent, SystemState,
};
