// Platform collaborator seams
//
// The radio subsystem never talks to an OS API directly. Everything it needs
// from the host comes through these traits, injected at construction:
// - PermissionProvider: OS permission check/request
// - RadioAdapterFactory / RadioAdapter: the BLE stack's manager object
// - SettingsLauncher: opens OS settings screens
// - PlatformProbe: device description, BLE presence, fallback power query

pub mod host;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, ProviderError};
use crate::permissions::PermissionRationale;
use crate::types::{DiscoveredDevice, Permission, PermissionResult, Platform, PowerState, ScanFilter};

pub use host::{HostPlatformProbe, HostSettingsLauncher, SettingsTarget};

/// Stream of power states from a state-change subscription
pub type PowerStateStream = BoxStream<'static, PowerState>;

/// Stream of scan results; an `Err` item is an adapter-reported scan error
pub type ScanStream = BoxStream<'static, Result<DiscoveredDevice, AdapterError>>;

/// Checks and requests OS-level permissions
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    async fn check_permission(&self, permission: Permission) -> Result<bool, ProviderError>;

    /// Prompt for all of `permissions` in one batch
    async fn request_permissions(
        &self,
        permissions: &[Permission],
    ) -> Result<HashMap<Permission, PermissionResult>, ProviderError>;

    /// Show an explanatory dialog; `false` means the user backed out
    async fn show_rationale(&self, _rationale: &PermissionRationale) -> bool {
        true
    }
}

/// Handle on the BLE stack's manager object
#[async_trait]
pub trait RadioAdapter: Send + Sync {
    async fn current_power_state(&self) -> Result<PowerState, AdapterError>;

    /// Power-state changes; with `emit_current` the present state is yielded first.
    /// Dropping the stream removes the subscription.
    fn subscribe_state_changes(&self, emit_current: bool) -> PowerStateStream;

    async fn start_scan(&self, filter: Option<ScanFilter>) -> Result<ScanStream, AdapterError>;

    async fn stop_scan(&self) -> Result<(), AdapterError>;

    async fn destroy(&self);
}

/// Builds radio adapter handles
#[async_trait]
pub trait RadioAdapterFactory: Send + Sync {
    async fn create(&self) -> Result<Arc<dyn RadioAdapter>, AdapterError>;
}

/// Opens OS settings screens
#[async_trait]
pub trait SettingsLauncher: Send + Sync {
    async fn open_bluetooth_settings(&self) -> anyhow::Result<()>;

    async fn open_app_settings(&self) -> anyhow::Result<()>;
}

/// Static description of the host device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub platform: Platform,
    pub os_version: String,
    /// Android API level, when the platform has one
    pub api_level: Option<u32>,
    pub device_model: String,
    pub app_version: String,
    pub library_version: String,
}

impl PlatformInfo {
    /// Coarse device class used in exported diagnostics
    pub fn device_class(&self) -> &'static str {
        match self.platform {
            Platform::Android | Platform::Ios => "mobile",
            Platform::Desktop => "desktop",
        }
    }
}

/// Host queries that do not need an adapter handle
#[async_trait]
pub trait PlatformProbe: Send + Sync {
    fn info(&self) -> PlatformInfo;

    async fn is_ble_supported(&self) -> anyhow::Result<bool>;

    /// Best-effort power query used when no adapter handle exists
    async fn power_state(&self) -> anyhow::Result<PowerState>;
}
