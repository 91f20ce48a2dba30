// Radio permission gateway
// This handles resolving, checking and requesting the OS permissions the BLE
// radio needs on the current platform

pub mod platform;
pub mod types;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::PermissionConfig;
use crate::diagnostics::{LogLevel, RadioDiagnostics};
use crate::error::PermissionError;
use crate::platform::{PermissionProvider, SettingsLauncher};
use crate::radio_debug;
use crate::types::{Permission, PermissionResult, RecoveryAction};

pub use platform::PlatformProfile;
pub use types::{PermissionRationale, PermissionRequestResult, PermissionStatus};

/// Permission gateway for the BLE radio
pub struct PermissionGateway {
    config: PermissionConfig,
    profile: PlatformProfile,
    provider: Arc<dyn PermissionProvider>,
    launcher: Arc<dyn SettingsLauncher>,
    diagnostics: Arc<RadioDiagnostics>,
    never_ask_again: Mutex<HashSet<Permission>>,
    last_granted: Mutex<Option<bool>>,
}

impl PermissionGateway {
    pub fn new(
        config: PermissionConfig,
        profile: PlatformProfile,
        provider: Arc<dyn PermissionProvider>,
        launcher: Arc<dyn SettingsLauncher>,
        diagnostics: Arc<RadioDiagnostics>,
    ) -> Self {
        info!(
            "Permission profile for {}: {} required, prompting {}",
            profile.platform,
            profile.required_permissions.len(),
            if profile.supports_prompting { "supported" } else { "unsupported" }
        );
        Self {
            config,
            profile,
            provider,
            launcher,
            diagnostics,
            never_ask_again: Mutex::new(HashSet::new()),
            last_granted: Mutex::new(None),
        }
    }

    pub fn platform_profile(&self) -> &PlatformProfile {
        &self.profile
    }

    /// Permissions this platform needs, in request order
    pub fn get_required_permissions(&self) -> Vec<Permission> {
        self.profile.required_permissions.clone()
    }

    /// Query every required permission. Provider errors degrade to "all denied".
    pub async fn check_permissions(&self) -> PermissionStatus {
        let required = &self.profile.required_permissions;
        let mut granted_permissions = Vec::new();
        let mut missing_permissions = Vec::new();

        for &permission in required {
            match self.provider.check_permission(permission).await {
                Ok(true) => granted_permissions.push(permission),
                Ok(false) => missing_permissions.push(permission),
                Err(e) => {
                    warn!("⚠️ Permission check failed for {}: {} - treating all as denied", permission, e);
                    self.diagnostics
                        .log(LogLevel::Warn, "permissions", format!("Permission check failed: {}", e), None)
                        .await;
                    let status = PermissionStatus::all_denied(required);
                    self.record_check(&status).await;
                    return status;
                }
            }
            radio_debug!("Permission {} checked", permission);
        }

        let status = PermissionStatus {
            granted: missing_permissions.is_empty(),
            partially_granted: !granted_permissions.is_empty() && !missing_permissions.is_empty(),
            missing_permissions,
            granted_permissions,
        };
        self.record_check(&status).await;
        status
    }

    /// Check, optionally explain, then prompt for whatever is missing in one batch
    pub async fn request_permissions(&self) -> Result<PermissionRequestResult, PermissionError> {
        let status = self.check_permissions().await;
        if status.granted {
            return Ok(PermissionRequestResult {
                success: true,
                granted: status.granted_permissions,
                ..Default::default()
            });
        }

        let missing = status.missing_permissions.clone();

        if self.config.show_rationale && self.profile.supports_prompting {
            let rationale = self.rationale_for(&missing);
            if !self.provider.show_rationale(&rationale).await {
                info!("User declined the permission rationale; not prompting");
                self.diagnostics.log_permission_change(false, &missing).await;
                return Ok(PermissionRequestResult {
                    success: false,
                    granted: status.granted_permissions,
                    denied_permissions: missing,
                    never_ask_again_permissions: Vec::new(),
                    should_show_rationale: true,
                });
            }
        }

        info!("Requesting {} permission(s)", missing.len());
        let outcomes = match self.provider.request_permissions(&missing).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                self.diagnostics
                    .log(LogLevel::Error, "permissions", format!("Permission request failed: {}", e), None)
                    .await;
                return Err(e.into());
            }
        };

        let mut granted = status.granted_permissions;
        let mut denied_permissions = Vec::new();
        let mut never_ask_again_permissions = Vec::new();

        for permission in missing {
            match outcomes.get(&permission) {
                Some(PermissionResult::Granted) => granted.push(permission),
                Some(PermissionResult::NeverAskAgain) => never_ask_again_permissions.push(permission),
                Some(PermissionResult::Denied) | None => denied_permissions.push(permission),
            }
        }

        {
            let mut blocked = self.never_ask_again.lock().await;
            for permission in &granted {
                blocked.remove(permission);
            }
            blocked.extend(never_ask_again_permissions.iter().copied());
        }

        let success = denied_permissions.is_empty() && never_ask_again_permissions.is_empty();
        self.diagnostics
            .log_permission_change(success, &self.profile.required_permissions)
            .await;
        *self.last_granted.lock().await = Some(success);

        if success {
            info!("✅ All radio permissions granted");
        } else {
            warn!(
                "❌ Permissions not granted: {} denied, {} blocked",
                denied_permissions.len(),
                never_ask_again_permissions.len()
            );
        }

        Ok(PermissionRequestResult {
            success,
            should_show_rationale: self.profile.supports_prompting && !denied_permissions.is_empty(),
            granted,
            denied_permissions,
            never_ask_again_permissions,
        })
    }

    /// True on prompting platforms while anything required is missing
    pub async fn should_show_rationale(&self) -> bool {
        if !self.profile.supports_prompting {
            return false;
        }
        !self.check_permissions().await.missing_permissions.is_empty()
    }

    /// Open the app's permission settings; failures are only logged
    pub async fn open_permission_settings(&self) {
        if let Err(e) = self.launcher.open_app_settings().await {
            warn!("⚠️ Failed to open permission settings: {}", e);
            self.diagnostics
                .log(LogLevel::Warn, "permissions", format!("Opening settings failed: {}", e), None)
                .await;
        }
    }

    /// Best single remedial action for a denied permission
    pub async fn handle_permission_denied(&self, permission: Permission) -> RecoveryAction {
        if self.never_ask_again.lock().await.contains(&permission) {
            RecoveryAction::OpenAppSettings
        } else if self.profile.supports_prompting {
            RecoveryAction::RequestPermissions
        } else {
            RecoveryAction::ShowInstructions
        }
    }

    /// Permissions the OS will no longer prompt for
    pub async fn blocked_permissions(&self) -> Vec<Permission> {
        let mut blocked: Vec<Permission> = self.never_ask_again.lock().await.iter().copied().collect();
        blocked.sort();
        blocked
    }

    fn rationale_for(&self, missing: &[Permission]) -> PermissionRationale {
        PermissionRationale {
            title: self.config.rationale_title.clone(),
            message: self.config.rationale_message.clone(),
            permissions: missing.to_vec(),
            accept_label: "Continue".to_string(),
            decline_label: "Not now".to_string(),
        }
    }

    async fn record_check(&self, status: &PermissionStatus) {
        let mut last = self.last_granted.lock().await;
        if *last != Some(status.granted) {
            *last = Some(status.granted);
            drop(last);
            self.diagnostics
                .log_permission_change(status.granted, &self.profile.required_permissions)
                .await;
        }
    }
}

impl std::fmt::Debug for PermissionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGateway")
            .field("config", &self.config)
            .field("profile", &self.profile)
            .finish()
    }
}
