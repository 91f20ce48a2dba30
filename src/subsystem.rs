// Radio subsystem wiring
//
// Builds the five components from one config and one collaborator bundle,
// in dependency order: diagnostics, gateway, classifier, monitor, orchestrator.

use std::sync::Arc;

use tracing::info;

use crate::config::SubsystemConfig;
use crate::diagnostics::RadioDiagnostics;
use crate::error::ConfigError;
use crate::init::InitializationOrchestrator;
use crate::monitor::StateMonitor;
use crate::permissions::{PermissionGateway, PlatformProfile};
use crate::platform::{PermissionProvider, PlatformProbe, RadioAdapterFactory, SettingsLauncher};
use crate::recovery::ErrorClassifier;

/// Host-provided platform implementations
#[derive(Clone)]
pub struct Collaborators {
    pub permission_provider: Arc<dyn PermissionProvider>,
    pub adapter_factory: Arc<dyn RadioAdapterFactory>,
    pub settings_launcher: Arc<dyn SettingsLauncher>,
    pub platform_probe: Arc<dyn PlatformProbe>,
}

pub struct RadioSubsystem {
    config: SubsystemConfig,
    diagnostics: Arc<RadioDiagnostics>,
    gateway: Arc<PermissionGateway>,
    classifier: Arc<ErrorClassifier>,
    monitor: Arc<StateMonitor>,
    orchestrator: Arc<InitializationOrchestrator>,
}

impl RadioSubsystem {
    pub fn new(config: SubsystemConfig, collaborators: Collaborators) -> Result<Self, ConfigError> {
        config.validate()?;

        let device = collaborators.platform_probe.info();
        info!(
            "🔧 Building radio subsystem for {} {} (app {})",
            device.platform, device.os_version, device.app_version
        );
        let profile = PlatformProfile::resolve(device.platform, device.api_level);

        let diagnostics = Arc::new(RadioDiagnostics::new(config.diagnostics.clone(), device));
        let gateway = Arc::new(PermissionGateway::new(
            config.permissions.clone(),
            profile,
            collaborators.permission_provider.clone(),
            collaborators.settings_launcher.clone(),
            diagnostics.clone(),
        ));
        let classifier = Arc::new(ErrorClassifier::new(
            config.retry.clone(),
            collaborators.settings_launcher.clone(),
            gateway.clone(),
            diagnostics.clone(),
        ));
        let monitor = Arc::new(StateMonitor::new(
            config.monitor.clone(),
            gateway.clone(),
            collaborators.platform_probe.clone(),
            diagnostics.clone(),
        ));
        let orchestrator = Arc::new(InitializationOrchestrator::new(
            config.init.clone(),
            gateway.clone(),
            classifier.clone(),
            monitor.clone(),
            diagnostics.clone(),
            collaborators.platform_probe.clone(),
            collaborators.adapter_factory.clone(),
        ));

        Ok(Self {
            config,
            diagnostics,
            gateway,
            classifier,
            monitor,
            orchestrator,
        })
    }

    pub fn config(&self) -> &SubsystemConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &Arc<RadioDiagnostics> {
        &self.diagnostics
    }

    pub fn permissions(&self) -> &Arc<PermissionGateway> {
        &self.gateway
    }

    pub fn classifier(&self) -> &Arc<ErrorClassifier> {
        &self.classifier
    }

    pub fn monitor(&self) -> &Arc<StateMonitor> {
        &self.monitor
    }

    pub fn orchestrator(&self) -> &Arc<InitializationOrchestrator> {
        &self.orchestrator
    }

    /// Tear everything down; the instance can be initialized again afterwards
    pub async fn shutdown(&self) {
        self.orchestrator.destroy().await;
        info!("🛑 Radio subsystem shut down");
    }
}

impl std::fmt::Debug for RadioSubsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioSubsystem")
            .field("config", &self.config)
            .field("monitor", &self.monitor)
            .finish_non_exhaustive()
    }
}
