// BLE initialization orchestrator
//
// Top-level state machine. `initialize()` runs, strictly in order and
// stopping at the first failure:
// 1. BLE support check
// 2. permission check, then request
// 3. radio manager construction (time-bounded)
// 4. power state validation (bounded re-checks while Resetting)
// 5. functional scan smoke test (time-bounded)
//
// Every outcome is recorded in diagnostics and delivered to completion
// listeners. `destroy()` cancels any wait in flight.

pub mod types;

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::{sleep, timeout, Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::InitConfig;
use crate::diagnostics::{LogLevel, RadioDiagnostics};
use crate::error::AdapterError;
use crate::listeners::{ListenerId, ListenerSet};
use crate::monitor::StateMonitor;
use crate::permissions::PermissionGateway;
use crate::platform::{PlatformProbe, RadioAdapter, RadioAdapterFactory};
use crate::recovery::{recovery_instructions, ErrorClassifier, ErrorResponse};
use crate::types::{Capabilities, InitErrorCode, PowerState};

pub use types::{InitError, InitResult, InitStatus};

/// Why a pipeline step stopped
#[derive(Debug)]
struct StepFailure {
    code: InitErrorCode,
    message: String,
    technical: String,
}

impl StepFailure {
    fn new(code: InitErrorCode, message: &str, technical: impl Into<String>) -> Self {
        Self {
            code,
            message: message.to_string(),
            technical: technical.into(),
        }
    }
}

#[derive(Debug, Default)]
struct OrchestratorState {
    status: InitStatus,
    attempt_count: u32,
    last_result: Option<InitResult>,
}

pub struct InitializationOrchestrator {
    config: InitConfig,
    gateway: Arc<PermissionGateway>,
    classifier: Arc<ErrorClassifier>,
    monitor: Arc<StateMonitor>,
    diagnostics: Arc<RadioDiagnostics>,
    probe: Arc<dyn PlatformProbe>,
    factory: Arc<dyn RadioAdapterFactory>,
    adapter: RwLock<Option<Arc<dyn RadioAdapter>>>,
    state: Mutex<OrchestratorState>,
    /// Serializes pipeline runs
    run_lock: Mutex<()>,
    listeners: ListenerSet<InitResult>,
    /// Bumped by `destroy()`; every wait races it
    teardown: watch::Sender<u64>,
}

impl InitializationOrchestrator {
    pub fn new(
        config: InitConfig,
        gateway: Arc<PermissionGateway>,
        classifier: Arc<ErrorClassifier>,
        monitor: Arc<StateMonitor>,
        diagnostics: Arc<RadioDiagnostics>,
        probe: Arc<dyn PlatformProbe>,
        factory: Arc<dyn RadioAdapterFactory>,
    ) -> Self {
        let (teardown, _) = watch::channel(0);
        Self {
            config,
            gateway,
            classifier,
            monitor,
            diagnostics,
            probe,
            factory,
            adapter: RwLock::new(None),
            state: Mutex::new(OrchestratorState::default()),
            run_lock: Mutex::new(()),
            listeners: ListenerSet::new("initialization complete"),
            teardown,
        }
    }

    /// Bring the radio to "ready". Returns immediately once a run has succeeded.
    pub async fn initialize(&self) -> InitResult {
        let _run = self.run_lock.lock().await;

        {
            let state = self.state.lock().await;
            if state.status == InitStatus::CompletedSuccess {
                if let Some(result) = &state.last_result {
                    debug!("Radio already initialized; skipping pipeline");
                    return result.clone();
                }
            }
        }

        self.run().await
    }

    /// User-initiated retry with linear backoff, bounded by the attempt ceiling
    pub async fn retry(&self) -> InitResult {
        let attempts = self.state.lock().await.attempt_count;

        if attempts >= self.config.max_retry_attempts {
            warn!("❌ Retry refused: {} attempts already made", attempts);
            let error = InitError::new(InitErrorCode::TimeoutError, "Maximum retry attempts reached")
                .with_technical_details(format!(
                    "attempt ceiling of {} reached",
                    self.config.max_retry_attempts
                ))
                .with_recovery_steps(recovery_instructions(InitErrorCode::TimeoutError).steps)
                .with_retry_count(attempts)
                .with_diagnostics(self.diagnostics.collect_diagnostic_info().await);
            self.diagnostics
                .log(
                    LogLevel::Warn,
                    "initialization",
                    format!("Retry refused after {} attempts", attempts),
                    Some(serde_json::json!({ "max_retry_attempts": self.config.max_retry_attempts })),
                )
                .await;
            let result = self.failure_result(error, InitStatus::CompletedError, attempts, None);
            self.listeners.dispatch(&result);
            return result;
        }

        self.state.lock().await.status = InitStatus::Retrying;
        let delay = Duration::from_millis(self.config.retry_step_ms.saturating_mul(attempts as u64));
        info!("🔄 Retrying BLE initialization in {:?}", delay);

        let mut teardown = self.teardown.subscribe();
        tokio::select! {
            biased;
            _ = teardown.changed() => return self.cancelled_result(attempts),
            _ = sleep(delay) => {}
        }

        self.initialize().await
    }

    pub async fn get_initialization_status(&self) -> InitStatus {
        self.state.lock().await.status
    }

    pub async fn attempt_count(&self) -> u32 {
        self.state.lock().await.attempt_count
    }

    pub async fn last_result(&self) -> Option<InitResult> {
        self.state.lock().await.last_result.clone()
    }

    /// The radio adapter handle, once constructed
    pub async fn adapter(&self) -> Option<Arc<dyn RadioAdapter>> {
        self.adapter.read().await.clone()
    }

    pub fn on_initialization_complete<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&InitResult) + Send + Sync + 'static,
    {
        self.listeners.register(listener)
    }

    pub fn remove_completion_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Tear down the adapter, cancel pending waits, drop listeners, reset status.
    /// Safe to call any number of times.
    pub async fn destroy(&self) {
        self.teardown.send_modify(|generation| *generation += 1);

        self.monitor.stop_monitoring();
        self.monitor.detach_adapter().await;

        let adapter = self.adapter.write().await.take();
        if let Some(adapter) = adapter {
            adapter.destroy().await;
            info!("🧹 Radio manager destroyed");
        }

        self.listeners.clear();
        *self.state.lock().await = OrchestratorState::default();
    }

    async fn run(&self) -> InitResult {
        let attempt = {
            let mut state = self.state.lock().await;
            state.status = InitStatus::InProgress;
            state.attempt_count += 1;
            state.attempt_count
        };
        info!("🚀 Starting BLE initialization (attempt {})", attempt);
        let started = Instant::now();

        let mut teardown = self.teardown.subscribe();
        let outcome = tokio::select! {
            biased;
            _ = teardown.changed() => return self.cancelled_result(attempt),
            outcome = timeout(self.config.initialization_timeout(), self.pipeline()) => match outcome {
                Ok(outcome) => outcome,
                Err(_) => Err(StepFailure::new(
                    InitErrorCode::TimeoutError,
                    "Bluetooth initialization timed out",
                    format!("pipeline exceeded {}ms", self.config.initialization_timeout_ms),
                )),
            },
        };

        debug!("Initialization attempt {} finished in {:?}", attempt, started.elapsed());
        match outcome {
            Ok(capabilities) => self.complete_success(capabilities, attempt).await,
            Err(failure) => self.complete_failure(failure, attempt).await,
        }
    }

    async fn pipeline(&self) -> Result<Capabilities, StepFailure> {
        self.check_support().await?;
        self.ensure_permissions().await?;
        let adapter = self.ensure_adapter().await?;
        self.validate_power_state(adapter.as_ref()).await?;

        if let Err(failure) = self.scan_smoke_test(adapter.as_ref()).await {
            // A manager that can't scan is rebuilt on the next attempt
            self.release_adapter().await;
            return Err(failure);
        }

        let state = self.monitor.refresh_state().await;
        Ok(Capabilities::from_flags(
            state.is_supported,
            state.has_permissions,
            state.is_enabled,
        ))
    }

    async fn check_support(&self) -> Result<(), StepFailure> {
        match self.probe.is_ble_supported().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(StepFailure::new(
                InitErrorCode::BluetoothNotSupported,
                "Bluetooth Low Energy is not supported on this device",
                "platform reports no BLE support",
            )),
            Err(e) => Err(StepFailure::new(
                InitErrorCode::UnknownError,
                "Could not determine Bluetooth support",
                format!("{:#}", e),
            )),
        }
    }

    async fn ensure_permissions(&self) -> Result<(), StepFailure> {
        if self.gateway.check_permissions().await.granted {
            return Ok(());
        }

        match self.gateway.request_permissions().await {
            Ok(result) if result.success => Ok(()),
            Ok(result) if !result.never_ask_again_permissions.is_empty() => Err(StepFailure::new(
                InitErrorCode::PermissionsNeverAskAgain,
                "Bluetooth permissions are blocked",
                format!("never ask again: {:?}", result.never_ask_again_permissions),
            )),
            Ok(result) => Err(StepFailure::new(
                InitErrorCode::PermissionsDenied,
                "Bluetooth permissions were denied",
                format!("denied: {:?}", result.denied_permissions),
            )),
            Err(e) => Err(StepFailure::new(
                InitErrorCode::PermissionsDenied,
                "Bluetooth permissions could not be requested",
                e.to_string(),
            )),
        }
    }

    async fn ensure_adapter(&self) -> Result<Arc<dyn RadioAdapter>, StepFailure> {
        if let Some(adapter) = self.adapter.read().await.clone() {
            return Ok(adapter);
        }

        let limit = self.config.manager_timeout();
        let adapter = match timeout(limit, self.factory.create()).await {
            Ok(Ok(adapter)) => adapter,
            Ok(Err(e)) => {
                return Err(StepFailure::new(
                    InitErrorCode::BleManagerInitFailed,
                    "Bluetooth manager failed to start",
                    e.to_string(),
                ))
            }
            Err(_) => {
                return Err(StepFailure::new(
                    InitErrorCode::BleManagerInitFailed,
                    "Bluetooth manager took too long to start",
                    AdapterError::ConstructionTimeout {
                        timeout_ms: self.config.manager_timeout_ms,
                    }
                    .to_string(),
                ))
            }
        };

        info!("Radio manager constructed");
        *self.adapter.write().await = Some(adapter.clone());
        self.monitor.attach_adapter(adapter.clone()).await;
        Ok(adapter)
    }

    async fn validate_power_state(&self, adapter: &dyn RadioAdapter) -> Result<(), StepFailure> {
        let mut rechecks = 0;
        loop {
            let power_state = adapter.current_power_state().await.map_err(|e| {
                StepFailure::new(
                    InitErrorCode::BleManagerInitFailed,
                    "Bluetooth manager did not report its state",
                    e.to_string(),
                )
            })?;

            match power_state {
                PowerState::PoweredOn => return Ok(()),
                PowerState::PoweredOff => {
                    return Err(StepFailure::new(
                        InitErrorCode::BluetoothDisabled,
                        "Bluetooth is turned off",
                        "power state PoweredOff",
                    ))
                }
                PowerState::Unauthorized => {
                    return Err(StepFailure::new(
                        InitErrorCode::PermissionsDenied,
                        "Bluetooth access is not authorized",
                        "power state Unauthorized",
                    ))
                }
                PowerState::Unsupported => {
                    return Err(StepFailure::new(
                        InitErrorCode::BluetoothNotSupported,
                        "Bluetooth Low Energy is not supported on this device",
                        "power state Unsupported",
                    ))
                }
                PowerState::Resetting if rechecks < self.config.max_resetting_rechecks => {
                    rechecks += 1;
                    info!(
                        "Radio is resetting; re-checking in {}ms ({}/{})",
                        self.config.resetting_wait_ms, rechecks, self.config.max_resetting_rechecks
                    );
                    sleep(self.config.resetting_wait()).await;
                }
                PowerState::Resetting => {
                    return Err(StepFailure::new(
                        InitErrorCode::TimeoutError,
                        "Bluetooth is still resetting",
                        format!("power state Resetting after {} re-check(s)", rechecks),
                    ))
                }
                PowerState::Unknown => {
                    return Err(StepFailure::new(
                        InitErrorCode::UnknownError,
                        "Bluetooth state is unknown",
                        "power state Unknown",
                    ))
                }
            }
        }
    }

    async fn scan_smoke_test(&self, adapter: &dyn RadioAdapter) -> Result<(), StepFailure> {
        let mut scan = adapter.start_scan(None).await.map_err(|e| {
            StepFailure::new(
                InitErrorCode::BleManagerInitFailed,
                "Bluetooth scanning could not start",
                e.to_string(),
            )
        })?;

        let watch_for_error = async {
            while let Some(item) = scan.next().await {
                if let Err(e) = item {
                    return Some(e);
                }
            }
            None
        };
        let scan_error = timeout(self.config.scan_test_duration(), watch_for_error)
            .await
            .ok()
            .flatten();

        if let Err(e) = adapter.stop_scan().await {
            warn!("⚠️ Failed to stop smoke-test scan: {}", e);
        }

        match scan_error {
            Some(e) => Err(StepFailure::new(
                InitErrorCode::BleManagerInitFailed,
                "Bluetooth scan test failed",
                e.to_string(),
            )),
            None => Ok(()),
        }
    }

    async fn release_adapter(&self) {
        self.monitor.detach_adapter().await;
        let adapter = self.adapter.write().await.take();
        if let Some(adapter) = adapter {
            adapter.destroy().await;
        }
    }

    async fn complete_success(&self, capabilities: Capabilities, attempt: u32) -> InitResult {
        self.diagnostics.log_initialization_attempt(true, None).await;

        let result = InitResult {
            success: true,
            status: InitStatus::CompletedSuccess,
            capabilities,
            error: None,
            error_response: None,
            recommendations: recommendations_for(&capabilities),
            attempt,
            completed_at: Utc::now(),
        };

        {
            let mut state = self.state.lock().await;
            state.status = InitStatus::CompletedSuccess;
            state.attempt_count = 0;
            state.last_result = Some(result.clone());
        }

        info!("✅ BLE initialization completed (attempt {})", attempt);
        self.listeners.dispatch(&result);
        result
    }

    async fn complete_failure(&self, failure: StepFailure, attempt: u32) -> InitResult {
        let error = InitError::new(failure.code, failure.message)
            .with_technical_details(failure.technical)
            .with_recovery_steps(recovery_instructions(failure.code).steps)
            .with_retry_count(attempt.saturating_sub(1));

        self.diagnostics.log_initialization_attempt(false, Some(&error)).await;
        let error = error.with_diagnostics(self.diagnostics.collect_diagnostic_info().await);
        let response = self.classifier.handle_error(&error).await;

        error!("❌ BLE initialization failed: {} ({})", error.message, error.code);

        let result = self.failure_result(error, InitStatus::CompletedError, attempt, Some(response));
        {
            let mut state = self.state.lock().await;
            state.status = InitStatus::CompletedError;
            state.last_result = Some(result.clone());
        }

        self.listeners.dispatch(&result);
        result
    }

    fn failure_result(
        &self,
        error: InitError,
        status: InitStatus,
        attempt: u32,
        error_response: Option<ErrorResponse>,
    ) -> InitResult {
        InitResult {
            success: false,
            status,
            capabilities: Capabilities::default(),
            recommendations: error.recovery_steps.clone(),
            error: Some(error),
            error_response,
            attempt,
            completed_at: Utc::now(),
        }
    }

    fn cancelled_result(&self, attempt: u32) -> InitResult {
        info!("Initialization cancelled by teardown");
        let error = InitError::new(InitErrorCode::UnknownError, "Initialization cancelled")
            .with_technical_details("orchestrator destroyed while initialization was pending");
        self.failure_result(error, InitStatus::NotStarted, attempt, None)
    }
}

impl std::fmt::Debug for InitializationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// One message per unmet capability, or a positive note when all are met
pub fn recommendations_for(capabilities: &Capabilities) -> Vec<String> {
    let mut recommendations = Vec::new();
    if !capabilities.ble_supported {
        recommendations.push("This device does not support Bluetooth Low Energy".to_string());
    }
    if !capabilities.permissions_granted {
        recommendations.push("Grant Bluetooth permissions to scan for your vehicle adapter".to_string());
    }
    if !capabilities.bluetooth_enabled {
        recommendations.push("Turn on Bluetooth to connect to your vehicle".to_string());
    }
    if recommendations.is_empty() {
        recommendations.push("Bluetooth is ready; you can scan for your vehicle adapter".to_string());
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendations_for_ready_radio() {
        let recommendations = recommendations_for(&Capabilities::from_flags(true, true, true));
        assert_eq!(recommendations.len(), 1);
        assert!(recommendations[0].contains("ready"));
    }

    #[test]
    fn test_recommendations_per_unmet_capability() {
        let recommendations = recommendations_for(&Capabilities::from_flags(true, false, false));
        assert_eq!(recommendations.len(), 2);
    }

    #[test]
    fn test_status_terminality() {
        assert!(InitStatus::CompletedSuccess.is_terminal());
        assert!(InitStatus::CompletedError.is_terminal());
        assert!(!InitStatus::Retrying.is_terminal());
        assert_eq!(InitStatus::default(), InitStatus::NotStarted);
    }
}
