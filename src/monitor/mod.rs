use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};

use anyhow::{Context, Result};
use chrono::Utc;
use futures::StreamExt;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::diagnostics::{RadioDiagnostics, RingBuffer};
use crate::listeners::{ListenerId, ListenerSet};
use crate::permissions::PermissionGateway;
use crate::platform::{PlatformProbe, RadioAdapter};
use crate::radio_debug;
use crate::types::{PowerState, StateChangeEvent, SystemState};

pub mod validation;

pub use validation::{IssueKind, ValidationIssue, ValidationResult};

/// Radio state monitoring service
///
/// While monitoring:
/// - Follows the adapter's power-state subscription
/// - Debounces flapping into an `is_stable` flag on a periodic timer
/// - Records every transition and broadcasts it to registered listeners
pub struct StateMonitor {
    inner: Arc<MonitorInner>,
    ticker_task: std::sync::Mutex<Option<JoinHandle<()>>>,
    subscription_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

struct TrackedState {
    current: SystemState,
    last_change: Instant,
}

struct MonitorInner {
    config: MonitorConfig,
    gateway: Arc<PermissionGateway>,
    probe: Arc<dyn PlatformProbe>,
    diagnostics: Arc<RadioDiagnostics>,
    adapter: RwLock<Option<Arc<dyn RadioAdapter>>>,
    state: Mutex<TrackedState>,
    history: Mutex<RingBuffer<StateChangeEvent>>,
    listeners: ListenerSet<StateChangeEvent>,
    is_monitoring: AtomicBool,
}

impl StateMonitor {
    pub fn new(
        config: MonitorConfig,
        gateway: Arc<PermissionGateway>,
        probe: Arc<dyn PlatformProbe>,
        diagnostics: Arc<RadioDiagnostics>,
    ) -> Self {
        let history = Mutex::new(RingBuffer::new(config.max_history));
        Self {
            inner: Arc::new(MonitorInner {
                config,
                gateway,
                probe,
                diagnostics,
                adapter: RwLock::new(None),
                state: Mutex::new(TrackedState {
                    current: SystemState::unknown(),
                    last_change: Instant::now(),
                }),
                history,
                listeners: ListenerSet::new("state change"),
                is_monitoring: AtomicBool::new(false),
            }),
            ticker_task: std::sync::Mutex::new(None),
            subscription_task: std::sync::Mutex::new(None),
        }
    }

    /// Hand the monitor the adapter owned by the orchestrator
    pub async fn attach_adapter(&self, adapter: Arc<dyn RadioAdapter>) {
        *self.inner.adapter.write().await = Some(adapter);
        if self.is_monitoring() {
            self.subscribe().await;
        }
    }

    pub async fn detach_adapter(&self) {
        abort_task(&self.subscription_task);
        *self.inner.adapter.write().await = None;
    }

    pub async fn has_adapter(&self) -> bool {
        self.inner.adapter.read().await.is_some()
    }

    pub async fn get_current_state(&self) -> SystemState {
        self.inner.state.lock().await.current.clone()
    }

    /// Re-read support, permission and power flags; failures keep the last known state
    pub async fn refresh_state(&self) -> SystemState {
        match self.inner.try_refresh("refresh").await {
            Ok(state) => state,
            Err(e) => {
                warn!("⚠️ State refresh failed: {:#}", e);
                self.get_current_state().await
            }
        }
    }

    /// Start monitoring. Calling it while already monitoring is a no-op.
    pub async fn start_monitoring(&self) {
        if self.inner.is_monitoring.swap(true, Ordering::SeqCst) {
            debug!("State monitor already running");
            return;
        }

        info!("🔍 Starting radio state monitoring");
        self.refresh_state().await;
        if !self.is_monitoring() {
            debug!("Monitoring stopped during the initial refresh");
            return;
        }
        self.subscribe().await;

        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval(inner.config.stability_check_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                inner.check_stability().await;
            }
        });
        replace_task(&self.ticker_task, handle);

        // A stop that landed while we were subscribing has already run its aborts
        if !self.is_monitoring() {
            abort_task(&self.ticker_task);
            abort_task(&self.subscription_task);
            debug!("Monitoring stopped while starting; timers cancelled");
            return;
        }

        info!("✅ Radio state monitoring started");
    }

    /// Stop monitoring and cancel the timer and subscription. Safe to call repeatedly.
    pub fn stop_monitoring(&self) {
        let was_running = self.inner.is_monitoring.swap(false, Ordering::SeqCst);
        abort_task(&self.ticker_task);
        abort_task(&self.subscription_task);
        if was_running {
            info!("🛑 Radio state monitoring stopped");
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.inner.is_monitoring.load(Ordering::SeqCst)
    }

    /// Register a state change listener
    pub fn on_state_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&StateChangeEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.register(listener)
    }

    pub fn remove_state_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Refresh, then check support, permissions, power, stability and the adapter handle
    pub async fn validate_state(&self) -> ValidationResult {
        let state = match self.inner.try_refresh("validation").await {
            Ok(state) => state,
            Err(e) => {
                warn!("❌ State validation could not read the radio: {:#}", e);
                return validation::check_failed(&format!("{:#}", e));
            }
        };

        let adapter_present = self.has_adapter().await;
        let result = ValidationResult::from_issues(validation::evaluate(&state, adapter_present));
        if result.is_valid {
            debug!("Radio state valid");
        } else {
            debug!("Radio state invalid: {} issue(s)", result.issues.len());
        }
        result
    }

    pub async fn get_state_history(&self) -> Vec<StateChangeEvent> {
        self.inner.history.lock().await.to_vec()
    }

    pub async fn clear_state_history(&self) {
        self.inner.history.lock().await.clear();
    }

    async fn subscribe(&self) {
        let adapter = match self.inner.adapter.read().await.clone() {
            Some(adapter) => adapter,
            None => {
                debug!("No adapter attached; power state comes from refreshes only");
                return;
            }
        };

        let mut changes = adapter.subscribe_state_changes(true);
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            while let Some(power_state) = changes.next().await {
                inner.apply_power_state(power_state, "adapter_state_change").await;
            }
            debug!("Adapter state subscription ended");
        });
        replace_task(&self.subscription_task, handle);
    }
}

impl Drop for StateMonitor {
    fn drop(&mut self) {
        abort_task(&self.ticker_task);
        abort_task(&self.subscription_task);
    }
}

impl std::fmt::Debug for StateMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMonitor")
            .field("config", &self.inner.config)
            .field("is_monitoring", &self.is_monitoring())
            .finish()
    }
}

impl MonitorInner {
    async fn try_refresh(&self, trigger: &str) -> Result<SystemState> {
        let is_supported = self
            .probe
            .is_ble_supported()
            .await
            .context("BLE support check failed")?;
        let has_permissions = self.gateway.check_permissions().await.granted;

        let adapter = self.adapter.read().await.clone();
        let power_state = match adapter {
            Some(adapter) => adapter
                .current_power_state()
                .await
                .context("Adapter power state query failed")?,
            None => self.probe.power_state().await.unwrap_or_else(|e| {
                radio_debug!("Platform power query failed: {}", e);
                PowerState::Unknown
            }),
        };

        Ok(self.observe(is_supported, has_permissions, power_state, trigger).await)
    }

    async fn apply_power_state(&self, power_state: PowerState, trigger: &str) {
        let (is_supported, has_permissions) = {
            let state = self.state.lock().await;
            (state.current.is_supported, state.current.has_permissions)
        };
        self.observe(is_supported, has_permissions, power_state, trigger).await;
    }

    /// Fold an observation into the tracked state, recording a change if anything moved
    async fn observe(
        &self,
        is_supported: bool,
        has_permissions: bool,
        power_state: PowerState,
        trigger: &str,
    ) -> SystemState {
        let event = {
            let mut tracked = self.state.lock().await;
            let previous = tracked.current.clone();
            let mut next = SystemState {
                is_enabled: power_state.is_powered_on(),
                is_supported,
                has_permissions,
                power_state,
                last_checked: Utc::now(),
                is_stable: previous.is_stable,
            };

            if !next.differs_from(&previous) {
                tracked.current = next.clone();
                return next;
            }

            next.is_stable = false;
            tracked.last_change = Instant::now();
            tracked.current = next.clone();
            StateChangeEvent {
                timestamp: next.last_checked,
                previous_state: previous,
                new_state: next,
                trigger: trigger.to_string(),
                is_stability_change: false,
            }
        };

        info!(
            "Radio state changed: {} -> {} ({})",
            event.previous_state.power_state, event.new_state.power_state, trigger
        );
        let state = event.new_state.clone();
        self.publish(event).await;
        state
    }

    async fn check_stability(&self) {
        let event = {
            let mut tracked = self.state.lock().await;
            if tracked.current.is_stable {
                return;
            }
            let elapsed = tracked.last_change.elapsed();
            radio_debug!("Stability check: {:?} since last change", elapsed);
            if elapsed < self.config.stability_threshold() {
                return;
            }

            let previous = tracked.current.clone();
            tracked.current.is_stable = true;
            StateChangeEvent {
                timestamp: Utc::now(),
                previous_state: previous,
                new_state: tracked.current.clone(),
                trigger: "stability_timer".to_string(),
                is_stability_change: true,
            }
        };

        debug!("Radio state stable ({})", event.new_state.power_state);
        self.publish(event).await;
    }

    async fn publish(&self, event: StateChangeEvent) {
        self.history.lock().await.push(event.clone());
        self.diagnostics.add_state_change(event.clone()).await;
        self.listeners.dispatch(&event);
    }
}

fn abort_task(slot: &std::sync::Mutex<Option<JoinHandle<()>>>) {
    if let Some(handle) = slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
        handle.abort();
    }
}

fn replace_task(slot: &std::sync::Mutex<Option<JoinHandle<()>>>, handle: JoinHandle<()>) {
    if let Some(previous) = slot.lock().unwrap_or_else(PoisonError::into_inner).replace(handle) {
        previous.abort();
    }
}
