// Shared fakes for the radio integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::broadcast;

use vehicle_link_radio_lib::{
    AdapterError, Collaborators, DiscoveredDevice, Permission, PermissionProvider, PermissionRationale,
    PermissionResult, Platform, PlatformInfo, PlatformProbe, PowerState, PowerStateStream,
    ProviderError, RadioAdapter, RadioAdapterFactory, RadioSubsystem, ScanFilter, ScanStream,
    SettingsLauncher, SubsystemConfig,
};

/// Radio adapter driven by a scripted power-state sequence; the last entry repeats
pub struct FakeAdapter {
    power_states: Mutex<VecDeque<PowerState>>,
    power_error: AtomicBool,
    scan_error: Mutex<Option<String>>,
    changes: broadcast::Sender<PowerState>,
    pub power_queries: AtomicUsize,
    pub scans_started: AtomicUsize,
    pub scans_stopped: AtomicUsize,
    pub destroyed: AtomicUsize,
}

impl FakeAdapter {
    pub fn new(sequence: &[PowerState]) -> Arc<Self> {
        let (changes, _) = broadcast::channel(64);
        Arc::new(Self {
            power_states: Mutex::new(sequence.iter().copied().collect()),
            power_error: AtomicBool::new(false),
            scan_error: Mutex::new(None),
            changes,
            power_queries: AtomicUsize::new(0),
            scans_started: AtomicUsize::new(0),
            scans_stopped: AtomicUsize::new(0),
            destroyed: AtomicUsize::new(0),
        })
    }

    pub fn powered_on() -> Arc<Self> {
        Self::new(&[PowerState::PoweredOn])
    }

    /// Change the reported state and notify subscribers
    pub fn emit(&self, state: PowerState) {
        *self.power_states.lock().unwrap() = VecDeque::from(vec![state]);
        let _ = self.changes.send(state);
    }

    pub fn fail_power_queries(&self) {
        self.power_error.store(true, Ordering::SeqCst);
    }

    pub fn fail_scans(&self, message: &str) {
        *self.scan_error.lock().unwrap() = Some(message.to_string());
    }

    fn peek(&self) -> PowerState {
        self.power_states
            .lock()
            .unwrap()
            .front()
            .copied()
            .unwrap_or(PowerState::Unknown)
    }
}

#[async_trait]
impl RadioAdapter for FakeAdapter {
    async fn current_power_state(&self) -> Result<PowerState, AdapterError> {
        self.power_queries.fetch_add(1, Ordering::SeqCst);
        if self.power_error.load(Ordering::SeqCst) {
            return Err(AdapterError::Other("state query rejected".to_string()));
        }
        let mut states = self.power_states.lock().unwrap();
        let state = if states.len() > 1 {
            states.pop_front()
        } else {
            states.front().copied()
        };
        Ok(state.unwrap_or(PowerState::Unknown))
    }

    fn subscribe_state_changes(&self, emit_current: bool) -> PowerStateStream {
        let receiver = self.changes.subscribe();
        let changes = stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(state) => return Some((state, receiver)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        if emit_current {
            let current = self.peek();
            stream::once(async move { current }).chain(changes).boxed()
        } else {
            changes.boxed()
        }
    }

    async fn start_scan(&self, _filter: Option<ScanFilter>) -> Result<ScanStream, AdapterError> {
        self.scans_started.fetch_add(1, Ordering::SeqCst);
        match self.scan_error.lock().unwrap().clone() {
            Some(message) => Ok(stream::iter(vec![Err(AdapterError::Scan(message))]).boxed()),
            None => Ok(stream::iter(vec![Ok(DiscoveredDevice {
                id: "AA:BB:CC:DD:EE:FF".to_string(),
                name: Some("OBDII".to_string()),
                rssi: Some(-60),
            })])
            .chain(stream::pending())
            .boxed()),
        }
    }

    async fn stop_scan(&self) -> Result<(), AdapterError> {
        self.scans_stopped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy(&self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out one shared FakeAdapter
pub struct FakeFactory {
    adapter: Arc<FakeAdapter>,
    failure: Mutex<Option<String>>,
    delay: Mutex<Option<Duration>>,
    pub created: AtomicUsize,
}

impl FakeFactory {
    pub fn new(adapter: Arc<FakeAdapter>) -> Arc<Self> {
        Arc::new(Self {
            adapter,
            failure: Mutex::new(None),
            delay: Mutex::new(None),
            created: AtomicUsize::new(0),
        })
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn delay_by(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl RadioAdapterFactory for FakeFactory {
    async fn create(&self) -> Result<Arc<dyn RadioAdapter>, AdapterError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(AdapterError::Construction(message));
        }
        Ok(self.adapter.clone())
    }
}

/// OS permission store with scripted request outcomes
pub struct FakePermissions {
    granted: Mutex<HashSet<Permission>>,
    outcomes: Mutex<HashMap<Permission, PermissionResult>>,
    accept_rationale: AtomicBool,
    pub checks: AtomicUsize,
    pub requests: AtomicUsize,
    pub rationales_shown: AtomicUsize,
}

impl FakePermissions {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            granted: Mutex::new(HashSet::new()),
            outcomes: Mutex::new(HashMap::new()),
            accept_rationale: AtomicBool::new(true),
            checks: AtomicUsize::new(0),
            requests: AtomicUsize::new(0),
            rationales_shown: AtomicUsize::new(0),
        })
    }

    pub fn grant(&self, permission: Permission) {
        self.granted.lock().unwrap().insert(permission);
    }

    /// What the OS answers when `permission` is requested
    pub fn answer(&self, permission: Permission, result: PermissionResult) {
        self.outcomes.lock().unwrap().insert(permission, result);
    }

    pub fn answer_all(&self, permissions: &[Permission], result: PermissionResult) {
        for &permission in permissions {
            self.answer(permission, result);
        }
    }

    pub fn decline_rationale(&self) {
        self.accept_rationale.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl PermissionProvider for FakePermissions {
    async fn check_permission(&self, permission: Permission) -> Result<bool, ProviderError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.granted.lock().unwrap().contains(&permission))
    }

    async fn request_permissions(
        &self,
        permissions: &[Permission],
    ) -> Result<HashMap<Permission, PermissionResult>, ProviderError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let outcomes = self.outcomes.lock().unwrap().clone();
        let mut results = HashMap::new();
        for &permission in permissions {
            let result = outcomes.get(&permission).copied().unwrap_or(PermissionResult::Denied);
            if result == PermissionResult::Granted {
                self.granted.lock().unwrap().insert(permission);
            }
            results.insert(permission, result);
        }
        Ok(results)
    }

    async fn show_rationale(&self, _rationale: &PermissionRationale) -> bool {
        self.rationales_shown.fetch_add(1, Ordering::SeqCst);
        self.accept_rationale.load(Ordering::SeqCst)
    }
}

/// Settings launcher that only counts
#[derive(Default)]
pub struct CountingLauncher {
    pub bluetooth_opened: AtomicUsize,
    pub app_opened: AtomicUsize,
}

#[async_trait]
impl SettingsLauncher for CountingLauncher {
    async fn open_bluetooth_settings(&self) -> anyhow::Result<()> {
        self.bluetooth_opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn open_app_settings(&self) -> anyhow::Result<()> {
        self.app_opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeProbe {
    info: PlatformInfo,
    supported: AtomicBool,
    fail_support_check: AtomicBool,
    support_delay: Mutex<Option<Duration>>,
    pub support_checks: AtomicUsize,
}

impl FakeProbe {
    pub fn new(platform: Platform, api_level: Option<u32>) -> Arc<Self> {
        Arc::new(Self {
            info: platform_info(platform, api_level),
            supported: AtomicBool::new(true),
            fail_support_check: AtomicBool::new(false),
            support_delay: Mutex::new(None),
            support_checks: AtomicUsize::new(0),
        })
    }

    pub fn set_supported(&self, supported: bool) {
        self.supported.store(supported, Ordering::SeqCst);
    }

    pub fn fail_support_check(&self) {
        self.fail_support_check.store(true, Ordering::SeqCst);
    }

    /// Hold every support check for `delay`
    pub fn delay_support_check(&self, delay: Duration) {
        *self.support_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl PlatformProbe for FakeProbe {
    fn info(&self) -> PlatformInfo {
        self.info.clone()
    }

    async fn is_ble_supported(&self) -> anyhow::Result<bool> {
        self.support_checks.fetch_add(1, Ordering::SeqCst);
        let delay = *self.support_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_support_check.load(Ordering::SeqCst) {
            anyhow::bail!("bluetooth service unreachable");
        }
        Ok(self.supported.load(Ordering::SeqCst))
    }

    async fn power_state(&self) -> anyhow::Result<PowerState> {
        Ok(PowerState::Unknown)
    }
}

pub fn platform_info(platform: Platform, api_level: Option<u32>) -> PlatformInfo {
    PlatformInfo {
        platform,
        os_version: "14".to_string(),
        api_level,
        device_model: "Test Device".to_string(),
        app_version: "2.3.0".to_string(),
        library_version: "0.1.0".to_string(),
    }
}

/// Config with short timings so unpaused tests stay fast
pub fn fast_config() -> SubsystemConfig {
    let mut config = SubsystemConfig::default();
    config.init.scan_test_duration_ms = 20;
    config.init.resetting_wait_ms = 50;
    config.init.retry_step_ms = 10;
    config.init.manager_timeout_ms = 500;
    config.retry.jitter_enabled = false;
    config.monitor.stability_check_interval_ms = 50;
    config.monitor.stability_threshold_ms = 200;
    config
}

/// A subsystem wired to fakes, with handles kept for scripting and assertions
pub struct Harness {
    pub subsystem: RadioSubsystem,
    pub adapter: Arc<FakeAdapter>,
    pub factory: Arc<FakeFactory>,
    pub permissions: Arc<FakePermissions>,
    pub launcher: Arc<CountingLauncher>,
    pub probe: Arc<FakeProbe>,
}

impl Harness {
    pub fn new(platform: Platform, api_level: Option<u32>, adapter: Arc<FakeAdapter>) -> Self {
        Self::with_config(platform, api_level, adapter, fast_config())
    }

    pub fn with_config(
        platform: Platform,
        api_level: Option<u32>,
        adapter: Arc<FakeAdapter>,
        config: SubsystemConfig,
    ) -> Self {
        let factory = FakeFactory::new(adapter.clone());
        let permissions = FakePermissions::new();
        let launcher = Arc::new(CountingLauncher::default());
        let probe = FakeProbe::new(platform, api_level);

        let subsystem = RadioSubsystem::new(
            config,
            Collaborators {
                permission_provider: permissions.clone(),
                adapter_factory: factory.clone(),
                settings_launcher: launcher.clone(),
                platform_probe: probe.clone(),
            },
        )
        .expect("test config is valid");

        Self {
            subsystem,
            adapter,
            factory,
            permissions,
            launcher,
            probe,
        }
    }

    /// iOS host: permissions are implicit
    pub fn ios(adapter: Arc<FakeAdapter>) -> Self {
        Self::new(Platform::Ios, None, adapter)
    }
}

pub const ANDROID_12_PERMISSIONS: [Permission; 3] = [
    Permission::BluetoothScan,
    Permission::BluetoothConnect,
    Permission::AccessFineLocation,
];
