mod common;

use common::{FakeAdapter, Harness};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use vehicle_link_radio_lib::{IssueKind, PowerState, Severity, StateChangeEvent};

/// State monitoring, stability debounce and validation
#[cfg(test)]
mod state_monitor_tests {
    use super::*;

    fn recorder(harness: &Harness) -> Arc<Mutex<Vec<StateChangeEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        harness.subsystem.monitor().on_state_change(move |event| {
            sink.lock().unwrap().push(event.clone());
        });
        events
    }

    async fn attached(adapter: Arc<FakeAdapter>) -> Harness {
        let harness = Harness::ios(adapter.clone());
        harness.subsystem.monitor().attach_adapter(adapter).await;
        harness
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_becomes_stable_after_threshold() {
        // Threshold 200ms, checked every 50ms
        let harness = attached(FakeAdapter::powered_on()).await;
        let monitor = harness.subsystem.monitor();

        monitor.start_monitoring().await;
        assert!(monitor.is_monitoring());
        let state = monitor.get_current_state().await;
        assert_eq!(state.power_state, PowerState::PoweredOn);
        assert!(!state.is_stable);

        sleep(Duration::from_millis(150)).await;
        assert!(!monitor.get_current_state().await.is_stable);

        sleep(Duration::from_millis(200)).await;
        assert!(monitor.get_current_state().await.is_stable);

        monitor.stop_monitoring();
    }

    #[tokio::test(start_paused = true)]
    async fn test_adapter_change_resets_stability() {
        let harness = attached(FakeAdapter::powered_on()).await;
        let monitor = harness.subsystem.monitor();
        let events = recorder(&harness);

        monitor.start_monitoring().await;
        sleep(Duration::from_millis(400)).await;
        assert!(monitor.get_current_state().await.is_stable);

        harness.adapter.emit(PowerState::PoweredOff);
        sleep(Duration::from_millis(1)).await;

        let state = monitor.get_current_state().await;
        assert_eq!(state.power_state, PowerState::PoweredOff);
        assert!(!state.is_enabled);
        assert!(!state.is_stable);

        let events = events.lock().unwrap().clone();
        let last = events.last().expect("change delivered");
        assert_eq!(last.trigger, "adapter_state_change");
        assert_eq!(last.previous_state.power_state, PowerState::PoweredOn);
        assert!(!last.is_stability_change);
        assert!(events.iter().any(|e| e.is_stability_change && e.new_state.is_stable));

        monitor.stop_monitoring();
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_records_changes() {
        let harness = attached(FakeAdapter::powered_on()).await;
        let monitor = harness.subsystem.monitor();

        monitor.start_monitoring().await;
        harness.adapter.emit(PowerState::Resetting);
        sleep(Duration::from_millis(1)).await;
        harness.adapter.emit(PowerState::PoweredOn);
        sleep(Duration::from_millis(1)).await;

        let history = monitor.get_state_history().await;
        let powers: Vec<PowerState> = history
            .iter()
            .filter(|e| !e.is_stability_change)
            .map(|e| e.new_state.power_state)
            .collect();
        assert_eq!(
            powers,
            vec![PowerState::PoweredOn, PowerState::Resetting, PowerState::PoweredOn]
        );

        // Mirrored into diagnostics
        assert_eq!(
            harness.subsystem.diagnostics().get_state_history().await.len(),
            history.len()
        );

        monitor.clear_state_history().await;
        assert!(monitor.get_state_history().await.is_empty());
        monitor.stop_monitoring();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_timers_and_subscription() {
        let harness = attached(FakeAdapter::powered_on()).await;
        let monitor = harness.subsystem.monitor();
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = delivered.clone();
        monitor.on_state_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        monitor.start_monitoring().await;
        monitor.stop_monitoring();
        monitor.stop_monitoring();
        assert!(!monitor.is_monitoring());

        let before = delivered.load(Ordering::SeqCst);
        harness.adapter.emit(PowerState::PoweredOff);
        sleep(Duration::from_secs(5)).await;

        assert_eq!(delivered.load(Ordering::SeqCst), before);
        assert!(!monitor.get_current_state().await.is_stable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_start_leaves_no_timers() {
        let harness = attached(FakeAdapter::powered_on()).await;
        harness.probe.delay_support_check(Duration::from_millis(100));
        let monitor = harness.subsystem.monitor().clone();

        let starting = {
            let monitor = monitor.clone();
            tokio::spawn(async move { monitor.start_monitoring().await })
        };
        sleep(Duration::from_millis(10)).await;
        monitor.stop_monitoring();
        starting.await.expect("start task should not panic");

        assert!(!monitor.is_monitoring());
        sleep(Duration::from_secs(1)).await;
        assert!(!monitor.get_current_state().await.is_stable);

        harness.adapter.emit(PowerState::PoweredOff);
        sleep(Duration::from_millis(10)).await;
        assert_eq!(monitor.get_current_state().await.power_state, PowerState::PoweredOn);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let harness = attached(FakeAdapter::powered_on()).await;
        let monitor = harness.subsystem.monitor();
        let events = recorder(&harness);

        monitor.start_monitoring().await;
        monitor.start_monitoring().await;
        harness.adapter.emit(PowerState::PoweredOff);
        sleep(Duration::from_millis(1)).await;

        let changes = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.new_state.power_state == PowerState::PoweredOff)
            .count();
        assert_eq!(changes, 1, "one subscription delivers each change once");
        monitor.stop_monitoring();
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_listener_does_not_block_others() {
        let harness = attached(FakeAdapter::powered_on()).await;
        let monitor = harness.subsystem.monitor();
        monitor.on_state_change(|_| panic!("observer failure"));
        let events = recorder(&harness);

        monitor.start_monitoring().await;
        harness.adapter.emit(PowerState::PoweredOff);
        sleep(Duration::from_millis(1)).await;

        assert!(events.lock().unwrap().len() >= 2);
        monitor.stop_monitoring();
    }

    #[tokio::test]
    async fn test_removed_state_listener_is_not_called() {
        let harness = Harness::ios(FakeAdapter::powered_on());
        let monitor = harness.subsystem.monitor();
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = delivered.clone();
        let id = monitor.on_state_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(monitor.remove_state_listener(id));
        assert!(!monitor.remove_state_listener(id));
        monitor.refresh_state().await;

        assert_eq!(delivered.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_validation_flags_unsupported_device_as_critical() {
        let harness = Harness::ios(FakeAdapter::powered_on());
        harness.probe.set_supported(false);

        let result = harness.subsystem.monitor().validate_state().await;

        assert!(!result.is_valid);
        let issue = result
            .issues
            .iter()
            .find(|i| i.kind == IssueKind::NotSupported)
            .expect("unsupported issue present");
        assert_eq!(issue.severity, Severity::Critical);
        assert!(!issue.recoverable);
        assert_eq!(result.recommendations.len(), result.issues.len());
    }

    #[tokio::test]
    async fn test_validation_without_adapter() {
        let harness = Harness::ios(FakeAdapter::powered_on());

        let result = harness.subsystem.monitor().validate_state().await;

        assert!(!result.is_valid);
        assert!(result.has_issue(IssueKind::AdapterMissing));
        // No adapter: power comes from the probe, which reports Unknown
        assert!(result.has_issue(IssueKind::RadioDisabled));
    }

    #[tokio::test]
    async fn test_validation_reports_failed_checks() {
        let harness = Harness::ios(FakeAdapter::powered_on());
        harness.probe.fail_support_check();

        let result = harness.subsystem.monitor().validate_state().await;

        assert!(!result.is_valid);
        assert_eq!(result.issues.len(), 1);
        assert!(result.has_issue(IssueKind::CheckFailed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_after_initialization_and_settling() {
        let harness = Harness::ios(FakeAdapter::powered_on());
        assert!(harness.subsystem.orchestrator().initialize().await.success);
        let monitor = harness.subsystem.monitor();

        monitor.start_monitoring().await;
        sleep(Duration::from_millis(400)).await;
        let result = monitor.validate_state().await;

        assert!(result.is_valid, "unexpected issues: {:?}", result.issues);
        monitor.stop_monitoring();
    }
}
