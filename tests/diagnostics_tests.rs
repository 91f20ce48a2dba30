mod common;

use common::{CountingLauncher, FakeAdapter, FakeFactory, FakePermissions, FakeProbe, Harness};
use std::sync::Arc;
use serial_test::serial;
use vehicle_link_radio_lib::log::{init_tracing, is_radio_debug_enabled, set_radio_debug};
use vehicle_link_radio_lib::{
    Collaborators, DiagnosticExport, InitErrorCode, LogLevel, Platform, PowerState, RadioSubsystem,
    SubsystemConfig,
};

/// Diagnostics recording, reports and export through a wired subsystem
#[cfg(test)]
mod diagnostics_tests {
    use super::*;

    #[tokio::test]
    async fn test_report_after_failed_then_successful_attempt() {
        let harness = Harness::ios(FakeAdapter::new(&[PowerState::PoweredOff]));
        let orchestrator = harness.subsystem.orchestrator();

        orchestrator.initialize().await;
        harness.adapter.emit(PowerState::PoweredOn);
        orchestrator.retry().await;

        let report = harness.subsystem.diagnostics().generate_diagnostic_report().await;

        assert_eq!(report.summary.initialization_attempts, 2);
        assert_eq!(report.summary.successful_initializations, 1);
        assert_eq!(report.summary.failed_initializations, 1);
        assert!((report.summary.success_rate - 50.0).abs() < f64::EPSILON);
        assert_eq!(report.errors_by_code.get(&InitErrorCode::BluetoothDisabled), Some(&1));
        assert!(report.info.last_success_time.is_some());
        assert!(report.recent_logs.len() <= 50);
        assert!(!report.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_export_is_parseable_json() {
        let harness = Harness::ios(FakeAdapter::powered_on());
        harness.subsystem.orchestrator().initialize().await;

        let json = harness
            .subsystem
            .diagnostics()
            .export_diagnostic_data()
            .await
            .expect("export serializes");
        let export: DiagnosticExport = serde_json::from_str(&json).expect("export parses");

        assert_eq!(export.app_version, "2.3.0");
        assert_eq!(export.device_class, "mobile");
        assert_eq!(export.report.summary.successful_initializations, 1);
    }

    #[tokio::test]
    async fn test_clear_history_resets_counters() {
        let harness = Harness::ios(FakeAdapter::new(&[PowerState::PoweredOff]));
        harness.subsystem.orchestrator().initialize().await;
        let diagnostics = harness.subsystem.diagnostics();

        diagnostics.clear_diagnostic_history().await;

        let info = diagnostics.collect_diagnostic_info().await;
        assert_eq!(info.initialization_attempts, 0);
        assert!(info.last_error.is_none());
        assert!(diagnostics.get_recent_logs(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_recent_logs_are_newest_last() {
        let harness = Harness::ios(FakeAdapter::powered_on());
        let diagnostics = harness.subsystem.diagnostics();

        for i in 0..5 {
            diagnostics
                .log(LogLevel::Info, "test", format!("entry {}", i), None)
                .await;
        }

        let logs = diagnostics.get_recent_logs(2).await;
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].message, "entry 3");
        assert_eq!(logs[1].message, "entry 4");
    }

    #[tokio::test]
    async fn test_config_from_json_overrides_and_validates() {
        let config = SubsystemConfig::from_json_str(
            r#"{ "monitor": { "stability_threshold_ms": 500 }, "init": { "max_retry_attempts": 5 } }"#,
        )
        .expect("partial config parses");
        assert_eq!(config.monitor.stability_threshold_ms, 500);
        assert_eq!(config.monitor.stability_check_interval_ms, 1000);
        assert_eq!(config.init.max_retry_attempts, 5);

        assert!(SubsystemConfig::from_json_str(r#"{ "init": { "manager_timeout_ms": 0 } }"#).is_err());
        assert!(SubsystemConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_subsystem_rejects_invalid_config() {
        let mut config = SubsystemConfig::default();
        config.monitor.stability_check_interval_ms = 0;

        let result = RadioSubsystem::new(
            config,
            Collaborators {
                permission_provider: FakePermissions::new(),
                adapter_factory: FakeFactory::new(FakeAdapter::powered_on()),
                settings_launcher: Arc::new(CountingLauncher::default()),
                platform_probe: FakeProbe::new(Platform::Android, Some(33)),
            },
        );

        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_radio_debug_switch() {
        set_radio_debug(true);
        assert!(is_radio_debug_enabled());
        vehicle_link_radio_lib::radio_debug!("debug line {}", 1);

        set_radio_debug(false);
        assert!(!is_radio_debug_enabled());
    }

    #[test]
    #[serial]
    fn test_tracing_init_is_idempotent() {
        init_tracing("vehicle_link_radio_lib=debug");
        assert!(!init_tracing("info"));
    }
}
