// tests/health_monitoring_integration_test.rs
//
// Full-system behavior of the health monitoring facade: check flow,
// history, alert lifecycle, scheduling, retention.

mod common;

use common::{test_environment, DenyAllGuard, MockProbe, MockSampler, RecordingTransport};
use envpulse::{
    AlertSeverity, ErrorKind, EscalationAction, EscalationRule, HealthMonitoringSystem,
    HealthState, IssueCategory, MonitoringConfig, NotificationTarget, ProductionSafetyGuard,
    ReadOnlyGuard, Timeframe, TrendDirection, TrendMetric,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

type SentLog = Arc<RwLock<Vec<(NotificationTarget, envpulse::AlertNotification)>>>;

fn build_system(
    probe: MockProbe,
    sampler: MockSampler,
    config: MonitoringConfig,
) -> (Arc<HealthMonitoringSystem>, SentLog) {
    build_system_with_guard(probe, sampler, config, Arc::new(ReadOnlyGuard))
}

fn build_system_with_guard(
    probe: MockProbe,
    sampler: MockSampler,
    config: MonitoringConfig,
    guard: Arc<dyn ProductionSafetyGuard>,
) -> (Arc<HealthMonitoringSystem>, SentLog) {
    let (transport, sent) = RecordingTransport::new();
    let system = HealthMonitoringSystem::new(
        config,
        Arc::new(probe),
        Arc::new(sampler),
        guard,
        transport,
    )
    .unwrap();
    (Arc::new(system), sent)
}

#[tokio::test]
async fn healthy_check_produces_complete_report() {
    let (system, _) = build_system(
        MockProbe::healthy(),
        MockSampler::healthy(),
        MonitoringConfig::default(),
    );
    let env = test_environment("env-1");

    let report = system.perform_health_check(&env).await.unwrap();
    assert_eq!(report.environment_id, "env-1");
    assert_eq!(report.health_status.status, HealthState::Healthy);
    assert!(report.health_status.score >= 90);
    assert!(report.health_status.issues.is_empty());
    assert!(report.validation_result.is_valid);
    assert_eq!(report.trends.len(), 4);
    assert!(report.alerts.is_empty());
    assert_eq!(system.get_health_history("env-1", None).await.len(), 1);
}

#[tokio::test]
async fn history_grows_once_per_check_and_windows_nest() {
    let (system, _) = build_system(
        MockProbe::healthy(),
        MockSampler::healthy(),
        MonitoringConfig::default(),
    );
    let env = test_environment("env-1");

    for expected_len in 1..=3 {
        system.perform_health_check(&env).await.unwrap();
        assert_eq!(
            system.get_health_history("env-1", None).await.len(),
            expected_len
        );
    }

    let hour = system
        .get_health_history("env-1", Some(Timeframe::LastHour))
        .await;
    let day = system
        .get_health_history("env-1", Some(Timeframe::LastDay))
        .await;
    let all = system.get_health_history("env-1", None).await;
    assert!(hour.len() <= day.len());
    assert!(day.len() <= all.len());
    assert_eq!(all.len(), 3);

    // Report timestamps are strictly increasing per environment.
    for pair in all.windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
    }

    // Uptime counts successful checks.
    assert_eq!(all.last().unwrap().health_status.uptime, 3);
}

#[tokio::test]
async fn failed_connectivity_yields_critical_report_and_alert() {
    let (system, _) = build_system(
        MockProbe::disconnected("Connection refused"),
        MockSampler::healthy(),
        MonitoringConfig::default(),
    );
    let env = test_environment("env-1");

    let report = system.perform_health_check(&env).await.unwrap();
    assert_eq!(report.health_status.status, HealthState::Critical);
    assert!(report.health_status.score < 50);
    assert!(report
        .health_status
        .issues
        .iter()
        .any(|i| i.category == IssueCategory::Connectivity));

    let alerts = system.get_active_alerts("env-1").await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::Critical);

    // A repeat check re-detects the issue instead of duplicating the
    // alert, and preserves the issue's first-detected identity.
    let second = system.perform_health_check(&env).await.unwrap();
    assert_eq!(system.get_active_alerts("env-1").await.len(), 1);
    let issue = &second.health_status.issues[0];
    let first_issue = &report.health_status.issues[0];
    assert_eq!(issue.id, first_issue.id);
    assert_eq!(issue.first_detected, first_issue.first_detected);
    assert!(issue.last_seen >= first_issue.last_seen);
}

#[tokio::test]
async fn sampler_failure_yields_sentinel_metrics() {
    let (system, _) = build_system(
        MockProbe::healthy(),
        MockSampler::failing(),
        MonitoringConfig::default(),
    );
    let env = test_environment("env-1");

    let metrics = system.collect_performance_metrics(&env).await;
    assert_eq!(metrics.response_time_ms, -1.0);
    assert_eq!(metrics.error_rate, 100.0);
    assert_eq!(metrics.throughput, 0.0);

    // The check still completes with a structurally complete report.
    let report = system.perform_health_check(&env).await.unwrap();
    assert!(report
        .health_status
        .issues
        .iter()
        .any(|i| i.category == IssueCategory::Performance));
}

#[tokio::test]
async fn disabled_alerting_suppresses_alerts_entirely() {
    let mut config = MonitoringConfig::default();
    config.alerting.enabled = false;
    let (system, sent) = build_system(
        MockProbe::disconnected("Connection refused"),
        MockSampler::failing(),
        config,
    );
    let env = test_environment("env-1");

    let report = system.perform_health_check(&env).await.unwrap();
    assert_eq!(report.health_status.status, HealthState::Critical);
    assert!(system.get_active_alerts("env-1").await.is_empty());
    assert!(sent.read().await.is_empty());
}

#[tokio::test]
async fn alert_lifecycle_is_idempotent() {
    let (system, _) = build_system(
        MockProbe::disconnected("Connection refused"),
        MockSampler::healthy(),
        MonitoringConfig::default(),
    );
    let env = test_environment("env-1");

    // Unknown ids never error and change nothing.
    system.acknowledge_alert("env-1", "missing").await;
    system.resolve_alert("env-1", "missing").await;
    system.acknowledge_alert("ghost-env", "missing").await;

    system.perform_health_check(&env).await.unwrap();
    let alerts = system.get_active_alerts("env-1").await;
    assert_eq!(alerts.len(), 1);

    system.acknowledge_alert("env-1", &alerts[0].id).await;
    let acknowledged = system.get_active_alerts("env-1").await;
    assert!(acknowledged[0].acknowledged);

    system.resolve_alert("env-1", &alerts[0].id).await;
    system.resolve_alert("env-1", &alerts[0].id).await;
    assert!(system.get_active_alerts("env-1").await.is_empty());
}

#[tokio::test]
async fn escalation_rules_dispatch_notifications() {
    let mut config = MonitoringConfig::default();
    config.alerting.escalation_rules = vec![EscalationRule {
        condition: AlertSeverity::Critical,
        delay_ms: 0,
        action: EscalationAction::Webhook,
        recipients: vec!["https://hooks.example.com/oncall".to_string()],
    }];
    let (system, sent) = build_system(
        MockProbe::disconnected("Connection refused"),
        MockSampler::healthy(),
        config,
    );
    let env = test_environment("env-1");

    system.perform_health_check(&env).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let sent = sent.read().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].0,
        NotificationTarget::Webhook("https://hooks.example.com/oncall".to_string())
    );
    assert_eq!(sent[0].1.severity, AlertSeverity::Critical);
    assert_eq!(sent[0].1.environment_id, "env-1");
}

#[tokio::test]
async fn scheduler_runs_checks_until_stopped() {
    let mut config = MonitoringConfig::default();
    config.check_interval_ms = 25;
    let (system, _) = build_system(MockProbe::healthy(), MockSampler::healthy(), config);
    let env = test_environment("env-1");

    Arc::clone(&system).start_monitoring(&env).await;
    assert!(system.is_monitoring("env-1").await);

    tokio::time::sleep(Duration::from_millis(110)).await;
    assert!(system.stop_monitoring("env-1").await);
    assert!(!system.is_monitoring("env-1").await);

    let history_len = system.get_health_history("env-1", None).await.len();
    assert!(history_len >= 2, "got {} checks", history_len);

    // No further checks once stopped.
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(
        system.get_health_history("env-1", None).await.len(),
        history_len
    );
}

#[tokio::test]
async fn scheduler_survives_failing_checks() {
    let mut config = MonitoringConfig::default();
    config.check_interval_ms = 25;
    let (system, _) = build_system_with_guard(
        MockProbe::healthy(),
        MockSampler::healthy(),
        config,
        Arc::new(DenyAllGuard),
    );
    let env = test_environment("env-1");

    Arc::clone(&system).start_monitoring(&env).await;
    tokio::time::sleep(Duration::from_millis(110)).await;

    // Every tick errored, yet the monitor is still armed.
    assert!(system.is_monitoring("env-1").await);
    system.stop_all_monitoring().await;
    assert!(!system.is_monitoring("env-1").await);
}

#[tokio::test]
async fn restarting_monitoring_does_not_stack_timers() {
    let mut config = MonitoringConfig::default();
    config.check_interval_ms = 40;
    let (system, _) = build_system(MockProbe::healthy(), MockSampler::healthy(), config);
    let env = test_environment("env-1");

    for _ in 0..3 {
        Arc::clone(&system).start_monitoring(&env).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    system.stop_all_monitoring().await;

    // Each re-arm fires one immediate tick; a stacked timer would keep
    // all three tickers running and roughly triple the rate.
    let history_len = system.get_health_history("env-1", None).await.len();
    assert!(history_len <= 6, "got {} checks", history_len);
}

#[tokio::test]
async fn gate_denial_records_unknown_report_and_propagates() {
    let (system, _) = build_system_with_guard(
        MockProbe::healthy(),
        MockSampler::healthy(),
        MonitoringConfig::default(),
        Arc::new(DenyAllGuard),
    );
    let env = test_environment("env-1");

    let err = system.perform_health_check(&env).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AuthorizationError);

    let history = system.get_health_history("env-1", None).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].health_status.status, HealthState::Unknown);
    assert_eq!(history[0].health_status.score, 0);
    assert!(!history[0].validation_result.is_valid);
}

#[tokio::test]
async fn functionality_checks_are_deterministic_opt_in() {
    let mut config = MonitoringConfig::default();
    config.include_functionality_checks = true;
    let mut probe = MockProbe::healthy();
    probe.functionality_failures = vec!["reservation flow".to_string()];
    let (system, _) = build_system(probe.clone(), MockSampler::healthy(), config.clone());

    let report = system
        .perform_health_check(&test_environment("env-1"))
        .await
        .unwrap();
    let functionality = report.functionality_result.expect("functionality result");
    assert_eq!(functionality.tests_run, 8);
    assert_eq!(functionality.tests_passed, 7);
    assert!(report
        .health_status
        .issues
        .iter()
        .any(|i| i.category == IssueCategory::Functionality));

    // Production environments never run functionality checks.
    let (system, _) = build_system(probe, MockSampler::healthy(), config);
    let prod_env = test_environment("env-prod").production();
    let report = system.perform_health_check(&prod_env).await.unwrap();
    assert!(report.functionality_result.is_none());
}

#[tokio::test]
async fn trends_stabilize_over_constant_metrics() {
    let (system, _) = build_system(
        MockProbe::healthy(),
        MockSampler::healthy(),
        MonitoringConfig::default(),
    );
    let env = test_environment("env-1");

    let mut last = None;
    for _ in 0..4 {
        last = Some(system.perform_health_check(&env).await.unwrap());
    }
    let report = last.unwrap();
    let score_trend = report
        .trends
        .iter()
        .find(|t| t.metric == TrendMetric::OverallScore)
        .expect("score trend");
    assert_eq!(score_trend.timeframe, Timeframe::LastDay);
    assert_eq!(score_trend.values.len(), 4);
    assert_eq!(score_trend.trend, TrendDirection::Stable);
}

#[tokio::test]
async fn concurrent_checks_on_one_environment_are_serialized() {
    let (system, _) = build_system(
        MockProbe::healthy(),
        MockSampler::healthy(),
        MonitoringConfig::default(),
    );
    let env = test_environment("env-1");

    let results = join_all((0..6).map(|_| system.perform_health_check(&env))).await;
    for result in results {
        assert!(result.is_ok());
    }

    let history = system.get_health_history("env-1", None).await;
    assert_eq!(history.len(), 6);
    for pair in history.windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
    }
}

#[tokio::test]
async fn environments_are_isolated_from_each_other() {
    let (system, _) = build_system(
        MockProbe::healthy(),
        MockSampler::healthy(),
        MonitoringConfig::default(),
    );

    system
        .perform_health_check(&test_environment("env-a"))
        .await
        .unwrap();
    system
        .perform_health_check(&test_environment("env-b"))
        .await
        .unwrap();
    system
        .perform_health_check(&test_environment("env-b"))
        .await
        .unwrap();

    assert_eq!(system.get_health_history("env-a", None).await.len(), 1);
    assert_eq!(system.get_health_history("env-b", None).await.len(), 2);
    assert!(system.get_health_history("env-c", None).await.is_empty());
}

#[tokio::test]
async fn cleanup_applies_each_retention_class() {
    let mut config = MonitoringConfig::default();
    config.retention.reports_retention_days = 0;
    config.retention.metrics_retention_days = 0;
    config.retention.alerts_retention_days = 0;
    let (system, _) = build_system(
        MockProbe::disconnected("Connection refused"),
        MockSampler::healthy(),
        config,
    );
    let env = test_environment("env-1");

    system.perform_health_check(&env).await.unwrap();
    let alerts = system.get_active_alerts("env-1").await;
    assert_eq!(alerts.len(), 1);
    system.resolve_alert("env-1", &alerts[0].id).await;

    // Zero-day retention: everything already written is out of window,
    // but unresolved alerts are never pruned.
    tokio::time::sleep(Duration::from_millis(5)).await;
    system.cleanup().await;

    assert!(system.get_health_history("env-1", None).await.is_empty());
    assert!(system
        .recent_metric_samples("env-1", Timeframe::LastHour)
        .await
        .is_empty());
    assert!(system.get_active_alerts("env-1").await.is_empty());
}

#[tokio::test]
async fn cleanup_with_default_retention_keeps_fresh_data() {
    let (system, _) = build_system(
        MockProbe::healthy(),
        MockSampler::healthy(),
        MonitoringConfig::default(),
    );
    let env = test_environment("env-1");

    system.perform_health_check(&env).await.unwrap();
    system.cleanup().await;

    assert_eq!(system.get_health_history("env-1", None).await.len(), 1);
    assert_eq!(
        system
            .recent_metric_samples("env-1", Timeframe::LastHour)
            .await
            .len(),
        1
    );
}
