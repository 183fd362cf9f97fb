// src/services/monitoring.rs
//
// Composition root for the monitoring core. Owns every mutable
// registry (history, active alerts, issue registry, uptime counters,
// per-environment check locks) so multiple independent monitor
// instances can coexist and shut down cleanly.

use crate::services::alerts::{AlertManager, HealthAlert};
use crate::services::health::{HealthEvaluator, HealthIssue};
use crate::services::history::{CurrentObservation, HealthReport, HistoryStore};
use crate::services::notifications::NotificationTransport;
use crate::services::probes::{
    DataProbe, FunctionalityResult, PerformanceMetrics, PerformanceSampler, ProductionSafetyGuard,
};
use crate::services::scheduler::MonitoringScheduler;
use crate::services::validation::{ValidationEngine, ValidationResult};
use crate::types::{Environment, IssueCategory, IssueSeverity, MonitoringConfig, Timeframe};
use crate::utils::{days_to_ms, now_ms, LogLevel, Logger, PulseResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

pub struct HealthMonitoringSystem {
    config: MonitoringConfig,
    probe: Arc<dyn DataProbe>,
    sampler: Arc<dyn PerformanceSampler>,
    engine: ValidationEngine,
    evaluator: HealthEvaluator,
    alerts: AlertManager,
    scheduler: MonitoringScheduler,
    history: HistoryStore,
    /// Serializes check finalization per environment; checks for
    /// different environments run concurrently.
    check_locks: Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>,
    issue_registry: Arc<RwLock<HashMap<String, HashMap<String, HealthIssue>>>>,
    uptime: Arc<RwLock<HashMap<String, u64>>>,
    last_report_ts: Arc<RwLock<HashMap<String, u64>>>,
    logger: Logger,
}

impl HealthMonitoringSystem {
    pub fn new(
        config: MonitoringConfig,
        probe: Arc<dyn DataProbe>,
        sampler: Arc<dyn PerformanceSampler>,
        guard: Arc<dyn ProductionSafetyGuard>,
        transport: Arc<dyn NotificationTransport>,
    ) -> PulseResult<Self> {
        config.validate()?;
        let engine = ValidationEngine::new(Arc::clone(&probe), guard);
        let alerts = AlertManager::new(config.alerting.clone(), transport);
        Ok(Self {
            config,
            probe,
            sampler,
            engine,
            evaluator: HealthEvaluator::new(),
            alerts,
            scheduler: MonitoringScheduler::new(),
            history: HistoryStore::new(),
            check_locks: Arc::new(RwLock::new(HashMap::new())),
            issue_registry: Arc::new(RwLock::new(HashMap::new())),
            uptime: Arc::new(RwLock::new(HashMap::new())),
            last_report_ts: Arc::new(RwLock::new(HashMap::new())),
            logger: Logger::new(LogLevel::Info),
        })
    }

    pub fn config(&self) -> &MonitoringConfig {
        &self.config
    }

    /// Direct access to the validation layer for callers that want the
    /// structural result without a full health check.
    pub async fn validate_environment(&self, env: &Environment) -> PulseResult<ValidationResult> {
        self.engine.validate_environment(env).await
    }

    /// Runs one full check: validation, performance sampling, status
    /// fusion, alert reconciliation, trend recomputation, history
    /// append. Only validation-engine errors propagate.
    pub async fn perform_health_check(&self, env: &Environment) -> PulseResult<HealthReport> {
        let lock = self.check_lock(&env.id).await;
        let _serialized = lock.lock().await;

        let validation = match self.engine.validate_environment(env).await {
            Ok(validation) => validation,
            Err(err) => {
                // A gate denial for a well-formed environment leaves an
                // unknown-status report behind before propagating; a
                // malformed environment has no key to file one under.
                if !env.id.trim().is_empty() && !env.name.trim().is_empty() {
                    let uptime = self.current_uptime(&env.id).await;
                    let report = HealthReport {
                        environment_id: env.id.clone(),
                        environment_name: env.name.clone(),
                        timestamp: self.next_report_timestamp(&env.id).await,
                        health_status: HealthEvaluator::failure_status(&err.to_string(), uptime),
                        performance_metrics: PerformanceMetrics::failure_sentinel(),
                        validation_result: ValidationResult::unavailable(err.to_string()),
                        functionality_result: None,
                        trends: Vec::new(),
                        alerts: Vec::new(),
                    };
                    self.history.append(report).await;
                }
                return Err(err);
            }
        };

        let performance_metrics = self.collect_performance_metrics(env).await;
        self.history
            .record_sample(&env.id, performance_metrics.clone())
            .await;

        let uptime = self.bump_uptime(&env.id).await;
        let mut health_status = self.evaluator.evaluate(
            &validation,
            &performance_metrics,
            &self.config.performance_thresholds,
            uptime,
        );

        let functionality_result = self.run_functionality_checks(env).await;
        if let Some(functionality) = &functionality_result {
            if !functionality.all_passed() {
                health_status.issues.push(HealthIssue::new(
                    IssueSeverity::Medium,
                    IssueCategory::Functionality,
                    "Functionality checks failing",
                    format!(
                        "{} of {} end-to-end test(s) failed: {}",
                        functionality.failures.len(),
                        functionality.tests_run,
                        functionality.failures.join(", ")
                    ),
                    "Review the failing end-to-end checks",
                ));
            }
        }

        health_status.issues = self.merge_issues(&env.id, health_status.issues).await;

        let created = self.alerts.reconcile(&env.id, &health_status.issues).await;
        self.alerts.escalate(&created).await;
        let alerts = self.alerts.active(&env.id).await;

        let observation = CurrentObservation {
            score: health_status.score as f64,
            response_time_ms: performance_metrics.response_time_ms,
            error_rate: performance_metrics.error_rate,
            throughput: performance_metrics.throughput,
        };
        let trends = self
            .history
            .trends_for_report(&env.id, Timeframe::LastDay, &observation)
            .await;

        let report = HealthReport {
            environment_id: env.id.clone(),
            environment_name: env.name.clone(),
            timestamp: self.next_report_timestamp(&env.id).await,
            health_status,
            performance_metrics,
            validation_result: validation,
            functionality_result,
            trends,
            alerts,
        };
        self.history.append(report.clone()).await;

        self.logger.info_with_meta(
            "health check completed",
            Some(&serde_json::json!({
                "environment_id": env.id,
                "score": report.health_status.score,
                "status": report.health_status.status.as_str(),
                "issues": report.health_status.issues.len(),
            })),
        );
        Ok(report)
    }

    /// Never errors; a failed sampler yields the sentinel shape.
    pub async fn collect_performance_metrics(&self, env: &Environment) -> PerformanceMetrics {
        match self.sampler.collect(env).await {
            Ok(metrics) => metrics.normalized(),
            Err(err) => {
                log::warn!("performance sampling for '{}' failed: {}", env.id, err);
                PerformanceMetrics::failure_sentinel()
            }
        }
    }

    /// Arms the recurring check for an environment; idempotent per id.
    pub async fn start_monitoring(self: Arc<Self>, env: &Environment) {
        let system = Arc::clone(&self);
        let env_for_ticks = env.clone();
        let interval = Duration::from_millis(self.config.check_interval_ms);

        self.logger.info_with_meta(
            "monitoring started",
            Some(&serde_json::json!({
                "environment_id": env.id,
                "check_interval_ms": self.config.check_interval_ms,
            })),
        );
        self.scheduler
            .start(&env.id, interval, move || {
                let system = Arc::clone(&system);
                let env = env_for_ticks.clone();
                async move { system.perform_health_check(&env).await.map(|_| ()) }
            })
            .await;
    }

    /// Stops the environment's monitor; returns whether one was running.
    pub async fn stop_monitoring(&self, environment_id: &str) -> bool {
        let stopped = self.scheduler.stop(environment_id).await;
        if stopped {
            self.logger.info_with_meta(
                "monitoring stopped",
                Some(&serde_json::json!({ "environment_id": environment_id })),
            );
        }
        stopped
    }

    pub async fn stop_all_monitoring(&self) {
        self.scheduler.stop_all().await;
        self.logger.info("all monitoring stopped");
    }

    pub async fn is_monitoring(&self, environment_id: &str) -> bool {
        self.scheduler.is_running(environment_id).await
    }

    pub async fn get_health_history(
        &self,
        environment_id: &str,
        timeframe: Option<Timeframe>,
    ) -> Vec<HealthReport> {
        self.history.reports(environment_id, timeframe).await
    }

    pub async fn get_active_alerts(&self, environment_id: &str) -> Vec<HealthAlert> {
        self.alerts.active(environment_id).await
    }

    /// Idempotent; unknown ids never error.
    pub async fn acknowledge_alert(&self, environment_id: &str, alert_id: &str) {
        self.alerts.acknowledge(environment_id, alert_id).await;
    }

    /// Idempotent; unknown ids never error.
    pub async fn resolve_alert(&self, environment_id: &str, alert_id: &str) {
        self.alerts.resolve(environment_id, alert_id).await;
    }

    pub async fn recent_metric_samples(
        &self,
        environment_id: &str,
        timeframe: Timeframe,
    ) -> Vec<PerformanceMetrics> {
        self.history.recent_samples(environment_id, timeframe).await
    }

    /// Applies the three retention classes independently. Never errors.
    pub async fn cleanup(&self) {
        let now = now_ms();
        let retention = &self.config.retention;
        self.history
            .prune_reports(now.saturating_sub(days_to_ms(retention.reports_retention_days)))
            .await;
        self.history
            .prune_samples(now.saturating_sub(days_to_ms(retention.metrics_retention_days)))
            .await;
        self.alerts
            .prune_resolved(now.saturating_sub(days_to_ms(retention.alerts_retention_days)))
            .await;
        self.logger.debug("retention cleanup applied");
    }

    async fn run_functionality_checks(&self, env: &Environment) -> Option<FunctionalityResult> {
        if !self.config.include_functionality_checks || env.production {
            return None;
        }
        match self.probe.functionality(env).await {
            Ok(result) => Some(result),
            Err(err) => {
                log::debug!("functionality checks for '{}' unavailable: {}", env.id, err);
                None
            }
        }
    }

    /// Re-detection keeps an issue's identity: the registry preserves
    /// `id` and `first_detected` for a recurring category+title, and
    /// marks registry entries absent from the current pass as resolved.
    async fn merge_issues(
        &self,
        environment_id: &str,
        fresh: Vec<HealthIssue>,
    ) -> Vec<HealthIssue> {
        let mut registry = self.issue_registry.write().await;
        let entries = registry.entry(environment_id.to_string()).or_default();
        let now = now_ms();

        let mut current_keys: HashSet<String> = HashSet::with_capacity(fresh.len());
        let mut merged = Vec::with_capacity(fresh.len());
        for mut issue in fresh {
            let key = issue.key();
            if let Some(existing) = entries.get(&key) {
                issue.id = existing.id.clone();
                issue.first_detected = existing.first_detected;
            }
            issue.last_seen = now;
            issue.resolved = false;
            entries.insert(key.clone(), issue.clone());
            current_keys.insert(key);
            merged.push(issue);
        }
        for (key, entry) in entries.iter_mut() {
            if !current_keys.contains(key) {
                entry.resolved = true;
            }
        }
        merged
    }

    async fn check_lock(&self, environment_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.check_locks.write().await;
        Arc::clone(
            locks
                .entry(environment_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    async fn current_uptime(&self, environment_id: &str) -> u64 {
        self.uptime
            .read()
            .await
            .get(environment_id)
            .copied()
            .unwrap_or(0)
    }

    async fn bump_uptime(&self, environment_id: &str) -> u64 {
        let mut uptime = self.uptime.write().await;
        let counter = uptime.entry(environment_id.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Report timestamps are strictly increasing per environment, even
    /// when two checks finish inside the same millisecond.
    async fn next_report_timestamp(&self, environment_id: &str) -> u64 {
        let mut stamps = self.last_report_ts.write().await;
        let entry = stamps.entry(environment_id.to_string()).or_insert(0);
        let timestamp = now_ms().max(*entry + 1);
        *entry = timestamp;
        timestamp
    }
}
