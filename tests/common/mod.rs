// tests/common/mod.rs
//
// Shared mock collaborators for the integration suites.

#![allow(dead_code)]

use async_trait::async_trait;
use envpulse::{
    AlertNotification, AuditProbe, ConnectionParams, ConnectivityProbe, DataProbe, Environment,
    FunctionalityResult, NotificationTarget, NotificationTransport, PerformanceMetrics,
    PerformanceSampler, ProductionSafetyGuard, PulseError, PulseResult, SchemaProbe,
    EXPECTED_TABLES,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub fn test_environment(id: &str) -> Environment {
    Environment::new(
        id,
        format!("Environment {}", id),
        ConnectionParams::new("https://db.example.com"),
    )
}

/// Configurable probe; the default is a fully healthy target.
#[derive(Clone)]
pub struct MockProbe {
    pub connectivity_error: Option<String>,
    pub connectivity_delay_ms: u64,
    pub tables: Vec<String>,
    pub records_per_table: u64,
    pub orphaned_reservations: u64,
    pub duplicate_emails: u64,
    pub null_emails: u64,
    pub audit_complete: bool,
    pub functionality_failures: Vec<String>,
}

impl MockProbe {
    pub fn healthy() -> Self {
        Self {
            connectivity_error: None,
            connectivity_delay_ms: 0,
            tables: EXPECTED_TABLES.iter().map(|t| t.to_string()).collect(),
            records_per_table: 250,
            orphaned_reservations: 0,
            duplicate_emails: 0,
            null_emails: 0,
            audit_complete: true,
            functionality_failures: Vec::new(),
        }
    }

    pub fn disconnected(message: &str) -> Self {
        Self {
            connectivity_error: Some(message.to_string()),
            ..Self::healthy()
        }
    }

    pub fn with_tables(tables: &[&str]) -> Self {
        Self {
            tables: tables.iter().map(|t| t.to_string()).collect(),
            ..Self::healthy()
        }
    }
}

#[async_trait]
impl DataProbe for MockProbe {
    async fn connectivity(&self, _env: &Environment) -> PulseResult<ConnectivityProbe> {
        if self.connectivity_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.connectivity_delay_ms)).await;
        }
        match &self.connectivity_error {
            Some(message) => Err(PulseError::probe_error(message.clone())),
            None => Ok(ConnectivityProbe {
                version: Some("15.3".to_string()),
            }),
        }
    }

    async fn schema(&self, _env: &Environment) -> PulseResult<SchemaProbe> {
        Ok(SchemaProbe {
            tables: self.tables.clone(),
            functions: vec!["handle_new_user".to_string(), "log_change".to_string()],
            triggers: vec!["on_reservation_insert".to_string()],
            policies: vec!["users_select_own".to_string()],
        })
    }

    async fn record_count(&self, _env: &Environment, _table: &str) -> PulseResult<u64> {
        Ok(self.records_per_table)
    }

    async fn orphaned_count(
        &self,
        _env: &Environment,
        child: &str,
        _fk_column: &str,
        parent: &str,
    ) -> PulseResult<u64> {
        if child == "reservations" && parent == "lofts" {
            Ok(self.orphaned_reservations)
        } else {
            Ok(0)
        }
    }

    async fn duplicate_count(
        &self,
        _env: &Environment,
        table: &str,
        column: &str,
    ) -> PulseResult<u64> {
        if table == "users" && column == "email" {
            Ok(self.duplicate_emails)
        } else {
            Ok(0)
        }
    }

    async fn null_count(&self, _env: &Environment, table: &str, column: &str) -> PulseResult<u64> {
        if table == "users" && column == "email" {
            Ok(self.null_emails)
        } else {
            Ok(0)
        }
    }

    async fn audit(&self, _env: &Environment) -> PulseResult<AuditProbe> {
        if self.audit_complete {
            Ok(AuditProbe {
                audit_tables: vec!["audit_logs".to_string(), "audit_events".to_string()],
                audit_triggers: vec!["audit_on_update".to_string()],
                audit_functions: vec!["write_audit_row".to_string()],
                recent_log_entries: 12,
            })
        } else {
            Ok(AuditProbe::default())
        }
    }

    async fn functionality(&self, _env: &Environment) -> PulseResult<FunctionalityResult> {
        let failures = self.functionality_failures.clone();
        let tests_run = 8;
        Ok(FunctionalityResult {
            tests_run,
            tests_passed: tests_run - failures.len() as u32,
            failures,
            duration_ms: 40,
        })
    }
}

/// Sampler returning fixed metrics, or failing when none are set.
pub struct MockSampler {
    pub metrics: Option<PerformanceMetrics>,
}

impl MockSampler {
    pub fn healthy() -> Self {
        Self {
            metrics: Some(PerformanceMetrics::new(120.0, 50.0, 0.5)),
        }
    }

    pub fn failing() -> Self {
        Self { metrics: None }
    }
}

#[async_trait]
impl PerformanceSampler for MockSampler {
    async fn collect(&self, _env: &Environment) -> PulseResult<PerformanceMetrics> {
        match &self.metrics {
            Some(metrics) => Ok(PerformanceMetrics {
                timestamp: envpulse::utils::now_ms(),
                ..metrics.clone()
            }),
            None => Err(PulseError::probe_error("sampler crashed")),
        }
    }
}

/// Guard that denies every operation, for gate-propagation tests.
pub struct DenyAllGuard;

#[async_trait]
impl ProductionSafetyGuard for DenyAllGuard {
    async fn check(&self, env: &Environment, operation: &str) -> PulseResult<()> {
        Err(PulseError::access_denied(format!(
            "operation '{}' denied for environment '{}'",
            operation, env.id
        )))
    }
}

/// Transport that records every send instead of delivering it.
pub struct RecordingTransport {
    pub sent: Arc<RwLock<Vec<(NotificationTarget, AlertNotification)>>>,
}

impl RecordingTransport {
    pub fn new() -> (Arc<Self>, Arc<RwLock<Vec<(NotificationTarget, AlertNotification)>>>) {
        let sent = Arc::new(RwLock::new(Vec::new()));
        (
            Arc::new(Self {
                sent: Arc::clone(&sent),
            }),
            sent,
        )
    }
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    async fn send(
        &self,
        target: &NotificationTarget,
        payload: &AlertNotification,
    ) -> PulseResult<()> {
        self.sent
            .write()
            .await
            .push((target.clone(), payload.clone()));
        Ok(())
    }
}
