// src/services/probes.rs
//
// Collaborator seams consumed by the monitoring core. The concrete
// query logic against a target environment lives outside this crate;
// these traits define the structured results the core reasons about.

use crate::types::Environment;
use crate::utils::{now_ms, PulseError, PulseResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Successful connectivity probe payload. Elapsed time is measured by
/// the validation engine around the call, not reported by the probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityProbe {
    pub version: Option<String>,
}

/// Structural inventory of the target environment's schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaProbe {
    pub tables: Vec<String>,
    pub functions: Vec<String>,
    pub triggers: Vec<String>,
    pub policies: Vec<String>,
}

/// Presence probe for the audit subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditProbe {
    pub audit_tables: Vec<String>,
    pub audit_triggers: Vec<String>,
    pub audit_functions: Vec<String>,
    /// Audit log rows written in the last 24 hours.
    pub recent_log_entries: u64,
}

/// Result of an end-to-end functionality suite run against a
/// non-production environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionalityResult {
    pub tests_run: u32,
    pub tests_passed: u32,
    pub failures: Vec<String>,
    pub duration_ms: u64,
}

impl FunctionalityResult {
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty() && self.tests_passed == self.tests_run
    }
}

/// Point-in-time performance sample for an environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Milliseconds; `-1.0` is the sentinel for a failed collection.
    pub response_time_ms: f64,
    pub throughput: f64,
    /// Percentage, clamped to [0, 100].
    pub error_rate: f64,
    pub connection_count: u32,
    pub active_queries: u32,
    pub timestamp: u64,
}

impl PerformanceMetrics {
    pub fn new(response_time_ms: f64, throughput: f64, error_rate: f64) -> Self {
        Self {
            response_time_ms,
            throughput,
            error_rate: error_rate.clamp(0.0, 100.0),
            connection_count: 0,
            active_queries: 0,
            timestamp: now_ms(),
        }
    }

    /// Sentinel shape returned when the sampler fails, so evaluation
    /// always has a value to reason about.
    pub fn failure_sentinel() -> Self {
        Self {
            response_time_ms: -1.0,
            throughput: 0.0,
            error_rate: 100.0,
            connection_count: 0,
            active_queries: 0,
            timestamp: now_ms(),
        }
    }

    pub fn is_failure_sentinel(&self) -> bool {
        self.response_time_ms < 0.0
    }

    /// Re-clamps caller-supplied values into their documented ranges.
    pub fn normalized(mut self) -> Self {
        self.error_rate = self.error_rate.clamp(0.0, 100.0);
        self
    }
}

/// Read-only checks against a target environment.
///
/// Implementations own their transport and timeouts; a hung query must
/// not be able to stall the caller past the implementation's own
/// deadline.
#[async_trait]
pub trait DataProbe: Send + Sync {
    /// One cheap read against the target. Errors mean "not connected".
    async fn connectivity(&self, env: &Environment) -> PulseResult<ConnectivityProbe>;

    async fn schema(&self, env: &Environment) -> PulseResult<SchemaProbe>;

    /// Row count for a single table.
    async fn record_count(&self, env: &Environment, table: &str) -> PulseResult<u64>;

    /// Rows in `child` whose `fk_column` references a missing row in `parent`.
    async fn orphaned_count(
        &self,
        env: &Environment,
        child: &str,
        fk_column: &str,
        parent: &str,
    ) -> PulseResult<u64>;

    /// Rows in `table` sharing a `column` value with another row.
    async fn duplicate_count(&self, env: &Environment, table: &str, column: &str)
        -> PulseResult<u64>;

    /// Rows in `table` with a NULL `column` value.
    async fn null_count(&self, env: &Environment, table: &str, column: &str) -> PulseResult<u64>;

    async fn audit(&self, env: &Environment) -> PulseResult<AuditProbe>;

    /// Optional end-to-end functionality suite for non-production
    /// environments. Probes that do not support it keep the default.
    async fn functionality(&self, env: &Environment) -> PulseResult<FunctionalityResult> {
        Err(PulseError::probe_error(format!(
            "functionality probe not implemented for environment '{}'",
            env.id
        )))
    }
}

/// Measures live performance characteristics of an environment.
#[async_trait]
pub trait PerformanceSampler: Send + Sync {
    async fn collect(&self, env: &Environment) -> PulseResult<PerformanceMetrics>;
}

/// Gate consulted before any check runs against an environment.
#[async_trait]
pub trait ProductionSafetyGuard: Send + Sync {
    /// Fails with an access-denied error when `operation` is disallowed
    /// for `env`.
    async fn check(&self, env: &Environment, operation: &str) -> PulseResult<()>;
}

const READ_ONLY_OPERATIONS: &[&str] = &["health_check", "validate", "collect_metrics"];

/// Default guard: read-only operations are admitted everywhere,
/// anything else is denied against production-flagged environments.
#[derive(Debug, Clone, Default)]
pub struct ReadOnlyGuard;

#[async_trait]
impl ProductionSafetyGuard for ReadOnlyGuard {
    async fn check(&self, env: &Environment, operation: &str) -> PulseResult<()> {
        if READ_ONLY_OPERATIONS.contains(&operation) {
            return Ok(());
        }
        if env.production {
            return Err(PulseError::access_denied(format!(
                "operation '{}' is not allowed against production environment '{}'",
                operation, env.id
            ))
            .with_operation(operation));
        }
        Ok(())
    }
}
