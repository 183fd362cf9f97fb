// src/services/health.rs
//
// Fuses a validation result and a performance sample into a categorical
// health status with a deduplicatable issue list. Evaluation is pure;
// the `unknown` shape exists only for the path where validation itself
// could not run.

use crate::services::probes::PerformanceMetrics;
use crate::services::validation::ValidationResult;
use crate::types::{HealthState, IssueCategory, IssueSeverity, PerformanceThresholds};
use crate::utils::now_ms;
use serde::{Deserialize, Serialize};

/// A detected deficiency, deduplicated across checks by category+title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthIssue {
    pub id: String,
    pub severity: IssueSeverity,
    pub category: IssueCategory,
    pub title: String,
    pub description: String,
    pub recommendation: String,
    pub first_detected: u64,
    pub last_seen: u64,
    pub resolved: bool,
}

impl HealthIssue {
    pub fn new(
        severity: IssueSeverity,
        category: IssueCategory,
        title: impl Into<String>,
        description: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        let now = now_ms();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            severity,
            category,
            title: title.into(),
            description: description.into(),
            recommendation: recommendation.into(),
            first_detected: now,
            last_seen: now,
            resolved: false,
        }
    }

    /// Dedup key within one environment.
    pub fn key(&self) -> String {
        format!("{}:{}", self.category.as_str(), self.title)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub score: u8,
    pub last_checked: u64,
    /// Successful checks since the environment was first monitored.
    pub uptime: u64,
    pub issues: Vec<HealthIssue>,
}

#[derive(Debug, Clone, Default)]
pub struct HealthEvaluator;

impl HealthEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(
        &self,
        validation: &ValidationResult,
        metrics: &PerformanceMetrics,
        thresholds: &PerformanceThresholds,
        uptime: u64,
    ) -> HealthStatus {
        let mut issues = Vec::new();
        let mut score = validation.overall_score as i32;

        let connectivity = &validation.connectivity;
        if !connectivity.connected {
            issues.push(HealthIssue::new(
                IssueSeverity::Critical,
                IssueCategory::Connectivity,
                "Database connection failed",
                connectivity
                    .error
                    .clone()
                    .unwrap_or_else(|| "connectivity probe reported failure".to_string()),
                "Verify connection parameters and database availability",
            ));
        }

        let schema = &validation.schema;
        if connectivity.connected && !schema.is_valid {
            let severity = if schema.missing_tables.len() > schema.tables_found.len() {
                IssueSeverity::High
            } else {
                IssueSeverity::Medium
            };
            issues.push(HealthIssue::new(
                severity,
                IssueCategory::Data,
                "Missing schema tables",
                format!(
                    "{} expected table(s) absent: {}",
                    schema.missing_tables.len(),
                    schema.missing_tables.join(", ")
                ),
                "Apply pending migrations to restore the expected schema",
            ));
        }

        let integrity = &validation.data_integrity;
        if integrity.orphaned_records > 0 {
            issues.push(HealthIssue::new(
                IssueSeverity::High,
                IssueCategory::Data,
                "Orphaned records detected",
                format!(
                    "{} child record(s) reference missing parents",
                    integrity.orphaned_records
                ),
                "Repair or remove records whose parent rows no longer exist",
            ));
        }
        if integrity.null_violations > 0 {
            issues.push(HealthIssue::new(
                IssueSeverity::High,
                IssueCategory::Data,
                "Null constraint violations",
                format!(
                    "{} critical column value(s) are NULL",
                    integrity.null_violations
                ),
                "Backfill the affected columns and enforce NOT NULL constraints",
            ));
        }
        if integrity.duplicate_records > 0 {
            issues.push(HealthIssue::new(
                IssueSeverity::Medium,
                IssueCategory::Data,
                "Duplicate identity records",
                format!(
                    "{} duplicated identity value(s) found",
                    integrity.duplicate_records
                ),
                "Merge duplicate accounts and add a uniqueness constraint",
            ));
        }
        if connectivity.connected && !integrity.errors.is_empty() {
            issues.push(HealthIssue::new(
                IssueSeverity::Medium,
                IssueCategory::Data,
                "Integrity verification incomplete",
                integrity.errors.join("; "),
                "Grant the probe access to the tables it could not verify",
            ));
        }

        let audit = &validation.audit_system;
        if connectivity.connected && !audit.is_valid {
            let severity = if audit.tables_present {
                IssueSeverity::Medium
            } else {
                IssueSeverity::High
            };
            issues.push(HealthIssue::new(
                severity,
                IssueCategory::Security,
                "Audit system incomplete",
                format!(
                    "audit tables present: {}, triggers present: {}, functions present: {}",
                    audit.tables_present, audit.triggers_present, audit.functions_present
                ),
                "Install the audit tables, triggers, and functions",
            ));
        }

        // Threshold breaches; severity escalates with distance from the
        // threshold. The -1 response-time sentinel is excluded since the
        // error-rate sentinel already flags the failed collection.
        if metrics.response_time_ms >= 0.0 && metrics.response_time_ms > thresholds.response_time_ms
        {
            let (severity, penalty) = if metrics.response_time_ms > thresholds.response_time_ms * 2.0
            {
                (IssueSeverity::High, 20)
            } else {
                (IssueSeverity::Medium, 10)
            };
            score -= penalty;
            issues.push(HealthIssue::new(
                severity,
                IssueCategory::Performance,
                "Slow response time",
                format!(
                    "average response time {:.0}ms exceeds threshold {:.0}ms",
                    metrics.response_time_ms, thresholds.response_time_ms
                ),
                "Investigate slow queries and connection pool saturation",
            ));
        }

        if metrics.error_rate > thresholds.error_rate {
            let (severity, penalty) = if metrics.error_rate > thresholds.error_rate * 2.0 {
                (IssueSeverity::High, 25)
            } else {
                (IssueSeverity::Medium, 15)
            };
            score -= penalty;
            issues.push(HealthIssue::new(
                severity,
                IssueCategory::Performance,
                "Elevated error rate",
                format!(
                    "error rate {:.1}% exceeds threshold {:.1}%",
                    metrics.error_rate, thresholds.error_rate
                ),
                "Inspect recent errors and failing endpoints",
            ));
        }

        if metrics.throughput < thresholds.throughput {
            score -= 10;
            issues.push(HealthIssue::new(
                IssueSeverity::Medium,
                IssueCategory::Performance,
                "Low throughput",
                format!(
                    "throughput {:.1} req/s is below threshold {:.1} req/s",
                    metrics.throughput, thresholds.throughput
                ),
                "Check for upstream traffic drops or saturated workers",
            ));
        }

        let score = score.clamp(0, 100) as u8;
        HealthStatus {
            status: HealthState::from_score(score),
            score,
            last_checked: now_ms(),
            uptime,
            issues,
        }
    }

    /// Shape used when evaluation never got a validation result to work
    /// with: `unknown` status, zero score, one synthetic issue.
    pub fn failure_status(message: &str, uptime: u64) -> HealthStatus {
        HealthStatus {
            status: HealthState::Unknown,
            score: 0,
            last_checked: now_ms(),
            uptime,
            issues: vec![HealthIssue::new(
                IssueSeverity::Critical,
                IssueCategory::Functionality,
                "Health evaluation failed",
                message.to_string(),
                "Inspect monitor logs and re-run the check once the cause is resolved",
            )],
        }
    }
}
