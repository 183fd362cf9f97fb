// src/services/validation.rs
//
// Multi-dimensional correctness checks against a target environment,
// fused into a weighted 0-100 score. Individual checks never error;
// they degrade into structured failure shapes. Only a malformed
// environment or a safety-gate denial propagates.

use crate::services::probes::{DataProbe, ProductionSafetyGuard};
use crate::types::Environment;
use crate::utils::{now_ms, PulseError, PulseResult};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

const CONNECTION_FAILED: &str = "Database connection failed";

/// Expected table inventory spanning the platform's identity, property,
/// reservation, financial, messaging, and audit domains.
pub const EXPECTED_TABLES: &[&str] = &[
    // identity
    "users",
    "profiles",
    "sessions",
    "roles",
    // property
    "lofts",
    "loft_amenities",
    "loft_photos",
    "loft_owners",
    // reservation & operations
    "reservations",
    "reservation_guests",
    "availability_blocks",
    "tasks",
    // financial
    "transactions",
    "invoices",
    "payment_methods",
    "payouts",
    // messaging
    "conversations",
    "messages",
    "notifications",
    // audit
    "audit_logs",
    "audit_events",
    "audit_archives",
];

/// Tables whose row counts feed the integrity summary.
const CORE_TABLES: &[&str] = &[
    "users",
    "lofts",
    "reservations",
    "transactions",
    "messages",
    "tasks",
];

/// Child/fk/parent relations checked for orphaned rows.
const FK_PAIRS: &[(&str, &str, &str)] = &[
    ("reservations", "loft_id", "lofts"),
    ("reservations", "user_id", "users"),
    ("transactions", "reservation_id", "reservations"),
    ("messages", "conversation_id", "conversations"),
    ("tasks", "loft_id", "lofts"),
];

/// Columns that must never be NULL.
const CRITICAL_NOT_NULL: &[(&str, &str)] = &[
    ("users", "email"),
    ("lofts", "owner_id"),
    ("reservations", "loft_id"),
    ("reservations", "user_id"),
    ("transactions", "amount"),
    ("tasks", "status"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityCheck {
    pub connected: bool,
    pub response_time_ms: u64,
    pub version: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaCheck {
    pub is_valid: bool,
    pub tables_found: Vec<String>,
    pub missing_tables: Vec<String>,
    pub extra_tables: Vec<String>,
    pub functions_found: u32,
    pub triggers_found: u32,
    pub policies_found: u32,
    pub errors: Vec<String>,
}

impl SchemaCheck {
    /// Empty/invalid shape used when the check could not be attempted.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            tables_found: Vec::new(),
            missing_tables: EXPECTED_TABLES.iter().map(|t| t.to_string()).collect(),
            extra_tables: Vec::new(),
            functions_found: 0,
            triggers_found: 0,
            policies_found: 0,
            errors: vec![reason.into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityCheck {
    pub is_valid: bool,
    pub total_records: u64,
    pub orphaned_records: u64,
    pub duplicate_records: u64,
    pub null_violations: u64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl IntegrityCheck {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            total_records: 0,
            orphaned_records: 0,
            duplicate_records: 0,
            null_violations: 0,
            errors: vec![reason.into()],
            warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditCheck {
    pub is_valid: bool,
    pub tables_present: bool,
    pub triggers_present: bool,
    pub functions_present: bool,
    /// At least one audit log row in the last 24 hours. Informational;
    /// does not affect validity.
    pub recent_activity: bool,
    pub errors: Vec<String>,
}

impl AuditCheck {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            tables_present: false,
            triggers_present: false,
            functions_present: false,
            recent_activity: false,
            errors: vec![reason.into()],
        }
    }
}

/// Immutable outcome of one validation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub connectivity: ConnectivityCheck,
    pub schema: SchemaCheck,
    pub data_integrity: IntegrityCheck,
    pub audit_system: AuditCheck,
    pub overall_score: u8,
    pub is_valid: bool,
    pub timestamp: u64,
}

impl ValidationResult {
    /// Placeholder carried by a report whose validation never ran
    /// (e.g. the safety gate denied the check).
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            connectivity: ConnectivityCheck {
                connected: false,
                response_time_ms: 0,
                version: None,
                error: Some(reason.clone()),
            },
            schema: SchemaCheck::unavailable(reason.clone()),
            data_integrity: IntegrityCheck::unavailable(reason.clone()),
            audit_system: AuditCheck::unavailable(reason),
            overall_score: 0,
            is_valid: false,
            timestamp: now_ms(),
        }
    }
}

/// Orchestrates the four check categories and produces the weighted
/// overall score.
pub struct ValidationEngine {
    probe: Arc<dyn DataProbe>,
    guard: Arc<dyn ProductionSafetyGuard>,
}

impl ValidationEngine {
    pub fn new(probe: Arc<dyn DataProbe>, guard: Arc<dyn ProductionSafetyGuard>) -> Self {
        Self { probe, guard }
    }

    pub async fn validate_environment(&self, env: &Environment) -> PulseResult<ValidationResult> {
        if env.id.trim().is_empty() || env.name.trim().is_empty() {
            return Err(PulseError::validation_error(
                "environment id and name must be non-empty",
            )
            .with_operation("validate_environment"));
        }
        self.guard.check(env, "health_check").await?;

        let connectivity = self.validate_database_connectivity(env).await;

        // A dead connection gates everything else; the remaining checks
        // are not attempted rather than allowed to fail one by one.
        let (schema, data_integrity, audit_system) = if connectivity.connected {
            futures::join!(
                self.validate_schema(env),
                self.validate_data_integrity(env),
                self.validate_audit_system(env)
            )
        } else {
            (
                SchemaCheck::unavailable(CONNECTION_FAILED),
                IntegrityCheck::unavailable(CONNECTION_FAILED),
                AuditCheck::unavailable(CONNECTION_FAILED),
            )
        };

        let overall_score = score_checks(&connectivity, &schema, &data_integrity, &audit_system);
        let is_valid = connectivity.connected
            && schema.is_valid
            && data_integrity.is_valid
            && audit_system.is_valid;

        Ok(ValidationResult {
            connectivity,
            schema,
            data_integrity,
            audit_system,
            overall_score,
            is_valid,
            timestamp: now_ms(),
        })
    }

    pub async fn validate_database_connectivity(&self, env: &Environment) -> ConnectivityCheck {
        let started = Instant::now();
        match self.probe.connectivity(env).await {
            Ok(info) => ConnectivityCheck {
                connected: true,
                response_time_ms: started.elapsed().as_millis() as u64,
                version: info.version,
                error: None,
            },
            Err(err) => ConnectivityCheck {
                connected: false,
                response_time_ms: started.elapsed().as_millis() as u64,
                version: None,
                error: Some(err.to_string()),
            },
        }
    }

    pub async fn validate_schema(&self, env: &Environment) -> SchemaCheck {
        let schema = match self.probe.schema(env).await {
            Ok(schema) => schema,
            Err(err) => return SchemaCheck::unavailable(err.to_string()),
        };

        let found: BTreeSet<&str> = schema.tables.iter().map(|t| t.as_str()).collect();
        let expected: BTreeSet<&str> = EXPECTED_TABLES.iter().copied().collect();

        let missing_tables: Vec<String> = expected
            .iter()
            .filter(|t| !found.contains(**t))
            .map(|t| t.to_string())
            .collect();
        let extra_tables: Vec<String> = found
            .iter()
            .filter(|t| !expected.contains(**t))
            .map(|t| t.to_string())
            .collect();

        let mut tables_found: Vec<String> = schema.tables.clone();
        tables_found.sort();
        tables_found.dedup();

        SchemaCheck {
            is_valid: missing_tables.is_empty(),
            tables_found,
            missing_tables,
            extra_tables,
            functions_found: schema.functions.len() as u32,
            triggers_found: schema.triggers.len() as u32,
            policies_found: schema.policies.len() as u32,
            errors: Vec::new(),
        }
    }

    pub async fn validate_data_integrity(&self, env: &Environment) -> IntegrityCheck {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // A single unreadable table degrades to a warning with partial
        // counts rather than failing the whole check.
        let counts = join_all(CORE_TABLES.iter().map(|table| async move {
            (*table, self.probe.record_count(env, table).await)
        }))
        .await;
        let mut total_records = 0u64;
        for (table, result) in counts {
            match result {
                Ok(count) => total_records += count,
                Err(err) => {
                    warnings.push(format!("record count for '{}' unavailable: {}", table, err))
                }
            }
        }

        let mut orphaned_records = 0u64;
        for &(child, fk_column, parent) in FK_PAIRS {
            match self.probe.orphaned_count(env, child, fk_column, parent).await {
                Ok(count) => orphaned_records += count,
                Err(err) => errors.push(format!(
                    "orphan check for '{}.{}' -> '{}' failed: {}",
                    child, fk_column, parent, err
                )),
            }
        }

        let mut duplicate_records = 0u64;
        match self.probe.duplicate_count(env, "users", "email").await {
            Ok(count) => duplicate_records = count,
            Err(err) => warnings.push(format!("duplicate check for 'users.email' failed: {}", err)),
        }

        let mut null_violations = 0u64;
        for &(table, column) in CRITICAL_NOT_NULL {
            match self.probe.null_count(env, table, column).await {
                Ok(count) => null_violations += count,
                Err(err) => errors.push(format!(
                    "null check for '{}.{}' failed: {}",
                    table, column, err
                )),
            }
        }

        IntegrityCheck {
            is_valid: errors.is_empty() && orphaned_records == 0 && null_violations == 0,
            total_records,
            orphaned_records,
            duplicate_records,
            null_violations,
            errors,
            warnings,
        }
    }

    pub async fn validate_audit_system(&self, env: &Environment) -> AuditCheck {
        let audit = match self.probe.audit(env).await {
            Ok(audit) => audit,
            Err(err) => return AuditCheck::unavailable(err.to_string()),
        };

        let tables_present = !audit.audit_tables.is_empty();
        let triggers_present = !audit.audit_triggers.is_empty();
        let functions_present = !audit.audit_functions.is_empty();

        AuditCheck {
            is_valid: tables_present && triggers_present && functions_present,
            tables_present,
            triggers_present,
            functions_present,
            recent_activity: audit.recent_log_entries > 0,
            errors: Vec::new(),
        }
    }
}

/// Weighted score fusion: connectivity up to 35 (25 base + latency
/// bonuses), schema up to 30, integrity up to 25, audit up to 20,
/// clamped into [0, 100].
fn score_checks(
    connectivity: &ConnectivityCheck,
    schema: &SchemaCheck,
    integrity: &IntegrityCheck,
    audit: &AuditCheck,
) -> u8 {
    let mut score: i32 = 0;

    if connectivity.connected {
        score += 25;
        if connectivity.response_time_ms < 1000 {
            score += 5;
        }
        if connectivity.response_time_ms < 500 {
            score += 5;
        }
    }

    if schema.is_valid {
        score += 30;
    } else {
        let expected = EXPECTED_TABLES.len() as i32;
        let matched = expected - schema.missing_tables.len() as i32;
        score += (matched.max(0) * 30) / expected;
    }

    if integrity.is_valid {
        score += 25;
    } else {
        if integrity.orphaned_records == 0 {
            score += 8;
        }
        if integrity.null_violations == 0 {
            score += 8;
        }
        if integrity.errors.is_empty() {
            score += 9;
        }
    }

    if audit.is_valid {
        score += 20;
    } else {
        if audit.tables_present {
            score += 7;
        }
        if audit.triggers_present {
            score += 7;
        }
        if audit.functions_present {
            score += 6;
        }
    }

    score.clamp(0, 100) as u8
}
