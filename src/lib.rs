//! envpulse — continuous health assessment for remote data-backed
//! environments.
//!
//! The crate validates a hosted database-plus-API target across four
//! dimensions (connectivity, schema, data integrity, audit system),
//! fuses the result with live performance metrics into a weighted
//! health score, manages the derived alert lifecycle with escalation,
//! and keeps a per-environment report history with trend analysis and
//! retention-based cleanup.
//!
//! Concrete probing, performance sampling, production gating, and
//! notification delivery are supplied by the caller through the traits
//! in [`services::probes`] and [`services::notifications`].

// Module declarations
pub mod services;
pub mod types;
pub mod utils;

// Re-export the public surface at the crate root
pub use services::{
    AlertManager, AlertNotification, AuditCheck, AuditProbe, ConnectivityCheck,
    ConnectivityProbe, CurrentObservation, DataProbe, FunctionalityResult, HealthAlert,
    HealthEvaluator, HealthIssue, HealthMonitoringSystem, HealthReport, HealthStatus,
    HealthTrend, HistoryStore, IntegrityCheck, MonitoringScheduler, NotificationTarget,
    NotificationTransport, PerformanceMetrics, PerformanceSampler, ProductionSafetyGuard,
    ReadOnlyGuard, SchemaCheck, SchemaProbe, TrendMetric, ValidationEngine, ValidationResult,
    WebhookTransport, EXPECTED_TABLES,
};
pub use types::{
    AlertSeverity, AlertingConfig, ConnectionParams, Environment, EscalationAction,
    EscalationRule, HealthState, IssueCategory, IssueSeverity, MonitoringConfig,
    PerformanceThresholds, RetentionConfig, Timeframe, TrendDirection,
};
pub use utils::{ErrorKind, PulseError, PulseResult};
