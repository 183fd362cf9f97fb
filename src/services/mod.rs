// src/services/mod.rs

pub mod alerts;
pub mod health;
pub mod history;
pub mod monitoring;
pub mod notifications;
pub mod probes;
pub mod scheduler;
pub mod validation;

// Re-export main types for easy access
pub use alerts::{AlertManager, HealthAlert};
pub use health::{HealthEvaluator, HealthIssue, HealthStatus};
pub use history::{CurrentObservation, HealthReport, HealthTrend, HistoryStore, TrendMetric};
pub use monitoring::HealthMonitoringSystem;
pub use notifications::{
    AlertNotification, NotificationTarget, NotificationTransport, WebhookTransport,
};
pub use probes::{
    AuditProbe, ConnectivityProbe, DataProbe, FunctionalityResult, PerformanceMetrics,
    PerformanceSampler, ProductionSafetyGuard, ReadOnlyGuard, SchemaProbe,
};
pub use scheduler::MonitoringScheduler;
pub use validation::{
    AuditCheck, ConnectivityCheck, IntegrityCheck, SchemaCheck, ValidationEngine,
    ValidationResult, EXPECTED_TABLES,
};
