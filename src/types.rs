// src/types.rs

use crate::utils::{PulseError, PulseResult};
use serde::{Deserialize, Serialize};

/// A remote, database-backed deployment target being assessed.
///
/// Owned by the caller; the core never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    pub name: String,
    pub connection: ConnectionParams,
    pub production: bool,
}

impl Environment {
    pub fn new(id: impl Into<String>, name: impl Into<String>, connection: ConnectionParams) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            connection,
            production: false,
        }
    }

    pub fn production(mut self) -> Self {
        self.production = true;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionParams {
    pub base_url: String,
    pub database: Option<String>,
    pub api_key: Option<String>,
}

impl ConnectionParams {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            database: None,
            api_key: None,
        }
    }
}

/// Wall-clock windows for history retrieval and trend computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    LastHour,
    LastDay,
    LastWeek,
    LastMonth,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::LastHour => "1h",
            Timeframe::LastDay => "24h",
            Timeframe::LastWeek => "7d",
            Timeframe::LastMonth => "30d",
        }
    }

    pub fn duration_ms(&self) -> u64 {
        match self {
            Timeframe::LastHour => 60 * 60 * 1000,
            Timeframe::LastDay => 24 * 60 * 60 * 1000,
            Timeframe::LastWeek => 7 * 24 * 60 * 60 * 1000,
            Timeframe::LastMonth => 30 * 24 * 60 * 60 * 1000,
        }
    }

    /// Window start relative to `now`, saturating at the epoch.
    pub fn cutoff_from(&self, now: u64) -> u64 {
        now.saturating_sub(self.duration_ms())
    }
}

/// Severity of a detected deficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl IssueSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueSeverity::Low => "low",
            IssueSeverity::Medium => "medium",
            IssueSeverity::High => "high",
            IssueSeverity::Critical => "critical",
        }
    }
}

/// Dimension a deficiency was detected in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Connectivity,
    Performance,
    Data,
    Security,
    Functionality,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::Connectivity => "connectivity",
            IssueCategory::Performance => "performance",
            IssueCategory::Data => "data",
            IssueCategory::Security => "security",
            IssueCategory::Functionality => "functionality",
        }
    }
}

/// Operator-facing alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Error => "error",
            AlertSeverity::Critical => "critical",
        }
    }

    pub fn priority_score(&self) -> u8 {
        match self {
            AlertSeverity::Info => 1,
            AlertSeverity::Warning => 2,
            AlertSeverity::Error => 3,
            AlertSeverity::Critical => 4,
        }
    }
}

impl From<IssueSeverity> for AlertSeverity {
    fn from(severity: IssueSeverity) -> Self {
        match severity {
            IssueSeverity::Low => AlertSeverity::Info,
            IssueSeverity::Medium => AlertSeverity::Warning,
            IssueSeverity::High => AlertSeverity::Error,
            IssueSeverity::Critical => AlertSeverity::Critical,
        }
    }
}

/// Categorical health status of an environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Warning,
    Critical,
    Unknown,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Healthy => "healthy",
            HealthState::Warning => "warning",
            HealthState::Critical => "critical",
            HealthState::Unknown => "unknown",
        }
    }

    /// Banding used after penalties are applied; `Unknown` is only ever
    /// produced explicitly when evaluation itself failed.
    pub fn from_score(score: u8) -> Self {
        if score >= 80 {
            HealthState::Healthy
        } else if score >= 50 {
            HealthState::Warning
        } else {
            HealthState::Critical
        }
    }

    pub fn is_operational(&self) -> bool {
        matches!(self, HealthState::Healthy | HealthState::Warning)
    }
}

/// Directional summary of a metric over a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Degrading,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Stable => "stable",
            TrendDirection::Degrading => "degrading",
        }
    }
}

/// Escalation action taken when an alert matches a rule's condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationAction {
    Webhook,
    Email,
    Pause,
    Rollback,
}

impl EscalationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationAction::Webhook => "webhook",
            EscalationAction::Email => "email",
            EscalationAction::Pause => "pause",
            EscalationAction::Rollback => "rollback",
        }
    }
}

/// Policy mapping an alert severity to a delayed notification action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationRule {
    pub condition: AlertSeverity,
    pub delay_ms: u64,
    pub action: EscalationAction,
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceThresholds {
    pub response_time_ms: f64,
    pub error_rate: f64,
    pub throughput: f64,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            response_time_ms: 1000.0,
            error_rate: 5.0,
            throughput: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertingConfig {
    pub enabled: bool,
    pub email_notifications: bool,
    pub webhook_url: Option<String>,
    pub escalation_rules: Vec<EscalationRule>,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            email_notifications: false,
            webhook_url: None,
            escalation_rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    pub metrics_retention_days: u32,
    pub alerts_retention_days: u32,
    pub reports_retention_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            metrics_retention_days: 7,
            alerts_retention_days: 30,
            reports_retention_days: 90,
        }
    }
}

/// Monitor-instance configuration, immutable after construction.
///
/// Changing any knob means building a new monitor instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub check_interval_ms: u64,
    pub performance_thresholds: PerformanceThresholds,
    pub alerting: AlertingConfig,
    pub retention: RetentionConfig,
    pub include_functionality_checks: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 5 * 60 * 1000,
            performance_thresholds: PerformanceThresholds::default(),
            alerting: AlertingConfig::default(),
            retention: RetentionConfig::default(),
            include_functionality_checks: false,
        }
    }
}

impl MonitoringConfig {
    pub fn validate(&self) -> PulseResult<()> {
        if self.check_interval_ms == 0 {
            return Err(PulseError::configuration_error(
                "check_interval_ms must be greater than zero",
            ));
        }
        if let Some(webhook_url) = &self.alerting.webhook_url {
            url::Url::parse(webhook_url).map_err(|err| {
                PulseError::configuration_error(format!(
                    "invalid alerting webhook URL '{}': {}",
                    webhook_url, err
                ))
            })?;
        }
        for rule in &self.alerting.escalation_rules {
            if rule.action == EscalationAction::Webhook
                && rule.recipients.is_empty()
                && self.alerting.webhook_url.is_none()
            {
                return Err(PulseError::configuration_error(format!(
                    "webhook escalation rule for severity '{}' has no recipients and no fallback webhook_url",
                    rule.condition.as_str()
                )));
            }
        }
        Ok(())
    }
}
