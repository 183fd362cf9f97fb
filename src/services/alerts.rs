// src/services/alerts.rs
//
// Converts health issues into deduplicated, lifecycle-managed alerts
// and applies escalation rules. Active alerts are keyed per environment
// by the originating issue's category+title; a resolved alert may
// reappear later as a new alert.

use crate::services::health::HealthIssue;
use crate::services::notifications::{
    AlertNotification, NotificationTarget, NotificationTransport,
};
use crate::types::{AlertSeverity, AlertingConfig, EscalationAction, IssueCategory};
use crate::utils::{now_ms, LogLevel, Logger};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Operator-facing alert derived from one detected issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthAlert {
    pub id: String,
    pub environment_id: String,
    pub severity: AlertSeverity,
    pub category: IssueCategory,
    pub title: String,
    pub message: String,
    pub timestamp: u64,
    pub last_seen: u64,
    pub acknowledged: bool,
    pub resolved_at: Option<u64>,
}

impl HealthAlert {
    fn from_issue(environment_id: &str, issue: &HealthIssue) -> Self {
        let now = now_ms();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            environment_id: environment_id.to_string(),
            severity: AlertSeverity::from(issue.severity),
            category: issue.category,
            title: issue.title.clone(),
            message: issue.description.clone(),
            timestamp: now,
            last_seen: now,
            acknowledged: false,
            resolved_at: None,
        }
    }

    /// Dedup key within one environment; mirrors `HealthIssue::key`.
    fn key(&self) -> String {
        format!("{}:{}", self.category.as_str(), self.title)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }
}

pub struct AlertManager {
    config: AlertingConfig,
    active_alerts: Arc<RwLock<HashMap<String, Vec<HealthAlert>>>>,
    transport: Arc<dyn NotificationTransport>,
    logger: Logger,
}

impl AlertManager {
    pub fn new(config: AlertingConfig, transport: Arc<dyn NotificationTransport>) -> Self {
        Self {
            config,
            active_alerts: Arc::new(RwLock::new(HashMap::new())),
            transport,
            logger: Logger::new(LogLevel::Info),
        }
    }

    /// Reconciles the current issue set against the environment's active
    /// alerts. Returns the alerts created by this pass, for escalation.
    pub async fn reconcile(
        &self,
        environment_id: &str,
        issues: &[HealthIssue],
    ) -> Vec<HealthAlert> {
        if !self.config.enabled {
            return Vec::new();
        }

        let mut created = Vec::new();
        let mut alerts = self.active_alerts.write().await;
        let entries = alerts.entry(environment_id.to_string()).or_default();
        let now = now_ms();

        for issue in issues {
            let key = issue.key();
            match entries
                .iter_mut()
                .find(|a| a.resolved_at.is_none() && a.key() == key)
            {
                Some(existing) => {
                    existing.last_seen = now;
                }
                None => {
                    let alert = HealthAlert::from_issue(environment_id, issue);
                    self.logger.warn_with_meta(
                        "alert created",
                        Some(&serde_json::json!({
                            "environment_id": environment_id,
                            "alert_id": alert.id,
                            "severity": alert.severity.as_str(),
                            "title": alert.title,
                        })),
                    );
                    entries.push(alert.clone());
                    created.push(alert);
                }
            }
        }

        created
    }

    /// Applies escalation rules to newly created alerts. Dispatch runs
    /// on detached tasks after the rule's delay; transport failures are
    /// logged and never fail the health check.
    pub async fn escalate(&self, new_alerts: &[HealthAlert]) {
        if !self.config.enabled {
            return;
        }

        for alert in new_alerts {
            for rule in self
                .config
                .escalation_rules
                .iter()
                .filter(|r| r.condition == alert.severity)
            {
                if rule.action == EscalationAction::Email && !self.config.email_notifications {
                    self.logger.debug(&format!(
                        "email escalation for alert '{}' skipped: email notifications disabled",
                        alert.id
                    ));
                    continue;
                }

                let notification = AlertNotification {
                    alert_id: alert.id.clone(),
                    environment_id: alert.environment_id.clone(),
                    severity: alert.severity,
                    title: alert.title.clone(),
                    message: alert.message.clone(),
                    timestamp: alert.timestamp,
                };
                let transport = Arc::clone(&self.transport);
                let rule = rule.clone();
                let fallback_webhook = self.config.webhook_url.clone();

                tokio::spawn(async move {
                    if rule.delay_ms > 0 {
                        tokio::time::sleep(std::time::Duration::from_millis(rule.delay_ms)).await;
                    }
                    let targets: Vec<NotificationTarget> = match rule.action {
                        EscalationAction::Webhook => {
                            let urls = if rule.recipients.is_empty() {
                                fallback_webhook.into_iter().collect()
                            } else {
                                rule.recipients.clone()
                            };
                            urls.into_iter().map(NotificationTarget::Webhook).collect()
                        }
                        EscalationAction::Email => rule
                            .recipients
                            .iter()
                            .cloned()
                            .map(NotificationTarget::Email)
                            .collect(),
                        EscalationAction::Pause | EscalationAction::Rollback => {
                            log::warn!(
                                "escalation action '{}' for alert '{}' requires operator action",
                                rule.action.as_str(),
                                notification.alert_id
                            );
                            Vec::new()
                        }
                    };
                    for target in targets {
                        if let Err(err) = transport.send(&target, &notification).await {
                            log::warn!(
                                "alert notification to {} failed: {}",
                                target.describe(),
                                err
                            );
                        }
                    }
                });
            }
        }
    }

    /// Unresolved alerts for an environment, newest last.
    pub async fn active(&self, environment_id: &str) -> Vec<HealthAlert> {
        let alerts = self.active_alerts.read().await;
        alerts
            .get(environment_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|a| !a.is_resolved())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Idempotent; unknown ids are a no-op.
    pub async fn acknowledge(&self, environment_id: &str, alert_id: &str) {
        let mut alerts = self.active_alerts.write().await;
        if let Some(alert) = alerts
            .get_mut(environment_id)
            .and_then(|entries| entries.iter_mut().find(|a| a.id == alert_id))
        {
            alert.acknowledged = true;
        }
    }

    /// Idempotent; an already-resolved alert keeps its original
    /// resolution time, unknown ids are a no-op.
    pub async fn resolve(&self, environment_id: &str, alert_id: &str) {
        let mut alerts = self.active_alerts.write().await;
        if let Some(alert) = alerts
            .get_mut(environment_id)
            .and_then(|entries| entries.iter_mut().find(|a| a.id == alert_id))
        {
            if alert.resolved_at.is_none() {
                alert.resolved_at = Some(now_ms());
            }
        }
    }

    /// Drops resolved alerts older than the cutoff. Active alerts are
    /// never pruned.
    pub async fn prune_resolved(&self, cutoff_ms: u64) {
        let mut alerts = self.active_alerts.write().await;
        for entries in alerts.values_mut() {
            entries.retain(|a| match a.resolved_at {
                Some(resolved_at) => resolved_at >= cutoff_ms,
                None => true,
            });
        }
    }
}
