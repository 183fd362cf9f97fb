// src/services/notifications.rs
//
// Outbound notification transport consumed by the alert manager.
// Dispatch is fire-and-forget from the core's perspective: a failed
// delivery is logged by the caller, never propagated into a check.

use crate::types::AlertSeverity;
use crate::utils::{PulseError, PulseResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Delivery destination for an alert notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTarget {
    Webhook(String),
    Email(String),
}

impl NotificationTarget {
    pub fn describe(&self) -> String {
        match self {
            NotificationTarget::Webhook(url) => format!("webhook:{}", url),
            NotificationTarget::Email(address) => format!("email:{}", address),
        }
    }
}

/// Wire payload delivered for an escalated alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertNotification {
    pub alert_id: String,
    pub environment_id: String,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub timestamp: u64,
}

#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, target: &NotificationTarget, payload: &AlertNotification)
        -> PulseResult<()>;
}

/// HTTP transport posting the JSON payload to webhook targets. Email
/// targets need an email-capable transport supplied by the caller.
pub struct WebhookTransport {
    client: reqwest::Client,
}

impl WebhookTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for WebhookTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationTransport for WebhookTransport {
    async fn send(
        &self,
        target: &NotificationTarget,
        payload: &AlertNotification,
    ) -> PulseResult<()> {
        match target {
            NotificationTarget::Webhook(url) => {
                let response = self.client.post(url).json(payload).send().await?;
                if !response.status().is_success() {
                    return Err(PulseError::notification_error(format!(
                        "webhook '{}' answered {}",
                        url,
                        response.status()
                    ))
                    .with_status(response.status().as_u16()));
                }
                log::debug!(
                    "alert {} delivered to {}",
                    payload.alert_id,
                    target.describe()
                );
                Ok(())
            }
            NotificationTarget::Email(address) => Err(PulseError::notification_error(format!(
                "webhook transport cannot deliver email to '{}'",
                address
            ))),
        }
    }
}
