//! Slack incoming webhook notifier.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use super::{Notifier, default_enabled, default_timeout, send_checked};
use crate::Result;
use crate::notification::events::{Notification, NotificationKind};
use crate::utils::http_client::build_client;

/// Slack channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Optional display name for this channel instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the channel is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Slack incoming webhook URL.
    pub webhook_url: String,
    /// Channel override, e.g. `#ops`.
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub icon_emoji: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            name: None,
            enabled: true,
            webhook_url: String::new(),
            channel: None,
            username: None,
            icon_emoji: None,
            icon_url: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// Slack notifier.
pub struct SlackNotifier {
    name: String,
    config: SlackConfig,
    client: Client,
}

impl SlackNotifier {
    pub fn new(config: SlackConfig) -> Self {
        let client = build_client(config.timeout_secs);
        let name = config.name.clone().unwrap_or_else(|| "slack".to_string());
        Self {
            name,
            config,
            client,
        }
    }

    fn color(kind: NotificationKind) -> &'static str {
        match kind {
            NotificationKind::Alert => "danger",
            NotificationKind::Info => "#0099CC",
            NotificationKind::Ok => "good",
        }
    }

    fn fields(notification: &Notification) -> Vec<Value> {
        let mut fields = vec![
            json!({ "title": "Hostname", "value": notification.hostname(), "short": true }),
            json!({ "title": "Unit", "value": notification.unit().name(), "short": true }),
        ];
        fields.extend(notification.changed_fields().into_iter().map(|change| {
            json!({ "title": change.display_name(), "value": change.value(), "short": true })
        }));
        fields
    }

    fn build_payload(&self, text: &str, attachments: Vec<Value>) -> Value {
        let mut payload = json!({
            "text": text,
            "attachments": attachments,
        });

        let optional = [
            ("channel", &self.config.channel),
            ("username", &self.config.username),
            ("icon_emoji", &self.config.icon_emoji),
            ("icon_url", &self.config.icon_url),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                payload[key] = json!(value);
            }
        }

        payload
    }

    fn notification_payload(&self, notification: &Notification) -> Value {
        let attachment = json!({
            "fallback": notification.summary(),
            "color": Self::color(notification.kind()),
            "fields": Self::fields(notification),
        });
        self.build_payload(&notification.message(), vec![attachment])
    }

    fn lifecycle_payload(&self, message: &str, color: &str) -> Value {
        let attachment = json!({
            "fallback": message,
            "text": message,
            "color": color,
        });
        self.build_payload("", vec![attachment])
    }

    async fn ping(&self, payload: &Value) -> Result<()> {
        let request = self.client.post(&self.config.webhook_url).json(payload);
        send_checked(&self.name, request).await
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify(&self, notification: &Notification) -> Result<()> {
        let payload = self.notification_payload(notification);
        debug!("Sending slack notification with attachment: {}", payload["attachments"]);
        self.ping(&payload).await
    }

    async fn notify_start(&self, hostname: &str) -> Result<()> {
        let message = format!("SystemdNotifier is starting on {}", hostname);
        self.ping(&self.lifecycle_payload(&message, "good")).await
    }

    async fn notify_stop(&self, hostname: &str) -> Result<()> {
        let message = format!("SystemdNotifier is stopping on {}", hostname);
        self.ping(&self.lifecycle_payload(&message, "danger")).await
    }
}
