//! Discord webhook notifier.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{Notifier, default_enabled, default_timeout, send_checked};
use crate::Result;
use crate::notification::events::{Notification, NotificationKind};
use crate::utils::http_client::build_client;

/// Discord channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Optional display name for this channel instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the channel is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Discord webhook URL.
    pub webhook_url: String,
    /// Optional username for the webhook.
    #[serde(default)]
    pub username: Option<String>,
    /// Optional avatar URL for the webhook.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            name: None,
            enabled: true,
            webhook_url: String::new(),
            username: Some("systemd-notifier".to_string()),
            avatar_url: None,
            timeout_secs: default_timeout(),
        }
    }
}

const COLOR_GREEN: u32 = 0x2ecc71;
const COLOR_BLUE: u32 = 0x3498db;
const COLOR_RED: u32 = 0xe74c3c;

/// Discord notifier.
pub struct DiscordNotifier {
    name: String,
    config: DiscordConfig,
    client: Client,
}

impl DiscordNotifier {
    pub fn new(config: DiscordConfig) -> Self {
        let client = build_client(config.timeout_secs);
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| "discord".to_string());
        Self {
            name,
            config,
            client,
        }
    }

    fn get_color(kind: NotificationKind) -> u32 {
        match kind {
            NotificationKind::Ok => COLOR_GREEN,
            NotificationKind::Info => COLOR_BLUE,
            NotificationKind::Alert => COLOR_RED,
        }
    }

    fn wrap(&self, embed: Value) -> Value {
        let mut payload = json!({ "embeds": [embed] });

        if let Some(username) = &self.config.username {
            payload["username"] = json!(username);
        }
        if let Some(avatar_url) = &self.config.avatar_url {
            payload["avatar_url"] = json!(avatar_url);
        }

        payload
    }

    fn notification_payload(&self, notification: &Notification) -> Value {
        let fields: Vec<Value> = notification
            .changed_fields()
            .into_iter()
            .map(|change| {
                json!({ "name": change.display_name(), "value": change.value(), "inline": true })
            })
            .collect();

        self.wrap(json!({
            "title": notification.message(),
            "description": notification.description(),
            "color": Self::get_color(notification.kind()),
            "timestamp": notification.timestamp().to_rfc3339(),
            "fields": fields,
            "footer": {
                "text": format!("Host: {} | Kind: {}", notification.hostname(), notification.kind())
            }
        }))
    }

    fn lifecycle_payload(&self, message: &str, color: u32) -> Value {
        self.wrap(json!({
            "title": message,
            "color": color,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }

    async fn post(&self, payload: &Value) -> Result<()> {
        let request = self.client.post(&self.config.webhook_url).json(payload);
        send_checked(&self.name, request).await
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.post(&self.notification_payload(notification)).await
    }

    async fn notify_start(&self, hostname: &str) -> Result<()> {
        let message = format!("SystemdNotifier is starting on {}", hostname);
        self.post(&self.lifecycle_payload(&message, COLOR_GREEN))
            .await
    }

    async fn notify_stop(&self, hostname: &str) -> Result<()> {
        let message = format!("SystemdNotifier is stopping on {}", hostname);
        self.post(&self.lifecycle_payload(&message, COLOR_RED)).await
    }
}
