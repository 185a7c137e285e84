//! Generic webhook notifier.

use async_trait::async_trait;
use reqwest::{Client, header::HeaderMap};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use super::{Notifier, default_enabled, default_timeout, send_checked};
use crate::Result;
use crate::notification::events::Notification;
use crate::utils::http_client::build_client;

/// Webhook channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Optional display name for this channel instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Whether the channel is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Webhook URL.
    pub url: String,
    /// HTTP method (default: POST).
    #[serde(default = "default_method")]
    pub method: String,
    /// Custom headers.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Authentication type.
    #[serde(default)]
    pub auth: Option<WebhookAuth>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_method() -> String {
    "POST".to_string()
}

/// Webhook authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WebhookAuth {
    /// Bearer token authentication.
    Bearer { token: String },
    /// Basic authentication.
    Basic { username: String, password: String },
    /// Custom header authentication.
    Header { name: String, value: String },
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            name: None,
            enabled: true,
            url: String::new(),
            method: default_method(),
            headers: Vec::new(),
            auth: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// Generic webhook notifier.
pub struct WebhookNotifier {
    name: String,
    config: WebhookConfig,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> Self {
        let client = build_client(config.timeout_secs);
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| "webhook".to_string());
        Self {
            name,
            config,
            client,
        }
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        for (name, value) in &self.config.headers {
            match (
                name.parse::<reqwest::header::HeaderName>(),
                value.parse::<reqwest::header::HeaderValue>(),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!(notifier = %self.name, header = %name, "Ignoring invalid header"),
            }
        }

        match &self.config.auth {
            Some(WebhookAuth::Bearer { token }) => {
                if let Ok(value) = format!("Bearer {}", token).parse() {
                    headers.insert(reqwest::header::AUTHORIZATION, value);
                }
            }
            Some(WebhookAuth::Header { name, value }) => {
                if let (Ok(name), Ok(value)) = (
                    name.parse::<reqwest::header::HeaderName>(),
                    value.parse::<reqwest::header::HeaderValue>(),
                ) {
                    headers.insert(name, value);
                }
            }
            // Applied on the request builder.
            Some(WebhookAuth::Basic { .. }) | None => {}
        }

        headers
    }

    fn notification_payload(&self, notification: &Notification) -> Value {
        let changes: Vec<Value> = notification
            .state_change()
            .diff()
            .into_iter()
            .map(|group| {
                json!({
                    "field": group[0].name(),
                    "values": group.iter().map(|v| v.value()).collect::<Vec<_>>(),
                })
            })
            .collect();

        json!({
            "event": "unit_state_changed",
            "kind": notification.kind(),
            "hostname": notification.hostname(),
            "unit": notification.unit().name(),
            "service_type": notification.unit().service_type(),
            "status": notification.status_text(),
            "message": notification.message(),
            "state": notification.current_state(),
            "changes": changes,
            "timestamp": notification.timestamp().to_rfc3339(),
        })
    }

    fn lifecycle_payload(&self, event: &str, hostname: &str) -> Value {
        json!({
            "event": event,
            "hostname": hostname,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })
    }

    async fn send(&self, payload: &Value) -> Result<()> {
        let mut request = match self.config.method.to_uppercase().as_str() {
            "PUT" => self.client.put(&self.config.url),
            _ => self.client.post(&self.config.url),
        };

        request = request.headers(self.build_headers()).json(payload);

        if let Some(WebhookAuth::Basic { username, password }) = &self.config.auth {
            request = request.basic_auth(username, Some(password));
        }

        send_checked(&self.name, request).await
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.send(&self.notification_payload(notification)).await
    }

    async fn notify_start(&self, hostname: &str) -> Result<()> {
        self.send(&self.lifecycle_payload("notifier_started", hostname))
            .await
    }

    async fn notify_stop(&self, hostname: &str) -> Result<()> {
        self.send(&self.lifecycle_payload("notifier_stopped", hostname))
            .await
    }
}
