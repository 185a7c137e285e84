//! Notifier channels.
//!
//! This module provides the destinations notifications are delivered to:
//! - Slack incoming webhooks
//! - Discord webhooks
//! - Generic webhooks (HTTP POST/PUT)

mod discord;
mod slack;
mod webhook;

pub use discord::{DiscordConfig, DiscordNotifier};
pub use slack::{SlackConfig, SlackNotifier};
pub use webhook::{WebhookAuth, WebhookConfig, WebhookNotifier};

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::events::Notification;
use crate::{Error, Result};

/// A destination for notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Identity used in logs.
    fn name(&self) -> &str;

    /// Deliver a classified unit transition.
    async fn notify(&self, notification: &Notification) -> Result<()>;

    /// Announce that monitoring has started.
    async fn notify_start(&self, hostname: &str) -> Result<()>;

    /// Announce that monitoring is stopping.
    async fn notify_stop(&self, hostname: &str) -> Result<()>;
}

/// Channel configuration wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChannelConfig {
    /// Slack incoming webhook.
    Slack(SlackConfig),
    /// Discord webhook.
    Discord(DiscordConfig),
    /// Generic webhook.
    Webhook(WebhookConfig),
}

impl ChannelConfig {
    /// Get the channel type name.
    pub fn channel_type(&self) -> &'static str {
        match self {
            Self::Slack(_) => "slack",
            Self::Discord(_) => "discord",
            Self::Webhook(_) => "webhook",
        }
    }

    /// Check if the channel is enabled.
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Slack(c) => c.enabled,
            Self::Discord(c) => c.enabled,
            Self::Webhook(c) => c.enabled,
        }
    }

    /// Optional human-friendly display name.
    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::Slack(c) => c.name.as_deref(),
            Self::Discord(c) => c.name.as_deref(),
            Self::Webhook(c) => c.name.as_deref(),
        }
    }

    /// Instantiate the configured notifier.
    pub fn build(&self) -> Arc<dyn Notifier> {
        match self {
            Self::Slack(c) => Arc::new(SlackNotifier::new(c.clone())),
            Self::Discord(c) => Arc::new(DiscordNotifier::new(c.clone())),
            Self::Webhook(c) => Arc::new(WebhookNotifier::new(c.clone())),
        }
    }
}

pub(crate) fn default_enabled() -> bool {
    true
}

pub(crate) fn default_timeout() -> u64 {
    30
}

/// Send `request`. Transport failures surface as [`Error::Http`], non-2xx
/// responses as [`Error::Notifier`].
pub(crate) async fn send_checked(notifier: &str, request: RequestBuilder) -> Result<()> {
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("{} webhook failed: {} - {}", notifier, status, body);
        return Err(Error::notifier(notifier, format!("{} - {}", status, body)));
    }

    debug!("{} notification sent", notifier);
    Ok(())
}
