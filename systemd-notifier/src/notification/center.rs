//! Notification fan-out.
//!
//! Every call spawns one task per registered notifier and waits for all of
//! them. A failing, panicking or (when a timeout is configured) hanging
//! notifier is logged and counted; it never affects the other notifiers or
//! the caller.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::channels::{ChannelConfig, Notifier};
use super::events::Notification;
use crate::{Error, Result};

/// Outcome of one fan-out call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Number of notifiers that completed successfully.
    pub delivered: usize,
    /// Names of notifiers that failed.
    pub failed: Vec<String>,
}

impl DispatchSummary {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed.len()
    }

    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Registered notifiers plus the fan-out policy.
#[derive(Default)]
pub struct NotificationCenter {
    notifiers: Vec<Arc<dyn Notifier>>,
    timeout: Option<Duration>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every notifier invocation by `timeout`. `None` waits forever.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self {
            notifiers: Vec::new(),
            timeout,
        }
    }

    /// Build the enabled channels of `channels`.
    pub fn from_config(channels: &[ChannelConfig], timeout: Option<Duration>) -> Self {
        let mut center = Self::with_timeout(timeout);
        for config in channels {
            if !config.is_enabled() {
                debug!(channel = config.channel_type(), "Skipping disabled notifier");
                continue;
            }
            let notifier = config.build();
            info!(
                notifier = notifier.name(),
                channel = config.channel_type(),
                "Initialized notifier"
            );
            center.add_notifier(notifier);
        }
        info!(
            "Notification center initialized with {} notifiers",
            center.len()
        );
        center
    }

    pub fn add_notifier(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub fn notifier_names(&self) -> Vec<String> {
        self.notifiers.iter().map(|n| n.name().to_string()).collect()
    }

    /// Deliver a classified transition to every notifier.
    pub async fn notify(&self, notification: Notification) -> DispatchSummary {
        let notification = Arc::new(notification);
        let unit = notification.unit().to_string();
        self.for_each_notifier("notify", move |notifier| {
            let notification = Arc::clone(&notification);
            let unit = unit.clone();
            async move {
                debug!("Notifying state change of {} via {}", unit, notifier.name());
                notifier.notify(&notification).await
            }
        })
        .await
    }

    /// Announce that monitoring has started on `hostname`.
    pub async fn notify_start(&self, hostname: &str) -> DispatchSummary {
        info!("Systemd Notifier started.");
        let hostname = hostname.to_string();
        self.for_each_notifier("notify_start", move |notifier| {
            let hostname = hostname.clone();
            async move {
                debug!("Notifying systemd-notifier start via {}", notifier.name());
                notifier.notify_start(&hostname).await
            }
        })
        .await
    }

    /// Announce that monitoring is stopping on `hostname`.
    pub async fn notify_stop(&self, hostname: &str) -> DispatchSummary {
        info!("Systemd Notifier stopped.");
        let hostname = hostname.to_string();
        self.for_each_notifier("notify_stop", move |notifier| {
            let hostname = hostname.clone();
            async move {
                debug!("Notifying systemd-notifier stop via {}", notifier.name());
                notifier.notify_stop(&hostname).await
            }
        })
        .await
    }

    async fn for_each_notifier<F, Fut>(&self, operation: &'static str, call: F) -> DispatchSummary
    where
        F: Fn(Arc<dyn Notifier>) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let mut tasks = JoinSet::new();

        for notifier in &self.notifiers {
            let name = notifier.name().to_string();
            let invocation = call(Arc::clone(notifier));
            let timeout = self.timeout;

            tasks.spawn(async move {
                let guarded = AssertUnwindSafe(invocation).catch_unwind();
                let outcome = match timeout {
                    Some(limit) => match tokio::time::timeout(limit, guarded).await {
                        Ok(outcome) => outcome,
                        Err(_) => Ok(Err(Error::notifier(
                            &name,
                            format!("{} timed out after {:?}", operation, limit),
                        ))),
                    },
                    None => guarded.await,
                };

                let result = outcome.unwrap_or_else(|_| {
                    Err(Error::notifier(&name, format!("{} panicked", operation)))
                });
                (name, result)
            });
        }

        let mut summary = DispatchSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => summary.delivered += 1,
                Ok((name, Err(e))) => {
                    error!(notifier = %name, error = %e, "Failed to send notification via {}", name);
                    summary.failed.push(name);
                }
                Err(e) => {
                    // Only reachable if the runtime cancels the task.
                    warn!("Notifier task join error: {}", e);
                    summary.failed.push("<unknown>".to_string());
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::UnitId;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use unit_state::{State, StateChange, UnitCategory};

    #[derive(Clone, Copy, PartialEq)]
    enum Behavior {
        Succeed,
        Fail,
        Panic,
        Hang,
    }

    struct TestNotifier {
        name: String,
        behavior: Behavior,
        calls: AtomicUsize,
        hosts: Mutex<Vec<String>>,
    }

    impl TestNotifier {
        fn new(name: &str, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                behavior,
                calls: AtomicUsize::new(0),
                hosts: Mutex::new(Vec::new()),
            })
        }

        async fn act(&self, host: &str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.hosts.lock().unwrap().push(host.to_string());
            match self.behavior {
                Behavior::Succeed => Ok(()),
                Behavior::Fail => Err(Error::notifier(&self.name, "forced failure")),
                Behavior::Panic => panic!("notifier exploded"),
                Behavior::Hang => {
                    std::future::pending::<()>().await;
                    Ok(())
                }
            }
        }
    }

    #[async_trait]
    impl Notifier for TestNotifier {
        fn name(&self) -> &str {
            &self.name
        }

        async fn notify(&self, notification: &Notification) -> Result<()> {
            self.act(notification.hostname()).await
        }

        async fn notify_start(&self, hostname: &str) -> Result<()> {
            self.act(hostname).await
        }

        async fn notify_stop(&self, hostname: &str) -> Result<()> {
            self.act(hostname).await
        }
    }

    fn notification() -> Notification {
        let mut change = StateChange::new(State::new(
            UnitCategory::Default,
            "active",
            "running",
            "loaded",
            "enabled",
        ));
        change.record(State::new(
            UnitCategory::Default,
            "failed",
            "failed",
            "loaded",
            "enabled",
        ));
        Notification::from_parts("web-1", UnitId::new("nginx.service"), change)
    }

    #[tokio::test]
    async fn test_failing_notifier_is_isolated() {
        let first = TestNotifier::new("first", Behavior::Succeed);
        let second = TestNotifier::new("second", Behavior::Fail);
        let third = TestNotifier::new("third", Behavior::Succeed);

        let mut center = NotificationCenter::new();
        center.add_notifier(first.clone());
        center.add_notifier(second.clone());
        center.add_notifier(third.clone());

        let summary = center.notify(notification()).await;

        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
        assert_eq!(third.calls.load(Ordering::SeqCst), 1);
        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.failed, vec!["second".to_string()]);
        assert_eq!(summary.attempted(), 3);
    }

    #[tokio::test]
    async fn test_panicking_notifier_is_isolated() {
        let ok = TestNotifier::new("ok", Behavior::Succeed);
        let boom = TestNotifier::new("boom", Behavior::Panic);

        let mut center = NotificationCenter::new();
        center.add_notifier(boom.clone());
        center.add_notifier(ok.clone());

        let summary = center.notify_start("web-1").await;

        assert_eq!(ok.calls.load(Ordering::SeqCst), 1);
        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.failed, vec!["boom".to_string()]);
    }

    #[tokio::test]
    async fn test_timeout_bounds_hanging_notifier() {
        let ok = TestNotifier::new("ok", Behavior::Succeed);
        let stuck = TestNotifier::new("stuck", Behavior::Hang);

        let mut center = NotificationCenter::with_timeout(Some(Duration::from_millis(50)));
        center.add_notifier(stuck.clone());
        center.add_notifier(ok.clone());

        let summary = center.notify_stop("web-1").await;

        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.failed, vec!["stuck".to_string()]);
    }

    #[tokio::test]
    async fn test_lifecycle_hooks_receive_hostname() {
        let a = TestNotifier::new("a", Behavior::Succeed);
        let b = TestNotifier::new("b", Behavior::Succeed);

        let mut center = NotificationCenter::new();
        center.add_notifier(a.clone());
        center.add_notifier(b.clone());

        assert!(center.notify_start("db-2").await.all_delivered());
        assert!(center.notify_stop("db-2").await.all_delivered());

        assert_eq!(*a.hosts.lock().unwrap(), vec!["db-2", "db-2"]);
        assert_eq!(*b.hosts.lock().unwrap(), vec!["db-2", "db-2"]);
    }

    #[tokio::test]
    async fn test_no_notifiers() {
        let center = NotificationCenter::new();
        let summary = center.notify(notification()).await;
        assert_eq!(summary, DispatchSummary::default());
    }

    #[test]
    fn test_from_config_skips_disabled() {
        let channels: Vec<ChannelConfig> = serde_json::from_value(serde_json::json!([
            { "type": "webhook", "url": "https://example.com/a" },
            { "type": "webhook", "url": "https://example.com/b", "enabled": false },
            { "type": "slack", "webhook_url": "https://hooks.slack.com/x", "name": "ops" },
        ]))
        .unwrap();

        let center = NotificationCenter::from_config(&channels, None);
        assert_eq!(center.len(), 2);
        assert_eq!(center.notifier_names(), vec!["webhook", "ops"]);
    }
}
