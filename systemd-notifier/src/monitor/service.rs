//! Monitor service.
//!
//! Owns the registered units, starts one listener task per unit, runs the
//! change dispatcher and announces start and stop through the notification
//! center.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use unit_state::UnitCategory;

use super::dispatcher::{ChangeDispatcher, ChangeHandler};
use super::events::{UnitId, event_queue};
use super::registry::{TrackedUnit, TrackedUnitRegistry};
use crate::config::UnitConfig;
use crate::listener::UnitListener;
use crate::notification::{Notification, NotificationCenter};
use crate::{Error, Result};

/// Default change handler: turns every important change into a
/// [`Notification`] and fans it out.
pub struct NotifyingHandler {
    hostname: String,
    center: Arc<NotificationCenter>,
}

impl NotifyingHandler {
    pub fn new(hostname: impl Into<String>, center: Arc<NotificationCenter>) -> Self {
        Self {
            hostname: hostname.into(),
            center,
        }
    }
}

#[async_trait]
impl ChangeHandler for NotifyingHandler {
    async fn on_important_change(&self, unit: &TrackedUnit) -> Result<()> {
        let state = unit.current_state();
        debug!(
            "[{}] {}: {} {}",
            unit.name(),
            unit.state_change().status_text(),
            state.active(),
            state.status()
        );
        debug!("[{}]\n{}", unit.name(), unit.state_change());

        let summary = self
            .center
            .notify(Notification::new(&self.hostname, unit))
            .await;
        debug!(
            unit = %unit.unit(),
            delivered = summary.delivered,
            failed = summary.failed.len(),
            "Notification dispatched"
        );
        Ok(())
    }
}

/// Watches a set of units and notifies on important transitions.
pub struct Monitor {
    hostname: String,
    listener: Arc<dyn UnitListener>,
    center: Arc<NotificationCenter>,
    units: Vec<(UnitId, UnitCategory)>,
    handler: Option<Arc<dyn ChangeHandler>>,
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("hostname", &self.hostname)
            .field("units", &self.units)
            .finish_non_exhaustive()
    }
}

impl Monitor {
    pub fn new(
        hostname: impl Into<String>,
        listener: Arc<dyn UnitListener>,
        center: Arc<NotificationCenter>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            listener,
            center,
            units: Vec::new(),
            handler: None,
        }
    }

    /// Replace the default [`NotifyingHandler`].
    pub fn with_handler(mut self, handler: Arc<dyn ChangeHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn units(&self) -> &[(UnitId, UnitCategory)] {
        &self.units
    }

    /// Resolve and register one unit.
    ///
    /// The category comes from the configured override, otherwise from the
    /// unit's service type.
    pub async fn register_unit(&mut self, config: &UnitConfig) -> Result<&mut Self> {
        let unit = self.listener.resolve(config.name()).await?;
        let category = config
            .category()
            .unwrap_or_else(|| UnitCategory::from_service_type(unit.service_type()));
        debug!(unit = %unit, category = category.as_str(), "Registered unit");
        self.units.push((unit, category));
        Ok(self)
    }

    pub async fn register_units(&mut self, configs: &[UnitConfig]) -> Result<&mut Self> {
        for config in configs {
            self.register_unit(config).await?;
        }
        Ok(self)
    }

    /// Run until `shutdown` resolves or every listener has finished.
    ///
    /// Queued snapshots are drained before returning. The final tracked
    /// state is returned for inspection.
    pub async fn run<F>(self, shutdown: F) -> Result<TrackedUnitRegistry>
    where
        F: Future<Output = ()> + Send,
    {
        let Self {
            hostname,
            listener,
            center,
            units,
            handler,
        } = self;

        info!("Monitoring changes to {} units", units.len());
        for (unit, category) in &units {
            debug!(" - {} [{}]", unit, category.as_str());
        }

        center.notify_start(&hostname).await;

        let handler = handler.unwrap_or_else(|| {
            Arc::new(NotifyingHandler::new(hostname.clone(), Arc::clone(&center)))
        });

        let (tx, rx) = event_queue();
        let dispatcher = tokio::spawn(ChangeDispatcher::new(rx, handler).run());

        let cancel = CancellationToken::new();
        let mut listeners = JoinSet::new();
        for (unit, category) in units {
            let listener = Arc::clone(&listener);
            let events = tx.clone();
            let token = cancel.child_token();
            listeners.spawn(async move {
                if let Err(e) = listener.listen(unit.clone(), category, events, token).await {
                    error!(unit = %unit, error = %e, "Unit listener failed");
                }
            });
        }
        // Listeners hold the only senders; the dispatcher stops once they are gone.
        drop(tx);

        tokio::select! {
            _ = shutdown => info!("Shutdown requested"),
            _ = async {
                while let Some(result) = listeners.join_next().await {
                    if let Err(e) = result {
                        warn!("Unit listener task join error: {}", e);
                    }
                }
            } => info!("All unit listeners finished"),
        }

        cancel.cancel();
        listeners.shutdown().await;

        let registry = dispatcher
            .await
            .map_err(|e| Error::Other(format!("Change dispatcher task failed: {}", e)));

        center.notify_stop(&hostname).await;

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::EventSender;
    use async_trait::async_trait;

    struct StaticListener;

    #[async_trait]
    impl UnitListener for StaticListener {
        async fn resolve(&self, name: &str) -> Result<UnitId> {
            match name {
                "backup" => Ok(UnitId::new("backup.service").with_service_type("oneshot")),
                "missing" => Err(Error::UnknownUnit("missing.service".to_string())),
                other => Ok(UnitId::new(format!("{}.service", other)).with_service_type("simple")),
            }
        }

        async fn listen(
            &self,
            _unit: UnitId,
            _category: UnitCategory,
            _events: EventSender,
            _cancel: CancellationToken,
        ) -> Result<()> {
            Ok(())
        }
    }

    fn monitor() -> Monitor {
        Monitor::new(
            "web-1",
            Arc::new(StaticListener),
            Arc::new(NotificationCenter::new()),
        )
    }

    #[tokio::test]
    async fn test_register_units_detects_category() {
        let mut monitor = monitor();
        monitor
            .register_units(&[
                UnitConfig::Name("nginx".to_string()),
                UnitConfig::Name("backup".to_string()),
                UnitConfig::Detailed {
                    name: "worker".to_string(),
                    category: Some(UnitCategory::OneShot),
                },
            ])
            .await
            .unwrap();

        let categories: Vec<_> = monitor.units().iter().map(|(_, c)| *c).collect();
        assert_eq!(
            categories,
            vec![
                UnitCategory::Default,
                UnitCategory::OneShot,
                UnitCategory::OneShot
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_unit_aborts_registration() {
        let mut monitor = monitor();
        let err = monitor
            .register_unit(&UnitConfig::Name("missing".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownUnit(_)));
        assert!(monitor.units().is_empty());
    }

    #[tokio::test]
    async fn test_run_returns_when_listeners_finish() {
        let mut monitor = monitor();
        monitor
            .register_unit(&UnitConfig::Name("nginx".to_string()))
            .await
            .unwrap();

        let registry = monitor.run(std::future::pending()).await.unwrap();
        assert!(registry.is_empty());
    }
}
