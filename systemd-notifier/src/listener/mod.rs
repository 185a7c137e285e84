//! Unit state sources.

mod dbus;
mod properties;
mod systemctl;

pub use dbus::DbusListener;
pub use properties::{STATE_PROPERTIES, UnitProperties, normalize_unit_name};
pub use systemctl::SystemctlListener;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use unit_state::UnitCategory;

use crate::Result;
use crate::monitor::{EventSender, UnitId};

/// Produces state snapshots for systemd units.
#[async_trait]
pub trait UnitListener: Send + Sync {
    /// Look up a unit by name.
    ///
    /// Fails with [`crate::Error::UnknownUnit`] when systemd does not know it.
    async fn resolve(&self, name: &str) -> Result<UnitId>;

    /// Enqueue the unit's current snapshot, then a new snapshot on every
    /// change, until `cancel` fires or the queue closes.
    async fn listen(
        &self,
        unit: UnitId,
        category: UnitCategory,
        events: EventSender,
        cancel: CancellationToken,
    ) -> Result<()>;
}

/// Which listener implementation to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerBackend {
    /// `PropertiesChanged` signals on the system bus.
    #[default]
    Dbus,
    /// Poll `systemctl show`.
    Systemctl,
}

/// Build the listener for `backend`.
///
/// Falls back to polling when the system bus cannot be reached.
pub async fn connect(backend: ListenerBackend, poll_interval: Duration) -> Arc<dyn UnitListener> {
    match backend {
        ListenerBackend::Dbus => match DbusListener::connect().await {
            Ok(listener) => {
                info!("Listening for unit changes on the system bus");
                Arc::new(listener)
            }
            Err(e) => {
                warn!(error = %e, "System bus unavailable, polling systemctl instead");
                Arc::new(SystemctlListener::new(poll_interval))
            }
        },
        ListenerBackend::Systemctl => {
            info!(interval = ?poll_interval, "Polling unit state with systemctl");
            Arc::new(SystemctlListener::new(poll_interval))
        }
    }
}
