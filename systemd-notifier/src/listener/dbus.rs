//! Event-driven listener on the systemd D-Bus API.
//!
//! Subscribes to `PropertiesChanged` on each unit object and enqueues a
//! snapshot for every signal that touches one of the snapshot properties, so
//! short-lived phases such as `deactivating`, `reloading` or `auto-restart`
//! are observed.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use unit_state::UnitCategory;
use zbus::fdo::PropertiesProxy;
use zbus::names::InterfaceName;
use zbus::zvariant::{OwnedObjectPath, Value};
use zbus::{Connection, Proxy};

use super::UnitListener;
use super::properties::{STATE_PROPERTIES, UnitProperties, normalize_unit_name};
use crate::monitor::{EventSender, UnitEvent, UnitId};
use crate::{Error, Result};

const SYSTEMD_DESTINATION: &str = "org.freedesktop.systemd1";
const SYSTEMD_PATH: &str = "/org/freedesktop/systemd1";
const MANAGER_INTERFACE: &str = "org.freedesktop.systemd1.Manager";
const UNIT_INTERFACE: &str = "org.freedesktop.systemd1.Unit";
const SERVICE_INTERFACE: &str = "org.freedesktop.systemd1.Service";

/// Listener driven by systemd's `PropertiesChanged` signals.
#[derive(Debug, Clone)]
pub struct DbusListener {
    connection: Connection,
}

impl DbusListener {
    /// Connect to the system bus and subscribe to systemd signals.
    pub async fn connect() -> Result<Self> {
        let connection = Connection::system().await?;
        let listener = Self { connection };

        listener
            .manager()
            .await?
            .call_method("Subscribe", &())
            .await
            .map_err(|e| {
                Error::systemd(format!(
                    "systemd does not provide the Subscribe method (version 204 or newer is required): {}",
                    e
                ))
            })?;

        debug!("Subscribed to systemd signals");
        Ok(listener)
    }

    async fn manager(&self) -> Result<Proxy<'static>> {
        Ok(Proxy::new(
            &self.connection,
            SYSTEMD_DESTINATION,
            SYSTEMD_PATH,
            MANAGER_INTERFACE,
        )
        .await?)
    }

    async fn load_unit(&self, name: &str) -> Result<OwnedObjectPath> {
        let manager = self.manager().await?;
        let path: OwnedObjectPath = manager.call("LoadUnit", &(name,)).await.map_err(|e| {
            debug!(unit = name, error = %e, "LoadUnit failed");
            Error::UnknownUnit(name.to_string())
        })?;
        Ok(path)
    }

    async fn unit_properties(&self, path: OwnedObjectPath) -> Result<PropertiesProxy<'static>> {
        Ok(PropertiesProxy::builder(&self.connection)
            .destination(SYSTEMD_DESTINATION)?
            .path(path)?
            .build()
            .await?)
    }
}

async fn read_string(
    props: &PropertiesProxy<'_>,
    interface: &'static str,
    name: &str,
) -> Result<String> {
    let value = props
        .get(InterfaceName::from_static_str_unchecked(interface), name)
        .await
        .map_err(zbus::Error::from)?;
    Ok(value_to_string(&value).unwrap_or_default())
}

async fn fetch(props: &PropertiesProxy<'_>) -> Result<UnitProperties> {
    let mut unit = UnitProperties::default();
    for name in std::iter::once("Id").chain(STATE_PROPERTIES) {
        let value = read_string(props, UNIT_INTERFACE, name).await?;
        unit.set(name, &value);
    }
    Ok(unit)
}

fn value_to_string(value: &Value<'_>) -> Option<String> {
    match value {
        Value::Str(s) => Some(s.to_string()),
        _ => None,
    }
}

/// Fold the values carried by a `PropertiesChanged` signal into `current`.
///
/// Returns whether a snapshot property changed.
fn apply_changed(current: &mut UnitProperties, changed: &HashMap<&str, Value<'_>>) -> bool {
    let mut dirty = false;
    for (name, value) in changed {
        if let Some(value) = value_to_string(value) {
            dirty |= current.set(name, &value);
        }
    }
    dirty
}

fn send(events: &EventSender, unit: &UnitId, props: &UnitProperties, category: UnitCategory) -> bool {
    events
        .send(UnitEvent::new(unit.clone(), props.to_state(category)))
        .is_ok()
}

#[async_trait]
impl UnitListener for DbusListener {
    async fn resolve(&self, name: &str) -> Result<UnitId> {
        let unit_name = normalize_unit_name(name);
        let path = self.load_unit(&unit_name).await?;
        let props = self.unit_properties(path).await?;

        let mut unit = fetch(&props).await?;
        if unit.is_not_found() {
            return Err(Error::UnknownUnit(unit_name));
        }
        // Only service units expose a Type.
        if let Ok(service_type) = read_string(&props, SERVICE_INTERFACE, "Type").await {
            unit.set("Type", &service_type);
        }

        let id = if unit.id.is_empty() { unit_name } else { unit.id };
        let resolved = match unit.service_type {
            Some(service_type) => UnitId::new(id).with_service_type(service_type),
            None => UnitId::new(id),
        };
        debug!(unit = %resolved, "Resolved unit");
        Ok(resolved)
    }

    async fn listen(
        &self,
        unit: UnitId,
        category: UnitCategory,
        events: EventSender,
        cancel: CancellationToken,
    ) -> Result<()> {
        let path = self.load_unit(unit.name()).await?;
        let props = self.unit_properties(path).await?;

        // Subscribe before the first read so no change falls in between.
        let mut signals = props.receive_properties_changed().await?;
        let mut current = fetch(&props).await?;
        if !send(&events, &unit, &current, category) {
            return Ok(());
        }

        loop {
            let signal = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(unit = %unit, "Listener cancelled");
                    return Ok(());
                }
                signal = signals.next() => signal,
            };

            let Some(signal) = signal else {
                return Err(Error::systemd(format!(
                    "PropertiesChanged stream for {} ended",
                    unit
                )));
            };

            let args = match signal.args() {
                Ok(args) => args,
                Err(e) => {
                    warn!(unit = %unit, error = %e, "Malformed PropertiesChanged signal");
                    continue;
                }
            };
            if args.interface_name().as_str() != UNIT_INTERFACE {
                continue;
            }

            let mut changed = apply_changed(&mut current, args.changed_properties());

            let stale = args
                .invalidated_properties()
                .iter()
                .any(|name| STATE_PROPERTIES.iter().any(|p| p == name));
            if stale {
                match fetch(&props).await {
                    Ok(fresh) => {
                        changed |= !fresh.same_state(&current);
                        current = fresh;
                    }
                    Err(e) => warn!(unit = %unit, error = %e, "Failed to re-read unit properties"),
                }
            }

            if changed && !send(&events, &unit, &current, category) {
                debug!(unit = %unit, "Event queue closed, listener stopping");
                return Ok(());
            }
        }
    }
}
