//! Polling listener backed by `systemctl show`.
//!
//! Only sees the state present at each poll. Used when the system bus is not
//! reachable.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use unit_state::UnitCategory;

use super::UnitListener;
use super::properties::{UnitProperties, normalize_unit_name};
use crate::monitor::{EventSender, UnitEvent, UnitId};
use crate::{Error, Result};

const PROPERTIES: &str = "Id,Type,ActiveState,SubState,LoadState,UnitFileState";

/// Polls `systemctl show` for each unit at a fixed interval.
#[derive(Debug, Clone)]
pub struct SystemctlListener {
    program: String,
    poll_interval: Duration,
}

impl SystemctlListener {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            program: "systemctl".to_string(),
            poll_interval,
        }
    }

    /// Use a different `systemctl` binary.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    async fn show(&self, unit: &str) -> Result<UnitProperties> {
        let output = Command::new(&self.program)
            .arg("show")
            .arg(unit)
            .arg(format!("--property={}", PROPERTIES))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::systemd(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::systemd(format!(
                "{} show {} exited with {}: {}",
                self.program,
                unit,
                output.status,
                stderr.trim()
            )));
        }

        Ok(UnitProperties::parse(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }
}

impl Default for SystemctlListener {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl UnitListener for SystemctlListener {
    async fn resolve(&self, name: &str) -> Result<UnitId> {
        let unit_name = normalize_unit_name(name);
        let props = self.show(&unit_name).await?;

        if props.is_not_found() {
            return Err(Error::UnknownUnit(unit_name));
        }

        let id = if props.id.is_empty() {
            unit_name
        } else {
            props.id
        };
        let unit = match props.service_type {
            Some(service_type) => UnitId::new(id).with_service_type(service_type),
            None => UnitId::new(id),
        };
        debug!(unit = %unit, "Resolved unit");
        Ok(unit)
    }

    async fn listen(
        &self,
        unit: UnitId,
        category: UnitCategory,
        events: EventSender,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut last: Option<UnitProperties> = None;

        loop {
            match self.show(unit.name()).await {
                Ok(props) => {
                    let changed = last.as_ref().is_none_or(|prev| !prev.same_state(&props));
                    if changed {
                        let event = UnitEvent::new(unit.clone(), props.to_state(category));
                        if events.send(event).is_err() {
                            debug!(unit = %unit, "Event queue closed, listener stopping");
                            return Ok(());
                        }
                        last = Some(props);
                    }
                }
                Err(e) => warn!(unit = %unit, error = %e, "Failed to poll unit state"),
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(unit = %unit, "Listener cancelled");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}
