//! Unit identities and the snapshot event queue.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use unit_state::State;

/// Identity of a monitored unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId {
    name: String,
    service_type: Option<String>,
}

impl UnitId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service_type: None,
        }
    }

    /// Attach the systemd service `Type` (e.g. `simple`, `oneshot`).
    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = Some(service_type.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service_type(&self) -> Option<&str> {
        self.service_type.as_deref()
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.service_type {
            Some(t) => write!(f, "{} ({})", self.name, t),
            None => f.write_str(&self.name),
        }
    }
}

/// One observed snapshot of one unit.
#[derive(Debug, Clone)]
pub struct UnitEvent {
    pub unit: UnitId,
    pub state: State,
}

impl UnitEvent {
    pub fn new(unit: UnitId, state: State) -> Self {
        Self { unit, state }
    }
}

/// Producer side of the event queue. Cheap to clone, one per listener.
pub type EventSender = mpsc::UnboundedSender<UnitEvent>;

/// Consumer side of the event queue, owned by the dispatcher.
pub type EventReceiver = mpsc::UnboundedReceiver<UnitEvent>;

/// Create the unbounded multi-producer, single-consumer event queue.
pub fn event_queue() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
