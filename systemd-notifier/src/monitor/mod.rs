//! Unit monitoring: snapshot queue, tracked units, change dispatch and the
//! top-level service tying listeners to notifiers.

pub mod dispatcher;
pub mod events;
pub mod registry;
pub mod service;

pub use dispatcher::{ChangeDispatcher, ChangeHandler};
pub use events::{EventReceiver, EventSender, UnitEvent, UnitId, event_queue};
pub use registry::{TrackedUnit, TrackedUnitRegistry};
pub use service::{Monitor, NotifyingHandler};
