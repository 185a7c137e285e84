//! Observable state of a systemd unit and classification of its transitions.
//!
//! A [`State`] is one snapshot of a unit, made of four [`StateValue`]s. Each
//! value carries the policy that decides whether its raw string means "ok",
//! "failure" or nothing at all. A [`StateChange`] keeps the snapshots seen
//! since the last important transition and decides what happened between the
//! baseline and the newest snapshot.
//!
//! ```
//! use unit_state::{State, StateChange, Transition, UnitCategory};
//!
//! let mut change = StateChange::new(State::new(
//!     UnitCategory::Default,
//!     "active",
//!     "running",
//!     "loaded",
//!     "enabled",
//! ));
//! change.record(State::new(
//!     UnitCategory::Default,
//!     "failed",
//!     "failed",
//!     "loaded",
//!     "enabled",
//! ));
//!
//! assert!(change.is_important());
//! assert_eq!(change.classify(), Transition::Failed);
//! assert_eq!(change.status_text(), "failed");
//! ```

mod change;
mod state;
mod value;

pub use change::{StateChange, Transition};
pub use state::{State, UnitCategory};
pub use value::{StateField, StateValue, ValuePolicy};
