//! Notification fan-out and notifier channels.

pub mod center;
pub mod channels;
pub mod events;

pub use center::{DispatchSummary, NotificationCenter};
pub use channels::{ChannelConfig, Notifier};
pub use events::{Notification, NotificationKind};
