//! Watches systemd units and notifies when one of them fails, recovers or is
//! restarted.

pub mod config;
pub mod error;
pub mod listener;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod utils;

pub use error::{Error, Result};
