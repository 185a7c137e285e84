//! Notification payloads.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unit_state::{State, StateChange, StateValue};

use crate::monitor::{TrackedUnit, UnitId};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// A failed unit is healthy again.
    Ok,
    /// A healthy unit changed but is still healthy.
    Info,
    /// The unit is not healthy.
    Alert,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Info => "info",
            Self::Alert => "alert",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified transition of one unit, ready to be rendered by a notifier.
///
/// Holds its own copy of the unit's history so it can be handed to notifier
/// tasks running concurrently with the dispatcher.
#[derive(Debug, Clone)]
pub struct Notification {
    hostname: String,
    unit: UnitId,
    state_change: StateChange,
    timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(hostname: impl Into<String>, tracked: &TrackedUnit) -> Self {
        Self::from_parts(
            hostname,
            tracked.unit().clone(),
            tracked.state_change().clone(),
        )
    }

    pub fn from_parts(
        hostname: impl Into<String>,
        unit: UnitId,
        state_change: StateChange,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            unit,
            state_change,
            timestamp: Utc::now(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn unit(&self) -> &UnitId {
        &self.unit
    }

    pub fn state_change(&self) -> &StateChange {
        &self.state_change
    }

    pub fn current_state(&self) -> &State {
        self.state_change.current()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn kind(&self) -> NotificationKind {
        if self.state_change.is_ok() {
            if self.state_change.baseline().is_failure() {
                NotificationKind::Ok
            } else {
                NotificationKind::Info
            }
        } else {
            NotificationKind::Alert
        }
    }

    pub fn status_text(&self) -> &'static str {
        self.state_change.status_text()
    }

    /// One-line headline, e.g. `alert: systemd unit nginx.service on web-1 failed`.
    pub fn message(&self) -> String {
        format!(
            "{}: systemd unit {} on {} {}",
            self.kind(),
            self.unit.name(),
            self.hostname,
            self.status_text()
        )
    }

    /// Headline plus the current lifecycle phase and sub-phase.
    pub fn summary(&self) -> String {
        let state = self.current_state();
        format!("{}: {} ({})", self.message(), state.active(), state.status())
    }

    /// Newest value of every field that changed within the history.
    pub fn changed_fields(&self) -> Vec<&StateValue> {
        self.state_change
            .diff()
            .into_iter()
            .filter_map(|group| group.last().copied())
            .collect()
    }

    /// Multi-line description of every field trajectory.
    pub fn description(&self) -> String {
        self.state_change.to_string()
    }
}
