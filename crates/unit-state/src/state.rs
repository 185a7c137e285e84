//! Unit snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::{StateField, StateValue, ValuePolicy};

/// Service category, selects the classification policy of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitCategory {
    /// Long-running units: healthy while active and enabled.
    #[default]
    Default,
    /// `Type=oneshot` units: healthy once they have run and gone inactive.
    #[serde(alias = "one-shot")]
    OneShot,
}

impl UnitCategory {
    /// Map a systemd service `Type` property onto a category.
    pub fn from_service_type(service_type: Option<&str>) -> Self {
        match service_type {
            Some("oneshot") => Self::OneShot,
            _ => Self::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::OneShot => "oneshot",
        }
    }

    fn policy(&self, field: StateField) -> ValuePolicy {
        match (self, field) {
            (Self::Default, StateField::Active) => {
                ValuePolicy::new(&["active"], &["inactive", "failed"])
            }
            (Self::OneShot, StateField::Active) => ValuePolicy::new(&["inactive"], &["failed"]),
            (_, StateField::Status) => ValuePolicy::UNCLASSIFIED,
            (_, StateField::Loaded) => ValuePolicy::new(&["loaded"], &[]),
            (Self::Default, StateField::UnitFile) => {
                ValuePolicy::new(&["enabled", "linked-runtime", "static"], &["disabled"])
            }
            (Self::OneShot, StateField::UnitFile) => ValuePolicy::UNCLASSIFIED,
        }
    }
}

impl fmt::Display for UnitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed snapshot of a unit.
#[derive(Debug, Clone, Serialize)]
pub struct State {
    category: UnitCategory,
    active: StateValue,
    status: StateValue,
    loaded: StateValue,
    unit_file: StateValue,
}

impl State {
    /// Build a snapshot stamped with the current time.
    pub fn new(
        category: UnitCategory,
        active: impl Into<String>,
        status: impl Into<String>,
        loaded: impl Into<String>,
        unit_file: impl Into<String>,
    ) -> Self {
        Self::at(Utc::now(), category, active, status, loaded, unit_file)
    }

    /// Build a snapshot observed at `timestamp`.
    pub fn at(
        timestamp: DateTime<Utc>,
        category: UnitCategory,
        active: impl Into<String>,
        status: impl Into<String>,
        loaded: impl Into<String>,
        unit_file: impl Into<String>,
    ) -> Self {
        let value = |field: StateField, raw: String| {
            StateValue::new(field, raw, timestamp, category.policy(field))
        };

        Self {
            category,
            active: value(StateField::Active, active.into()),
            status: value(StateField::Status, status.into()),
            loaded: value(StateField::Loaded, loaded.into()),
            unit_file: value(StateField::UnitFile, unit_file.into()),
        }
    }

    pub fn category(&self) -> UnitCategory {
        self.category
    }

    pub fn active(&self) -> &StateValue {
        &self.active
    }

    pub fn status(&self) -> &StateValue {
        &self.status
    }

    pub fn loaded(&self) -> &StateValue {
        &self.loaded
    }

    pub fn unit_file(&self) -> &StateValue {
        &self.unit_file
    }

    /// The four values in [`StateField::ALL`] order.
    pub fn fields(&self) -> [&StateValue; 4] {
        [&self.active, &self.status, &self.loaded, &self.unit_file]
    }

    pub fn field(&self, field: StateField) -> &StateValue {
        match field {
            StateField::Active => &self.active,
            StateField::Status => &self.status,
            StateField::Loaded => &self.loaded,
            StateField::UnitFile => &self.unit_file,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.fields().iter().all(|v| v.is_ok())
    }

    pub fn is_failure(&self) -> bool {
        self.fields().iter().any(|v| v.is_failure())
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.fields() == other.fields()
    }
}

impl Eq for State {}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.active, self.status, self.loaded, self.unit_file
        )
    }
}
