//! A single observed unit property.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four property positions of a [`crate::State`], in snapshot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    /// Lifecycle phase (systemd `ActiveState`).
    Active,
    /// Sub-phase (systemd `SubState`). Free text, never classified.
    Status,
    /// Configuration load phase (systemd `LoadState`).
    Loaded,
    /// Enablement phase (systemd `UnitFileState`).
    UnitFile,
}

impl StateField {
    /// All fields in snapshot order.
    pub const ALL: [StateField; 4] = [Self::Active, Self::Status, Self::Loaded, Self::UnitFile];

    /// Machine name of the field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Status => "status",
            Self::Loaded => "loaded",
            Self::UnitFile => "unit_file",
        }
    }

    /// Human-friendly label.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Status => "Status",
            Self::Loaded => "Loaded",
            Self::UnitFile => "Unit File",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which raw values of a property count as ok and which count as failure.
///
/// An empty `ok_values` set means the property has no opinion on health, so
/// every value is ok. An empty `failure_values` set means no value is a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValuePolicy {
    ok_values: &'static [&'static str],
    failure_values: &'static [&'static str],
}

impl ValuePolicy {
    /// Policy that never classifies anything.
    pub const UNCLASSIFIED: ValuePolicy = ValuePolicy::new(&[], &[]);

    pub const fn new(
        ok_values: &'static [&'static str],
        failure_values: &'static [&'static str],
    ) -> Self {
        Self {
            ok_values,
            failure_values,
        }
    }

    pub fn ok_values(&self) -> &'static [&'static str] {
        self.ok_values
    }

    pub fn failure_values(&self) -> &'static [&'static str] {
        self.failure_values
    }
}

/// One observed property value together with its classification policy.
#[derive(Debug, Clone, Serialize)]
pub struct StateValue {
    #[serde(rename = "name")]
    field: StateField,
    value: String,
    timestamp: DateTime<Utc>,
    #[serde(skip)]
    policy: ValuePolicy,
}

impl StateValue {
    pub fn new(
        field: StateField,
        value: impl Into<String>,
        timestamp: DateTime<Utc>,
        policy: ValuePolicy,
    ) -> Self {
        Self {
            field,
            value: value.into(),
            timestamp,
            policy,
        }
    }

    pub fn field(&self) -> StateField {
        self.field
    }

    pub fn name(&self) -> &'static str {
        self.field.name()
    }

    pub fn display_name(&self) -> &'static str {
        self.field.display_name()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn policy(&self) -> ValuePolicy {
        self.policy
    }

    /// True when the policy has no ok set or the value is in it.
    pub fn is_ok(&self) -> bool {
        self.policy.ok_values.is_empty() || self.in_ok_values()
    }

    /// True only when the value is listed as a failure.
    pub fn is_failure(&self) -> bool {
        !self.policy.failure_values.is_empty() && self.in_failure_values()
    }

    /// True when the value has an explicit meaning under the policy.
    pub fn is_important(&self) -> bool {
        self.in_ok_values() || self.in_failure_values()
    }

    fn in_ok_values(&self) -> bool {
        self.policy.ok_values.contains(&self.value.as_str())
    }

    fn in_failure_values(&self) -> bool {
        self.policy.failure_values.contains(&self.value.as_str())
    }
}

// Identity is the raw value only.
impl PartialEq for StateValue {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for StateValue {}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
