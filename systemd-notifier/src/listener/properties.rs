//! Raw unit properties shared by the listener backends.

use unit_state::{State, UnitCategory};

/// Properties that make up a [`State`] snapshot.
pub const STATE_PROPERTIES: [&str; 4] = ["ActiveState", "SubState", "LoadState", "UnitFileState"];

const UNIT_SUFFIXES: &[&str] = &[
    ".service",
    ".socket",
    ".device",
    ".mount",
    ".automount",
    ".swap",
    ".target",
    ".path",
    ".timer",
    ".slice",
    ".scope",
];

/// Append `.service` to names that carry no unit type suffix.
pub fn normalize_unit_name(name: &str) -> String {
    let name = name.trim();
    if UNIT_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
        name.to_string()
    } else {
        format!("{}.service", name)
    }
}

/// Raw unit properties as reported by systemd.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitProperties {
    pub id: String,
    pub service_type: Option<String>,
    pub active_state: String,
    pub sub_state: String,
    pub load_state: String,
    pub unit_file_state: String,
}

impl UnitProperties {
    /// Parse `Key=Value` lines as printed by `systemctl show`.
    pub fn parse(output: &str) -> Self {
        let mut props = Self::default();
        for line in output.lines() {
            if let Some((key, value)) = line.split_once('=') {
                props.set(key.trim(), value.trim());
            }
        }
        props
    }

    /// Update one property by its systemd name.
    ///
    /// Returns whether a snapshot field changed. Unknown names are ignored.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        let slot = match key {
            "Id" => {
                self.id = value.to_string();
                return false;
            }
            "Type" => {
                self.service_type = (!value.is_empty()).then(|| value.to_string());
                return false;
            }
            "ActiveState" => &mut self.active_state,
            "SubState" => &mut self.sub_state,
            "LoadState" => &mut self.load_state,
            "UnitFileState" => &mut self.unit_file_state,
            _ => return false,
        };
        if slot.as_str() == value {
            return false;
        }
        *slot = value.to_string();
        true
    }

    pub fn is_not_found(&self) -> bool {
        self.load_state == "not-found"
    }

    pub fn to_state(&self, category: UnitCategory) -> State {
        State::new(
            category,
            &self.active_state,
            &self.sub_state,
            &self.load_state,
            &self.unit_file_state,
        )
    }

    /// Whether the snapshot fields match, ignoring identity.
    pub fn same_state(&self, other: &Self) -> bool {
        self.active_state == other.active_state
            && self.sub_state == other.sub_state
            && self.load_state == other.load_state
            && self.unit_file_state == other.unit_file_state
    }
}
