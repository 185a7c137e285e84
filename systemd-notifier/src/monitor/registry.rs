//! Tracked units, keyed by identity.

use std::collections::HashMap;

use tracing::debug;
use unit_state::{State, StateChange};

use super::events::UnitId;

/// A unit together with the snapshots seen since its last important transition.
#[derive(Debug, Clone)]
pub struct TrackedUnit {
    unit: UnitId,
    state_change: StateChange,
}

impl TrackedUnit {
    pub fn new(unit: UnitId, baseline: State) -> Self {
        Self {
            unit,
            state_change: StateChange::new(baseline),
        }
    }

    pub fn unit(&self) -> &UnitId {
        &self.unit
    }

    pub fn name(&self) -> &str {
        self.unit.name()
    }

    pub fn state_change(&self) -> &StateChange {
        &self.state_change
    }

    pub fn current_state(&self) -> &State {
        self.state_change.current()
    }

    pub fn record(&mut self, state: State) {
        self.state_change.record(state);
    }

    /// Start a fresh observation window anchored at the current state.
    pub fn reset(&mut self) {
        let current = self.current_state().clone();
        debug!(unit = %self.unit, state = %current, "New baseline");
        self.state_change = StateChange::new(current);
    }
}

/// Registry of tracked units. Only the dispatcher writes to it.
#[derive(Debug, Default)]
pub struct TrackedUnitRegistry {
    units: HashMap<UnitId, TrackedUnit>,
}

impl TrackedUnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `state` for `unit`, creating the entry on first sight.
    ///
    /// A new entry takes `state` as its baseline; an existing entry appends it.
    pub fn observe(&mut self, unit: UnitId, state: State) -> &mut TrackedUnit {
        use std::collections::hash_map::Entry;

        match self.units.entry(unit) {
            Entry::Occupied(entry) => {
                let tracked = entry.into_mut();
                tracked.record(state);
                tracked
            }
            Entry::Vacant(entry) => {
                let unit = entry.key().clone();
                entry.insert(TrackedUnit::new(unit, state))
            }
        }
    }

    pub fn get(&self, unit: &UnitId) -> Option<&TrackedUnit> {
        self.units.get(unit)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
