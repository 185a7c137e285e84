//! Snapshot history and transition classification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::State;
use crate::value::{StateField, StateValue};

/// What happened between the baseline and the newest snapshot.
///
/// Variants are listed in classification precedence: when several apply, the
/// first one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Recovered,
    AutoRestarted,
    Restarted,
    Reloaded,
    StillFailed,
    Failed,
    Started,
}

impl Transition {
    /// Human readable status text.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recovered => "recovered",
            Self::AutoRestarted => "automatically restarted",
            Self::Restarted => "restarted",
            Self::Reloaded => "reloaded",
            Self::StillFailed => "still failed",
            Self::Failed => "failed",
            Self::Started => "started",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only history of snapshots for one unit, anchored at a baseline.
#[derive(Debug, Clone, Serialize)]
pub struct StateChange {
    history: Vec<State>,
}

impl StateChange {
    /// Start a history whose baseline is `baseline`.
    pub fn new(baseline: State) -> Self {
        Self {
            history: vec![baseline],
        }
    }

    /// Append a newer snapshot.
    pub fn record(&mut self, state: State) {
        self.history.push(state);
    }

    /// All snapshots, oldest first.
    pub fn history(&self) -> &[State] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Always false, a history holds at least its baseline.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn baseline(&self) -> &State {
        &self.history[0]
    }

    pub fn current(&self) -> &State {
        &self.history[self.history.len() - 1]
    }

    /// Snapshots observed after the baseline.
    pub fn changes(&self) -> &[State] {
        &self.history[1..]
    }

    /// Trajectories of the fields whose value changed at least once.
    ///
    /// Each group holds the value of one field across the whole history, in
    /// history order. Groups come out in [`StateField::ALL`] order.
    pub fn diff(&self) -> Vec<Vec<&StateValue>> {
        StateField::ALL
            .iter()
            .map(|&field| {
                self.history
                    .iter()
                    .map(|state| state.field(field))
                    .collect::<Vec<_>>()
            })
            .filter(|group| group.iter().any(|v| *v != group[0]))
            .collect()
    }

    /// Whether the history warrants a notification.
    pub fn is_important(&self) -> bool {
        if self.history.len() == 1 {
            return self.baseline().is_failure();
        }

        self.diff()
            .iter()
            .any(|group| group.last().is_some_and(|v| v.is_important()))
    }

    pub fn is_ok(&self) -> bool {
        self.current().is_ok()
    }

    pub fn is_failure(&self) -> bool {
        self.current().is_failure()
    }

    pub fn is_recovery(&self) -> bool {
        self.baseline().is_failure() && self.current().is_ok()
    }

    pub fn is_restart(&self) -> bool {
        self.stayed_ok() && self.any_change(|s| s.active().value() == "deactivating")
    }

    pub fn is_auto_restart(&self) -> bool {
        self.stayed_ok() && self.any_change(|s| s.status().value() == "auto-restart")
    }

    pub fn is_reload(&self) -> bool {
        self.stayed_ok() && self.any_change(|s| s.active().value() == "reloading")
    }

    pub fn is_still_failure(&self) -> bool {
        self.history.len() > 1 && self.baseline().is_failure() && self.current().is_failure()
    }

    /// Classify the net transition from baseline to current snapshot.
    pub fn classify(&self) -> Transition {
        if self.is_recovery() {
            Transition::Recovered
        } else if self.is_auto_restart() {
            Transition::AutoRestarted
        } else if self.is_restart() {
            Transition::Restarted
        } else if self.is_reload() {
            Transition::Reloaded
        } else if self.is_still_failure() {
            Transition::StillFailed
        } else if self.is_failure() {
            Transition::Failed
        } else {
            Transition::Started
        }
    }

    pub fn status_text(&self) -> &'static str {
        self.classify().as_str()
    }

    fn stayed_ok(&self) -> bool {
        self.baseline().is_ok() && self.current().is_ok()
    }

    fn any_change(&self, predicate: impl Fn(&State) -> bool) -> bool {
        self.changes().iter().any(predicate)
    }
}

impl fmt::Display for StateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for group in self.diff() {
            let trajectory = group
                .iter()
                .map(|v| v.value())
                .collect::<Vec<_>>()
                .join(" to ");
            writeln!(f, "{}: changed from {}.", group[0].name(), trajectory)?;
        }
        Ok(())
    }
}
