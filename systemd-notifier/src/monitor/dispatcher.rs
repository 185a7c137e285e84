//! Change dispatcher.
//!
//! Drains the snapshot queue one event at a time, folds each snapshot into
//! the tracked unit registry and reports changes to a [`ChangeHandler`].
//! Events are handled strictly in arrival order across all units.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, error, info};

use super::events::{EventReceiver, UnitEvent, UnitId};
use super::registry::{TrackedUnit, TrackedUnitRegistry};
use crate::Result;

/// Hooks invoked by the dispatcher.
///
/// Errors returned from either hook, and panics raised inside one, are logged
/// and discarded.
#[async_trait]
pub trait ChangeHandler: Send + Sync {
    /// Called for every observed snapshot.
    async fn on_each_change(&self, _unit: &TrackedUnit) -> Result<()> {
        Ok(())
    }

    /// Called when the unit's history amounts to an important transition.
    async fn on_important_change(&self, unit: &TrackedUnit) -> Result<()>;
}

/// Single consumer of the snapshot queue.
pub struct ChangeDispatcher {
    events: EventReceiver,
    registry: TrackedUnitRegistry,
    handler: Arc<dyn ChangeHandler>,
}

impl ChangeDispatcher {
    pub fn new(events: EventReceiver, handler: Arc<dyn ChangeHandler>) -> Self {
        Self {
            events,
            registry: TrackedUnitRegistry::new(),
            handler,
        }
    }

    pub fn registry(&self) -> &TrackedUnitRegistry {
        &self.registry
    }

    /// Run until every producer has dropped its sender.
    ///
    /// Returns the registry so callers can inspect the final tracked state.
    pub async fn run(mut self) -> TrackedUnitRegistry {
        debug!("Change dispatcher started");
        while let Some(event) = self.events.recv().await {
            self.dispatch(event).await;
        }
        debug!("Event queue closed, change dispatcher stopping");
        self.registry
    }

    /// Process a single snapshot.
    pub async fn dispatch(&mut self, event: UnitEvent) {
        let UnitEvent { unit, state } = event;
        debug!(unit = %unit, state = %state, "New state");

        let tracked = self.registry.observe(unit, state);

        let outcome = AssertUnwindSafe(self.handler.on_each_change(tracked))
            .catch_unwind()
            .await;
        report_hook(tracked.unit(), "Change", outcome);

        if !tracked.state_change().is_important() {
            return;
        }

        info!(
            unit = %tracked.unit(),
            status = tracked.state_change().status_text(),
            state = %tracked.current_state(),
            "Important state change"
        );

        let outcome = AssertUnwindSafe(self.handler.on_important_change(tracked))
            .catch_unwind()
            .await;
        report_hook(tracked.unit(), "Important change", outcome);

        tracked.reset();
    }
}

fn report_hook(unit: &UnitId, hook: &str, outcome: std::thread::Result<Result<()>>) {
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(unit = %unit, error = %e, "{} callback failed", hook),
        Err(_) => error!(unit = %unit, "{} callback panicked", hook),
    }
}
