//! Change notification channel from the form to the engine.
//!
//! The form pushes the names of fields whose value changed; [`ChangeQueue::drain`]
//! dispatches them to the engine in arrival order. Updates the engine applies
//! are never fed back into the queue, so each event touches only direct
//! dependents.

use std::collections::VecDeque;
use tracing::trace;

use crate::adapter::FormAdapter;
use crate::engine::{DependencyEngine, StateUpdates};

/// A value change of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub field: String,
}

/// FIFO queue of pending change events.
#[derive(Debug, Default)]
pub struct ChangeQueue {
    pending: VecDeque<ChangeEvent>,
}

impl ChangeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `field` changed.
    pub fn notify(&mut self, field: impl Into<String>) {
        let field = field.into();
        trace!(field = %field, "change queued");
        self.pending.push_back(ChangeEvent { field });
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Dispatch every pending event through the engine.
    ///
    /// Events for fields nothing depends on are dropped without evaluation.
    /// Returns the updates applied for each dispatched event, in order.
    pub fn drain<A: FormAdapter + ?Sized>(
        &mut self,
        engine: &DependencyEngine,
        adapter: &mut A,
    ) -> Vec<(ChangeEvent, StateUpdates)> {
        let subscriptions = engine.subscriptions();
        let mut applied = Vec::new();

        while let Some(event) = self.pending.pop_front() {
            if !subscriptions.contains(&event.field) {
                trace!(field = %event.field, "no dependents, dropping change");
                continue;
            }
            let updates = engine.on_change(&event.field, adapter);
            applied.push((event, updates));
        }

        applied
    }
}
