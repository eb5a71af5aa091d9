//! Listener registry and event dispatch.

use kimdb_protocol::{Event, EventKind};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

/// A registered event callback.
pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Append-only map from event kind to callbacks.
///
/// Callbacks run in registration order. Dispatch works on a snapshot of the
/// list, so a callback may register further listeners without deadlocking;
/// those take effect from the next event.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<HashMap<EventKind, Vec<Listener>>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener for `kind`.
    pub fn register<F>(&self, kind: EventKind, listener: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .entry(kind)
            .or_default()
            .push(Arc::new(listener));
    }

    /// Returns the number of listeners for `kind`.
    pub fn listener_count(&self, kind: &EventKind) -> usize {
        self.listeners.read().get(kind).map_or(0, Vec::len)
    }

    /// Invokes every listener registered for the event's kind.
    ///
    /// A panicking listener is logged and skipped; later listeners still
    /// run. Returns the number of listeners that completed normally.
    pub fn dispatch(&self, event: &Event) -> usize {
        let kind = event.kind();
        let snapshot: Vec<Listener> = match self.listeners.read().get(&kind) {
            Some(list) => list.clone(),
            None => return 0,
        };

        let mut completed = 0;
        for (index, listener) in snapshot.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(()) => completed += 1,
                Err(panic) => error!(
                    event = %kind,
                    listener = index,
                    reason = panic_message(panic.as_ref()),
                    "listener panicked"
                ),
            }
        }
        completed
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
