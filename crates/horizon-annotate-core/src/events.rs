//! Named-event listener maps for Horizon Annotate.
//!
//! This module provides [`Events`], an insertion-ordered multimap from event
//! names to callbacks. It is the delivery half of the engine's communication
//! model: the communication bus decides *which* controllers a subscription
//! fans out to, and each target controller's `Events` holds the resulting
//! listeners and dispatches to them synchronously on `invoke`.
//!
//! # Ordering
//!
//! Listeners for a given event are notified in subscription order
//! (first subscribed, first notified). This is load-bearing: label ordering
//! and selection updates downstream rely on deterministic delivery.
//!
//! # Re-entrancy
//!
//! The listener list is snapshotted before dispatch, so a callback may call
//! `on`/`off`/`invoke` on the same `Events` without deadlocking. Listeners
//! added during dispatch are not notified for the in-flight event.
//!
//! # Example
//!
//! ```
//! use horizon_annotate_core::Events;
//! use serde_json::json;
//!
//! let events = Events::new();
//! events.on("region-created", |payload| {
//!     println!("new region: {}", payload["id"]);
//! });
//! events.invoke("region-created", &json!({"id": "r1"}));
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Payload passed to event listeners.
///
/// Events carry heterogeneous data (a selected label's value, a region id, a
/// selection snapshot), so the payload is a JSON value rather than a typed
/// argument.
pub type EventPayload = serde_json::Value;

/// A unique identifier for a registered listener.
///
/// Returned by [`Events::on`]; pass it to [`Events::off`] to unsubscribe.
/// Ids are monotonic per `Events` instance and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Internal storage for a single listener.
struct Listener {
    id: ListenerId,
    callback: Arc<dyn Fn(&EventPayload) + Send + Sync>,
}

/// An insertion-ordered map of named events to listener callbacks.
///
/// One `Events` instance belongs to one controller for the duration of a
/// labeling session. Teardown calls [`clear`](Self::clear), after which any
/// closures captured by listeners become unreachable.
pub struct Events {
    /// Listeners per event name, in subscription order.
    listeners: RwLock<HashMap<String, Vec<Listener>>>,
    /// Source of monotonic listener ids.
    next_id: AtomicU64,
    /// Whether dispatch is temporarily blocked.
    blocked: AtomicBool,
}

impl Events {
    /// Create an empty event map.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            blocked: AtomicBool::new(false),
        }
    }

    /// Subscribe a callback to a named event.
    ///
    /// Returns a [`ListenerId`] that can be used to unsubscribe later.
    pub fn on<F>(&self, event: &str, callback: F) -> ListenerId
    where
        F: Fn(&EventPayload) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .entry(event.to_string())
            .or_default()
            .push(Listener {
                id,
                callback: Arc::new(callback),
            });
        tracing::trace!(target: "horizon_annotate_core::events", event, ?id, "listener subscribed");
        id
    }

    /// Unsubscribe a listener from a named event.
    ///
    /// Returns `true` if the listener was found and removed.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let Some(list) = listeners.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|l| l.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    /// Dispatch an event to every listener, in subscription order.
    ///
    /// Returns the number of listeners notified. Dispatch is synchronous; the
    /// listener list is snapshotted first, so callbacks may freely mutate the
    /// map without deadlocking.
    pub fn invoke(&self, event: &str, payload: &EventPayload) -> usize {
        if self.is_blocked() {
            tracing::trace!(target: "horizon_annotate_core::events", event, "events blocked, skipping invoke");
            return 0;
        }

        // Snapshot under the read lock, dispatch without it.
        let snapshot: Vec<Arc<dyn Fn(&EventPayload) + Send + Sync>> = {
            let listeners = self.listeners.read();
            match listeners.get(event) {
                Some(list) => list.iter().map(|l| l.callback.clone()).collect(),
                None => return 0,
            }
        };

        tracing::trace!(
            target: "horizon_annotate_core::events",
            event,
            listener_count = snapshot.len(),
            "invoking event"
        );

        for callback in &snapshot {
            callback(payload);
        }
        snapshot.len()
    }

    /// Check whether any listener is subscribed to the given event.
    pub fn has(&self, event: &str) -> bool {
        self.listeners.read().contains_key(event)
    }

    /// Number of listeners subscribed to the given event.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.read().get(event).map_or(0, Vec::len)
    }

    /// Block event dispatch temporarily.
    ///
    /// While blocked, `invoke` does nothing. Useful during batch selection
    /// updates to prevent cascading notifications.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check if dispatch is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Remove every listener for every event.
    pub fn clear(&self) {
        self.listeners.write().clear();
    }
}

impl Default for Events {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Events {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.read();
        f.debug_struct("Events")
            .field("events", &listeners.keys().collect::<Vec<_>>())
            .field("blocked", &self.is_blocked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn test_on_invoke() {
        let events = Events::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let received_clone = received.clone();
        events.on("changed", move |payload| {
            received_clone.lock().push(payload.clone());
        });

        events.invoke("changed", &json!(1));
        events.invoke("changed", &json!(2));

        assert_eq!(*received.lock(), vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_off() {
        let events = Events::new();
        let count = Arc::new(Mutex::new(0));

        let count_clone = count.clone();
        let id = events.on("tick", move |_| {
            *count_clone.lock() += 1;
        });

        events.invoke("tick", &json!(null));
        assert!(events.off("tick", id));
        events.invoke("tick", &json!(null));

        assert_eq!(*count.lock(), 1);
        assert!(!events.off("tick", id));
    }

    #[test]
    fn test_subscription_order_preserved() {
        let events = Events::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let order_clone = order.clone();
            events.on("seq", move |_| {
                order_clone.lock().push(i);
            });
        }

        events.invoke("seq", &json!(null));
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_invoke_returns_listener_count() {
        let events = Events::new();
        events.on("a", |_| {});
        events.on("a", |_| {});

        assert_eq!(events.invoke("a", &json!(null)), 2);
        assert_eq!(events.invoke("missing", &json!(null)), 0);
    }

    #[test]
    fn test_reentrant_subscribe_during_dispatch() {
        let events = Arc::new(Events::new());
        let fired = Arc::new(Mutex::new(0));

        let events_clone = events.clone();
        let fired_clone = fired.clone();
        events.on("outer", move |_| {
            let fired_inner = fired_clone.clone();
            // Subscribing from inside a callback must not deadlock.
            events_clone.on("outer", move |_| {
                *fired_inner.lock() += 1;
            });
        });

        events.invoke("outer", &json!(null));
        // The listener added during dispatch was not notified for the
        // in-flight event.
        assert_eq!(*fired.lock(), 0);

        events.invoke("outer", &json!(null));
        assert_eq!(*fired.lock(), 1);
    }

    #[test]
    fn test_blocked() {
        let events = Events::new();
        let count = Arc::new(Mutex::new(0));

        let count_clone = count.clone();
        events.on("tick", move |_| {
            *count_clone.lock() += 1;
        });

        events.invoke("tick", &json!(null));
        events.set_blocked(true);
        events.invoke("tick", &json!(null));
        events.set_blocked(false);
        events.invoke("tick", &json!(null));

        assert_eq!(*count.lock(), 2);
    }

    #[test]
    fn test_clear() {
        let events = Events::new();
        events.on("a", |_| {});
        events.on("b", |_| {});

        events.clear();

        assert!(!events.has("a"));
        assert!(!events.has("b"));
        assert_eq!(events.invoke("a", &json!(null)), 0);
    }
}
