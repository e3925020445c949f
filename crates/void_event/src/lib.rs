//! # void_event - Synchronous Event Emitter
//!
//! Publish/subscribe primitive shared by components bound to the same node:
//! - String-keyed events carrying a JSON payload
//! - Multiple subscribers per event, delivered in subscription order
//! - Unsubscribe by exact handler or by subscription id
//! - Dispatch runs over a snapshot, so handlers may subscribe or
//!   unsubscribe while an event is being delivered

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use parking_lot::RwLock;
use serde::{Serialize, Deserialize};
use serde_json::Value;

/// Event identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(String);

impl EventId {
    /// Create a new event ID
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the event name
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A delivered event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event type
    pub id: EventId,
    /// Event data (`Value::Null` when triggered without payload)
    pub payload: Value,
}

impl Event {
    /// Create a new event
    pub fn new(id: impl Into<EventId>, payload: Value) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }

    /// Get the event name
    pub fn name(&self) -> &str {
        self.id.name()
    }
}

/// Event handler. Identity is the `Arc` allocation, so keep a clone of the
/// handler around to pass it back to [`Emitter::off`].
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Wrap a closure into a [`Handler`]
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    Arc::new(f)
}

fn same_handler(a: &Handler, b: &Handler) -> bool {
    // Compare data pointers only; vtable pointers are not guaranteed unique.
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Subscription ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

struct Subscription {
    id: SubscriptionId,
    handler: Handler,
}

/// Emitter statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitterStats {
    /// Total `trigger` calls
    pub events_triggered: u64,
    /// Total handler invocations
    pub deliveries: u64,
    /// Currently registered subscriptions
    pub subscriptions: usize,
}

struct EmitterInner {
    handlers: HashMap<EventId, Vec<Subscription>>,
    next_subscription_id: u64,
    stats: EmitterStats,
}

impl EmitterInner {
    fn recount(&mut self) {
        self.stats.subscriptions = self.handlers.values().map(Vec::len).sum();
    }
}

/// Shared event emitter.
///
/// Cloning yields another handle to the same subscriber table.
#[derive(Clone)]
pub struct Emitter {
    inner: Arc<RwLock<EmitterInner>>,
}

impl Emitter {
    /// Create a new emitter
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(EmitterInner {
                handlers: HashMap::new(),
                next_subscription_id: 1,
                stats: EmitterStats::default(),
            })),
        }
    }

    /// Subscribe a handler to an event
    pub fn on(&self, event: impl Into<EventId>, handler: Handler) -> SubscriptionId {
        let event = event.into();
        let mut inner = self.inner.write();

        let id = SubscriptionId(inner.next_subscription_id);
        inner.next_subscription_id += 1;

        inner
            .handlers
            .entry(event)
            .or_default()
            .push(Subscription { id, handler });
        inner.stats.subscriptions += 1;

        id
    }

    /// Remove every subscription of `handler` to `event`.
    ///
    /// Returns the number of subscriptions removed.
    pub fn off(&self, event: impl Into<EventId>, handler: &Handler) -> usize {
        let event = event.into();
        let mut inner = self.inner.write();

        let removed = match inner.handlers.get_mut(&event) {
            Some(subs) => {
                let before = subs.len();
                subs.retain(|sub| !same_handler(&sub.handler, handler));
                before - subs.len()
            }
            None => 0,
        };

        if inner.handlers.get(&event).is_some_and(Vec::is_empty) {
            inner.handlers.remove(&event);
        }
        inner.recount();
        removed
    }

    /// Remove all handlers for an event
    pub fn off_all(&self, event: impl Into<EventId>) -> usize {
        let mut inner = self.inner.write();
        let removed = inner
            .handlers
            .remove(&event.into())
            .map_or(0, |subs| subs.len());
        inner.recount();
        removed
    }

    /// Remove a single subscription. Unknown ids are ignored.
    pub fn off_subscription(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.write();

        let mut removed = false;
        for subs in inner.handlers.values_mut() {
            let before = subs.len();
            subs.retain(|sub| sub.id != id);
            if subs.len() != before {
                removed = true;
                break;
            }
        }

        inner.handlers.retain(|_, subs| !subs.is_empty());
        inner.recount();
        removed
    }

    /// Check whether a subscription is still registered
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.inner
            .read()
            .handlers
            .values()
            .any(|subs| subs.iter().any(|sub| sub.id == id))
    }

    /// Deliver an event to its subscribers, in subscription order.
    ///
    /// Returns the number of handlers invoked.
    pub fn trigger(&self, event: impl Into<EventId>, payload: Value) -> usize {
        let event = Event::new(event, payload);

        let snapshot: Vec<Handler> = {
            let inner = self.inner.read();
            inner
                .handlers
                .get(&event.id)
                .map(|subs| subs.iter().map(|sub| Arc::clone(&sub.handler)).collect())
                .unwrap_or_default()
        };

        log::trace!("trigger '{}' -> {} handler(s)", event.id, snapshot.len());

        for handler in &snapshot {
            handler(&event);
        }

        let mut inner = self.inner.write();
        inner.stats.events_triggered += 1;
        inner.stats.deliveries += snapshot.len() as u64;

        snapshot.len()
    }

    /// Number of handlers subscribed to an event
    pub fn handler_count(&self, event: impl Into<EventId>) -> usize {
        self.inner
            .read()
            .handlers
            .get(&event.into())
            .map_or(0, Vec::len)
    }

    /// Check whether no handler is subscribed at all
    pub fn is_empty(&self) -> bool {
        self.inner.read().handlers.is_empty()
    }

    /// Get statistics
    pub fn stats(&self) -> EmitterStats {
        self.inner.read().stats.clone()
    }

    /// Check whether two handles share the same subscriber table
    pub fn same(&self, other: &Emitter) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Clear all handlers
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.handlers.clear();
        inner.stats.subscriptions = 0;
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Emitter")
            .field("events", &inner.handlers.len())
            .field("stats", &inner.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_event_id() {
        let id = EventId::new("test.event");
        assert_eq!(id.name(), "test.event");
        assert_eq!(id.to_string(), "test.event");
    }

    #[test]
    fn test_trigger_passes_payload() {
        let emitter = Emitter::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        emitter.on("data", handler(move |event| {
            seen_clone.lock().push(event.payload.clone());
        }));

        assert_eq!(emitter.trigger("data", json!({"n": 1})), 1);
        assert_eq!(emitter.trigger("other", Value::Null), 0);
        assert_eq!(*seen.lock(), vec![json!({"n": 1})]);
    }

    #[test]
    fn test_fifo_delivery() {
        let emitter = Emitter::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order_clone = Arc::clone(&order);
            emitter.on("test", handler(move |_| order_clone.lock().push(i)));
        }

        emitter.trigger("test", Value::Null);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_off_removes_exact_handler() {
        let emitter = Emitter::new();
        let counter = Arc::new(AtomicU32::new(0));

        let counter_a = Arc::clone(&counter);
        let a = handler(move |_| {
            counter_a.fetch_add(1, Ordering::SeqCst);
        });
        let counter_b = Arc::clone(&counter);
        let b = handler(move |_| {
            counter_b.fetch_add(10, Ordering::SeqCst);
        });

        emitter.on("test", Arc::clone(&a));
        emitter.on("test", Arc::clone(&b));

        assert_eq!(emitter.off("test", &a), 1);
        assert_eq!(emitter.off("test", &a), 0);
        assert_eq!(emitter.handler_count("test"), 1);

        emitter.trigger("test", Value::Null);
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_off_subscription() {
        let emitter = Emitter::new();
        let id = emitter.on("test", handler(|_| {}));

        assert!(emitter.contains(id));
        assert!(emitter.off_subscription(id));
        assert!(!emitter.off_subscription(id));
        assert!(!emitter.contains(id));
        assert!(emitter.is_empty());
    }

    #[test]
    fn test_reentrant_subscribe_during_dispatch() {
        let emitter = Emitter::new();
        let counter = Arc::new(AtomicU32::new(0));

        let inner_emitter = emitter.clone();
        let counter_clone = Arc::clone(&counter);
        emitter.on("test", handler(move |_| {
            let counter_inner = Arc::clone(&counter_clone);
            inner_emitter.on("test", handler(move |_| {
                counter_inner.fetch_add(1, Ordering::SeqCst);
            }));
        }));

        // Handlers added during dispatch only see later events
        assert_eq!(emitter.trigger("test", Value::Null), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(emitter.handler_count("test"), 2);

        emitter.trigger("test", Value::Null);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stats() {
        let emitter = Emitter::new();
        emitter.on("test", handler(|_| {}));
        emitter.on("test", handler(|_| {}));

        emitter.trigger("test", Value::Null);
        emitter.trigger("missing", Value::Null);

        let stats = emitter.stats();
        assert_eq!(stats.events_triggered, 2);
        assert_eq!(stats.deliveries, 2);
        assert_eq!(stats.subscriptions, 2);

        assert_eq!(emitter.off_all("test"), 2);
        assert_eq!(emitter.stats().subscriptions, 0);
    }

    #[test]
    fn test_clones_share_table() {
        let emitter = Emitter::new();
        let other = emitter.clone();
        other.on("test", handler(|_| {}));

        assert!(emitter.same(&other));
        assert!(!emitter.same(&Emitter::new()));
        assert_eq!(emitter.handler_count("test"), 1);

        emitter.clear();
        assert!(other.is_empty());
    }
}
