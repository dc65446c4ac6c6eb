//! Event Channel
//!
//! Ordinary type-keyed publish/subscribe, decoupled from the dependency
//! graph: it works with zero adapters configured. The key type is generic
//! so hosts can key events by an enum or by plain strings; the payload type
//! is generic alongside it.
//!
//! # Ordering and Re-Entrancy
//!
//! Listeners for one event fire in subscription order. Emission snapshots
//! the listener list and releases the table lock before invoking anything,
//! so a listener may subscribe, unsubscribe, or emit again without
//! corrupting the channel. `once` listeners are removed *before* their
//! invocation, so a recursive emission cannot run them twice.
//!
//! # Error Policy
//!
//! A listener returns `Result<(), BoxError>`; `Err` is the port of a
//! throwing listener. The policy is fixed at construction:
//!
//! - [`EventChannel::new`] is fail-fast: the first error propagates out of
//!   `emit` and the remaining listeners for that emission are skipped.
//! - [`EventChannel::with_error_handler`] is fail-soft: each listener runs
//!   in isolation, errors are routed to the handler, every listener runs.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::value::Value;

/// The error type carried by failing listeners.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

type ListenerFn<P> = Arc<dyn Fn(&P) -> Result<(), BoxError> + Send + Sync>;

type ErrorHandler<E> = Arc<dyn Fn(&E, BoxError) + Send + Sync>;

/// Handle for removing a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// The raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

struct Listener<P> {
    id: ListenerId,
    once: bool,
    callback: ListenerFn<P>,
}

/// Type-keyed publish/subscribe channel.
pub struct EventChannel<E = String, P = Value> {
    listeners: RwLock<IndexMap<E, Vec<Listener<P>>>>,
    handler: Option<ErrorHandler<E>>,
    next_id: AtomicU64,
}

impl<E, P> EventChannel<E, P>
where
    E: Eq + Hash + Clone,
{
    /// A fail-fast channel: a listener error propagates out of `emit`.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(IndexMap::new()),
            handler: None,
            next_id: AtomicU64::new(0),
        }
    }

    /// A fail-soft channel: listener errors are routed to `handler` and
    /// every listener still runs.
    pub fn with_error_handler(handler: impl Fn(&E, BoxError) + Send + Sync + 'static) -> Self {
        Self {
            listeners: RwLock::new(IndexMap::new()),
            handler: Some(Arc::new(handler)),
            next_id: AtomicU64::new(0),
        }
    }

    /// Subscribe to an event. Listeners fire in subscription order.
    pub fn on(
        &self,
        event: E,
        listener: impl Fn(&P) -> Result<(), BoxError> + Send + Sync + 'static,
    ) -> ListenerId {
        self.subscribe(event, false, Arc::new(listener))
    }

    /// Subscribe for a single emission. The listener removes itself before
    /// it is invoked.
    pub fn once(
        &self,
        event: E,
        listener: impl Fn(&P) -> Result<(), BoxError> + Send + Sync + 'static,
    ) -> ListenerId {
        self.subscribe(event, true, Arc::new(listener))
    }

    fn subscribe(&self, event: E, once: bool, callback: ListenerFn<P>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .entry(event)
            .or_default()
            .push(Listener { id, once, callback });
        id
    }

    /// Remove a subscription. Unknown listeners and events are a silent
    /// no-op.
    pub fn off(&self, event: &E, id: ListenerId) {
        let mut table = self.listeners.write();
        if let Some(list) = table.get_mut(event) {
            list.retain(|listener| listener.id != id);
        }
    }

    /// Number of live subscriptions for an event.
    pub fn listener_count(&self, event: &E) -> usize {
        self.listeners
            .read()
            .get(event)
            .map_or(0, |list| list.len())
    }

    /// Publish `payload` to every subscriber of `event`, in subscription
    /// order, under the configured error policy.
    pub fn emit(&self, event: &E, payload: &P) -> Result<(), BoxError> {
        let batch: Vec<ListenerFn<P>> = {
            let mut table = self.listeners.write();
            let Some(list) = table.get_mut(event) else {
                return Ok(());
            };
            let batch = list.iter().map(|l| l.callback.clone()).collect();
            // once-listeners self-remove before invocation
            list.retain(|l| !l.once);
            batch
        };

        for callback in batch {
            if let Err(error) = callback(payload) {
                match &self.handler {
                    Some(handler) => {
                        debug!("listener error routed to handler");
                        handler(event, error);
                    }
                    None => return Err(error),
                }
            }
        }
        Ok(())
    }
}

impl<E, P> Default for EventChannel<E, P>
where
    E: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, P> std::fmt::Debug for EventChannel<E, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("events", &self.listeners.read().len())
            .field("fail_soft", &self.handler.is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn channel() -> EventChannel<String, i64> {
        EventChannel::new()
    }

    #[test]
    fn listeners_fire_in_subscription_order() {
        let channel = channel();
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order = order.clone();
            channel.on("tick".to_owned(), move |_| {
                order.lock().unwrap().push(label);
                Ok(())
            });
        }

        channel.emit(&"tick".to_owned(), &0).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn payload_reaches_every_listener() {
        let channel = channel();
        let sum = Arc::new(Mutex::new(0));

        for _ in 0..3 {
            let sum = sum.clone();
            channel.on("add".to_owned(), move |payload| {
                *sum.lock().unwrap() += *payload;
                Ok(())
            });
        }

        channel.emit(&"add".to_owned(), &7).unwrap();
        assert_eq!(*sum.lock().unwrap(), 21);
    }

    #[test]
    fn once_listeners_self_remove_before_invocation() {
        let channel: Arc<EventChannel<String, i64>> = Arc::new(EventChannel::new());
        let runs = Arc::new(Mutex::new(0));

        let inner_channel = channel.clone();
        let inner_runs = runs.clone();
        channel.once("tick".to_owned(), move |_| {
            *inner_runs.lock().unwrap() += 1;
            // Already removed: a recursive emission cannot re-run us.
            inner_channel.emit(&"tick".to_owned(), &0)?;
            Ok(())
        });

        channel.emit(&"tick".to_owned(), &0).unwrap();
        channel.emit(&"tick".to_owned(), &0).unwrap();
        assert_eq!(*runs.lock().unwrap(), 1);
        assert_eq!(channel.listener_count(&"tick".to_owned()), 0);
    }

    #[test]
    fn off_removes_and_unknowns_are_silent() {
        let channel = channel();
        let runs = Arc::new(Mutex::new(0));

        let inner = runs.clone();
        let id = channel.on("tick".to_owned(), move |_| {
            *inner.lock().unwrap() += 1;
            Ok(())
        });

        channel.emit(&"tick".to_owned(), &0).unwrap();
        channel.off(&"tick".to_owned(), id);
        channel.emit(&"tick".to_owned(), &0).unwrap();
        assert_eq!(*runs.lock().unwrap(), 1);

        // Unknown event and already-removed listener: no-ops.
        channel.off(&"absent".to_owned(), id);
        channel.off(&"tick".to_owned(), id);
    }

    #[test]
    fn fail_fast_halts_remaining_listeners() {
        let channel = channel();
        let later_ran = Arc::new(Mutex::new(false));

        channel.on("tick".to_owned(), |_| Err("boom".into()));
        let inner = later_ran.clone();
        channel.on("tick".to_owned(), move |_| {
            *inner.lock().unwrap() = true;
            Ok(())
        });

        let error = channel.emit(&"tick".to_owned(), &0).unwrap_err();
        assert_eq!(error.to_string(), "boom");
        assert!(!*later_ran.lock().unwrap());
    }

    #[test]
    fn fail_soft_isolates_listeners_and_routes_errors() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler_seen = seen.clone();
        let channel: EventChannel<String, i64> =
            EventChannel::with_error_handler(move |event, error| {
                handler_seen
                    .lock()
                    .unwrap()
                    .push(format!("{event}: {error}"));
            });

        let later_ran = Arc::new(Mutex::new(false));
        channel.on("tick".to_owned(), |_| Err("boom".into()));
        let inner = later_ran.clone();
        channel.on("tick".to_owned(), move |_| {
            *inner.lock().unwrap() = true;
            Ok(())
        });

        channel.emit(&"tick".to_owned(), &0).unwrap();
        assert!(*later_ran.lock().unwrap());
        assert_eq!(*seen.lock().unwrap(), vec!["tick: boom"]);
    }

    #[test]
    fn enum_keys_work() {
        #[derive(Clone, PartialEq, Eq, Hash)]
        enum Topic {
            Added,
            Removed,
        }

        let channel: EventChannel<Topic, i64> = EventChannel::new();
        let added = Arc::new(Mutex::new(0));

        let inner = added.clone();
        channel.on(Topic::Added, move |payload| {
            *inner.lock().unwrap() += *payload;
            Ok(())
        });

        channel.emit(&Topic::Added, &5).unwrap();
        channel.emit(&Topic::Removed, &5).unwrap();
        assert_eq!(*added.lock().unwrap(), 5);
    }
}
