//! Tracker Facade
//!
//! Composes one [`DependencyRegistry`] and one [`EventChannel`]. Every
//! trigger-family operation has two forms: dependency-only, or
//! dependency-plus-event. When event arguments are supplied, dependency
//! notification happens first and event emission second, within the same
//! call. The two subsystems have independent lifecycles: [`Tracker::clear`]
//! resets the dependency graph and leaves event subscriptions untouched.
//!
//! The facade also carries the wrapper family. Key-scoped mutable wraps
//! consult the adapter's native fast-path first; item-scoped and read-only
//! wraps always use the generic interception layer.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::adapter::{Adapter, Dependency};
use crate::composite::MultiAdapter;
use crate::error::Result;
use crate::events::{BoxError, EventChannel};
use crate::registry::DependencyRegistry;
use crate::value::{SharedValue, Value};
use crate::wrap::{Depth, ReadonlyValue, TrackedValue};

/// The outcome of a fast-path-eligible wrap.
pub enum WrappedState {
    /// The host runtime claimed the value with its own reactive primitive.
    Native(SharedValue),
    /// The generic interception layer wrapped the value.
    Tracked(TrackedValue),
}

impl WrappedState {
    /// The generic wrapper, if the fast-path was not taken.
    pub fn tracked(self) -> Option<TrackedValue> {
        match self {
            WrappedState::Tracked(wrapper) => Some(wrapper),
            WrappedState::Native(_) => None,
        }
    }

    /// The native handle, if the fast-path was taken.
    pub fn native(self) -> Option<SharedValue> {
        match self {
            WrappedState::Native(value) => Some(value),
            WrappedState::Tracked(_) => None,
        }
    }
}

/// One registry plus one event channel, with combined operations.
pub struct Tracker<E = String, P = Value> {
    registry: Arc<DependencyRegistry>,
    events: EventChannel<E, P>,
    wrap_counter: AtomicU64,
}

impl<E, P> Tracker<E, P>
where
    E: Eq + Hash + Clone,
{
    /// A tracker with no host runtime attached. Tracking and triggering
    /// degrade to no-ops; the event channel works normally.
    pub fn new() -> Self {
        Self::from_parts(Arc::new(DependencyRegistry::new()), EventChannel::new())
    }

    /// A tracker backed by one adapter.
    pub fn with_adapter(adapter: Arc<dyn Adapter>) -> Self {
        Self::from_parts(
            Arc::new(DependencyRegistry::with_adapter(adapter)),
            EventChannel::new(),
        )
    }

    /// A tracker fanned out over several adapters. Fails on an empty list.
    pub fn with_adapters(adapters: Vec<Arc<dyn Adapter>>) -> Result<Self> {
        let multi = MultiAdapter::new(adapters)?;
        Ok(Self::with_adapter(Arc::new(multi)))
    }

    /// Compose from explicit parts.
    pub fn from_parts(registry: Arc<DependencyRegistry>, events: EventChannel<E, P>) -> Self {
        Self {
            registry,
            events,
            wrap_counter: AtomicU64::new(0),
        }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Arc<DependencyRegistry> {
        &self.registry
    }

    /// The underlying event channel.
    pub fn events(&self) -> &EventChannel<E, P> {
        &self.events
    }

    /// Whether an observing context is currently active.
    pub fn is_in_scope(&self) -> bool {
        self.registry.is_in_scope()
    }

    // ------------------------------------------------------------------
    // Dependency accessors and track family
    // ------------------------------------------------------------------

    pub fn dependency(&self, key: &str) -> Option<Arc<dyn Dependency>> {
        self.registry.dependency(key)
    }

    pub fn item_dependency(&self, collection: &str, id: &str) -> Option<Arc<dyn Dependency>> {
        self.registry.item_dependency(collection, id)
    }

    pub fn property_dependency(&self, key: &str, prop: &str) -> Option<Arc<dyn Dependency>> {
        self.registry.property_dependency(key, prop)
    }

    pub fn item_property_dependency(
        &self,
        collection: &str,
        id: &str,
        prop: &str,
    ) -> Option<Arc<dyn Dependency>> {
        self.registry.item_property_dependency(collection, id, prop)
    }

    pub fn track(&self, key: &str) {
        self.registry.track(key);
    }

    pub fn track_property(&self, key: &str, prop: &str) {
        self.registry.track_property(key, prop);
    }

    pub fn track_item(&self, collection: &str, id: &str) {
        self.registry.track_item(collection, id);
    }

    pub fn track_item_property(&self, collection: &str, id: &str, prop: &str) {
        self.registry.track_item_property(collection, id, prop);
    }

    // ------------------------------------------------------------------
    // Trigger family, with optional combined emission
    // ------------------------------------------------------------------

    pub fn trigger(&self, key: &str) {
        self.registry.trigger(key);
    }

    /// Notify the key dependency, then emit `event` with `payload`.
    pub fn trigger_with(&self, key: &str, event: &E, payload: &P) -> std::result::Result<(), BoxError> {
        self.registry.trigger(key);
        self.events.emit(event, payload)
    }

    pub fn trigger_property(&self, key: &str, prop: &str) {
        self.registry.trigger_property(key, prop);
    }

    pub fn trigger_property_with(
        &self,
        key: &str,
        prop: &str,
        event: &E,
        payload: &P,
    ) -> std::result::Result<(), BoxError> {
        self.registry.trigger_property(key, prop);
        self.events.emit(event, payload)
    }

    pub fn trigger_item(&self, collection: &str, id: &str) {
        self.registry.trigger_item(collection, id);
    }

    pub fn trigger_item_with(
        &self,
        collection: &str,
        id: &str,
        event: &E,
        payload: &P,
    ) -> std::result::Result<(), BoxError> {
        self.registry.trigger_item(collection, id);
        self.events.emit(event, payload)
    }

    pub fn trigger_item_property(&self, collection: &str, id: &str, prop: &str) {
        self.registry.trigger_item_property(collection, id, prop);
    }

    pub fn trigger_item_property_with(
        &self,
        collection: &str,
        id: &str,
        prop: &str,
        event: &E,
        payload: &P,
    ) -> std::result::Result<(), BoxError> {
        self.registry.trigger_item_property(collection, id, prop);
        self.events.emit(event, payload)
    }

    pub fn trigger_collection(&self, collection: &str) {
        self.registry.trigger_collection(collection);
    }

    pub fn trigger_collection_with(
        &self,
        collection: &str,
        event: &E,
        payload: &P,
    ) -> std::result::Result<(), BoxError> {
        self.registry.trigger_collection(collection);
        self.events.emit(event, payload)
    }

    pub fn trigger_add(&self, collection: &str) {
        self.registry.trigger_add(collection);
    }

    pub fn trigger_add_with(
        &self,
        collection: &str,
        event: &E,
        payload: &P,
    ) -> std::result::Result<(), BoxError> {
        self.registry.trigger_add(collection);
        self.events.emit(event, payload)
    }

    pub fn trigger_remove(&self, collection: &str, id: &str) {
        self.registry.trigger_remove(collection, id);
    }

    pub fn trigger_remove_with(
        &self,
        collection: &str,
        id: &str,
        event: &E,
        payload: &P,
    ) -> std::result::Result<(), BoxError> {
        self.registry.trigger_remove(collection, id);
        self.events.emit(event, payload)
    }

    // ------------------------------------------------------------------
    // Wrapper family
    // ------------------------------------------------------------------

    /// Wrap key-scoped mutable state, taking the adapter's native
    /// fast-path when it offers one.
    pub fn wrap(&self, key: impl Into<String>, value: Value, depth: Depth) -> WrappedState {
        let shared = value.into_shared();
        if let Some(native) = self
            .registry
            .adapter()
            .and_then(|adapter| adapter.wrap_reactive(&shared))
        {
            return WrappedState::Native(native);
        }
        WrappedState::Tracked(TrackedValue::new(
            self.registry.clone(),
            crate::wrap::Scope::key(key),
            shared,
            depth,
        ))
    }

    /// Wrap state under a generated key. Each call mints a fresh key from
    /// the tracker's own counter.
    pub fn wrap_anonymous(&self, value: Value, depth: Depth) -> WrappedState {
        let id = self.wrap_counter.fetch_add(1, Ordering::Relaxed);
        self.wrap(format!("@wrap/{id}"), value, depth)
    }

    /// Wrap item-scoped mutable state. Always the generic layer: a native
    /// primitive cannot express collection/item addressing.
    pub fn wrap_item(
        &self,
        collection: impl Into<String>,
        id: impl Into<String>,
        value: Value,
        depth: Depth,
    ) -> TrackedValue {
        TrackedValue::wrap_item(self.registry.clone(), collection, id, value, depth)
    }

    /// Wrap key-scoped state read-only. Always the generic layer: a native
    /// primitive cannot enforce read-only semantics.
    pub fn wrap_readonly(&self, key: impl Into<String>, value: Value, depth: Depth) -> ReadonlyValue {
        ReadonlyValue::wrap_key(self.registry.clone(), key, value, depth)
    }

    /// Wrap item-scoped state read-only.
    pub fn wrap_item_readonly(
        &self,
        collection: impl Into<String>,
        id: impl Into<String>,
        value: Value,
        depth: Depth,
    ) -> ReadonlyValue {
        ReadonlyValue::wrap_item(self.registry.clone(), collection, id, value, depth)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Reset the dependency graph. Event subscriptions are untouched.
    pub fn clear(&self) {
        self.registry.clear();
    }
}

impl<E, P> Default for Tracker<E, P>
where
    E: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, P> std::fmt::Debug for Tracker<E, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("registry", &self.registry)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
