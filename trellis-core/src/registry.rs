//! Dependency Registry
//!
//! The registry owns the multi-level dependency graph and is the sole
//! authority on tracking and triggering semantics. It keeps four selector
//! tables:
//!
//! - by key (whole-key observers; collections live here under their name)
//! - by collection + id (per-item observers)
//! - by key + property (per-property observers)
//! - by collection + id + property (per-item-property observers)
//!
//! # Granularity and Roll-Up
//!
//! Tracking cascades upward so coarse observers see fine-grained changes:
//! tracking an item property registers on the item-property, item, and
//! collection dependencies; tracking a key property registers on the
//! property and the owning key. Triggering does *not* cascade: notifying a
//! property never notifies its owner, and replacing an item
//! ([`DependencyRegistry::trigger_item`]) never notifies the enclosing
//! collection: structural changes are their own signal
//! ([`DependencyRegistry::trigger_collection`] /
//! [`DependencyRegistry::trigger_add`]).
//!
//! # Degradation
//!
//! With no adapter configured, every method is a safe no-op that creates
//! nothing. Instrumentation must never crash application code that happens
//! to run without a host runtime attached.
//!
//! # Re-Entrancy
//!
//! Triggering collects the dependencies to notify, releases the table
//! locks, and only then calls `notify()`. An observer is free to read or
//! write tracked state from inside its notification.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::adapter::{Adapter, Dependency};

type Dep = Arc<dyn Dependency>;

/// Owner of the four selector tables.
pub struct DependencyRegistry {
    adapter: Option<Arc<dyn Adapter>>,
    keys: RwLock<IndexMap<String, Dep>>,
    key_props: RwLock<IndexMap<(String, String), Dep>>,
    items: RwLock<IndexMap<(String, String), Dep>>,
    item_props: RwLock<IndexMap<(String, String), IndexMap<String, Dep>>>,
}

impl DependencyRegistry {
    /// A registry with no host runtime attached. Every operation is a safe
    /// no-op.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A registry backed by the given adapter (possibly a
    /// [`MultiAdapter`](crate::composite::MultiAdapter) fan-out).
    pub fn with_adapter(adapter: Arc<dyn Adapter>) -> Self {
        Self::build(Some(adapter))
    }

    fn build(adapter: Option<Arc<dyn Adapter>>) -> Self {
        Self {
            adapter,
            keys: RwLock::new(IndexMap::new()),
            key_props: RwLock::new(IndexMap::new()),
            items: RwLock::new(IndexMap::new()),
            item_props: RwLock::new(IndexMap::new()),
        }
    }

    /// The configured adapter, if any.
    pub fn adapter(&self) -> Option<&Arc<dyn Adapter>> {
        self.adapter.as_ref()
    }

    /// Whether an observing context is currently active.
    ///
    /// Delegates to the adapter's probe; an adapter without one counts as
    /// always active. With no adapter at all there is nothing to register
    /// with, so this is `false`.
    pub fn is_in_scope(&self) -> bool {
        self.adapter.as_ref().is_some_and(|a| a.is_in_scope())
    }

    // ------------------------------------------------------------------
    // Get-or-create accessors
    // ------------------------------------------------------------------

    /// The dependency for a whole key (or collection). Deterministic: the
    /// same key yields the same handle until removal or clear. `None`
    /// without an adapter.
    pub fn dependency(&self, key: &str) -> Option<Dep> {
        let adapter = self.adapter.as_ref()?;
        let mut keys = self.keys.write();
        Some(
            keys.entry(key.to_owned())
                .or_insert_with(|| adapter.create())
                .clone(),
        )
    }

    /// The dependency for one item of a collection.
    pub fn item_dependency(&self, collection: &str, id: &str) -> Option<Dep> {
        let adapter = self.adapter.as_ref()?;
        let mut items = self.items.write();
        Some(
            items
                .entry((collection.to_owned(), id.to_owned()))
                .or_insert_with(|| adapter.create())
                .clone(),
        )
    }

    /// The dependency for one property under a key.
    pub fn property_dependency(&self, key: &str, prop: &str) -> Option<Dep> {
        let adapter = self.adapter.as_ref()?;
        let mut props = self.key_props.write();
        Some(
            props
                .entry((key.to_owned(), prop.to_owned()))
                .or_insert_with(|| adapter.create())
                .clone(),
        )
    }

    /// The dependency for one property of one item.
    pub fn item_property_dependency(&self, collection: &str, id: &str, prop: &str) -> Option<Dep> {
        let adapter = self.adapter.as_ref()?;
        let mut table = self.item_props.write();
        let props = table
            .entry((collection.to_owned(), id.to_owned()))
            .or_default();
        Some(
            props
                .entry(prop.to_owned())
                .or_insert_with(|| adapter.create())
                .clone(),
        )
    }

    // ------------------------------------------------------------------
    // Track family (read side)
    // ------------------------------------------------------------------

    fn tracking_active(&self) -> bool {
        self.is_in_scope()
    }

    /// Register the current observer on a whole key.
    pub fn track(&self, key: &str) {
        if !self.tracking_active() {
            return;
        }
        trace!(key, "track key");
        if let Some(dep) = self.dependency(key) {
            dep.depend();
        }
    }

    /// Register on a key property, rolling up to the owning key.
    pub fn track_property(&self, key: &str, prop: &str) {
        if !self.tracking_active() {
            return;
        }
        trace!(key, prop, "track property");
        if let Some(dep) = self.property_dependency(key, prop) {
            dep.depend();
        }
        if let Some(dep) = self.dependency(key) {
            dep.depend();
        }
    }

    /// Register on an item, rolling up to the collection.
    pub fn track_item(&self, collection: &str, id: &str) {
        if !self.tracking_active() {
            return;
        }
        trace!(collection, id, "track item");
        if let Some(dep) = self.item_dependency(collection, id) {
            dep.depend();
        }
        if let Some(dep) = self.dependency(collection) {
            dep.depend();
        }
    }

    /// Register on an item property, rolling up to the item and the
    /// collection.
    pub fn track_item_property(&self, collection: &str, id: &str, prop: &str) {
        if !self.tracking_active() {
            return;
        }
        trace!(collection, id, prop, "track item property");
        if let Some(dep) = self.item_property_dependency(collection, id, prop) {
            dep.depend();
        }
        if let Some(dep) = self.item_dependency(collection, id) {
            dep.depend();
        }
        if let Some(dep) = self.dependency(collection) {
            dep.depend();
        }
    }

    // ------------------------------------------------------------------
    // Trigger family (write side)
    // ------------------------------------------------------------------
    //
    // Triggers look up existing dependencies only. A write to state
    // nobody observes creates no bookkeeping.

    /// Notify the whole-key dependency.
    pub fn trigger(&self, key: &str) {
        let dep = self.keys.read().get(key).cloned();
        if let Some(dep) = dep {
            trace!(key, "trigger key");
            dep.notify();
        }
    }

    /// Notify exactly the property dependency; never the owning key.
    pub fn trigger_property(&self, key: &str, prop: &str) {
        let dep = self
            .key_props
            .read()
            .get(&(key.to_owned(), prop.to_owned()))
            .cloned();
        if let Some(dep) = dep {
            trace!(key, prop, "trigger property");
            dep.notify();
        }
    }

    /// Notify the item dependency and every property dependency nested
    /// under the item. A bulk item replacement invalidates all derived
    /// property reads. The enclosing collection is *not* notified.
    pub fn trigger_item(&self, collection: &str, id: &str) {
        let selector = (collection.to_owned(), id.to_owned());
        let mut pending: Vec<Dep> = Vec::new();
        if let Some(dep) = self.items.read().get(&selector) {
            pending.push(dep.clone());
        }
        if let Some(props) = self.item_props.read().get(&selector) {
            pending.extend(props.values().cloned());
        }
        if !pending.is_empty() {
            trace!(collection, id, count = pending.len(), "trigger item");
        }
        for dep in pending {
            dep.notify();
        }
    }

    /// Notify exactly the item-property dependency.
    pub fn trigger_item_property(&self, collection: &str, id: &str, prop: &str) {
        let dep = self
            .item_props
            .read()
            .get(&(collection.to_owned(), id.to_owned()))
            .and_then(|props| props.get(prop))
            .cloned();
        if let Some(dep) = dep {
            trace!(collection, id, prop, "trigger item property");
            dep.notify();
        }
    }

    /// Notify the collection dependency: the structural-change signal,
    /// distinct from any per-item notification.
    pub fn trigger_collection(&self, collection: &str) {
        let dep = self.keys.read().get(collection).cloned();
        if let Some(dep) = dep {
            trace!(collection, "trigger collection");
            dep.notify();
        }
    }

    /// Structural-add variant: an item appeared, observers refreshing the
    /// item list need to run.
    pub fn trigger_add(&self, collection: &str) {
        self.trigger_collection(collection);
    }

    /// Item removal, in fixed order: per-item observers react first, the
    /// collection is notified second, and only then is the item's
    /// bookkeeping discarded.
    pub fn trigger_remove(&self, collection: &str, id: &str) {
        self.trigger_item(collection, id);
        self.trigger_collection(collection);
        self.remove_item_dependency(collection, id);
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Discard the item dependency and every property dependency nested
    /// under it, so a recreated item under the same id starts from a clean
    /// slate.
    pub fn remove_item_dependency(&self, collection: &str, id: &str) {
        let selector = (collection.to_owned(), id.to_owned());
        let removed_item = self.items.write().shift_remove(&selector).is_some();
        let removed_props = self.item_props.write().shift_remove(&selector).is_some();
        if removed_item || removed_props {
            debug!(collection, id, "removed item dependency");
        }
    }

    /// Drop every dependency at every level.
    pub fn clear(&self) {
        self.keys.write().clear();
        self.key_props.write().clear();
        self.items.write().clear();
        self.item_props.write().clear();
        debug!("cleared dependency registry");
    }

    /// Total number of live dependencies across all four tables.
    pub fn dependency_count(&self) -> usize {
        self.keys.read().len()
            + self.key_props.read().len()
            + self.items.read().len()
            + self
                .item_props
                .read()
                .values()
                .map(IndexMap::len)
                .sum::<usize>()
    }

    /// Whether no dependency exists at any level.
    pub fn is_empty(&self) -> bool {
        self.dependency_count() == 0
    }
}

impl Default for DependencyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DependencyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyRegistry")
            .field("has_adapter", &self.adapter.is_some())
            .field("keys", &self.keys.read().len())
            .field("key_props", &self.key_props.read().len())
            .field("items", &self.items.read().len())
            .field("item_props", &self.item_props.read().len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
