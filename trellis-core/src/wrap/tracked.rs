//! Mutable Wrappers
//!
//! [`TrackedValue`] turns field reads into track calls and field writes
//! into trigger calls. [`TrackedList`] is the list view over the same
//! wrapped node, with the conservative aggregate policy for mutating and
//! iterating operations: anything that can touch every element addresses
//! the list's own path, not per-index selectors.

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;

use crate::error::{Result, TrellisError};
use crate::registry::DependencyRegistry;
use crate::value::{SharedValue, Value, ValueKind};

use super::node::{ChildRead, WrapCore};
use super::{Depth, Scope, ValueRead};

/// A mutable wrapper over one node of the state tree.
///
/// Cheap to clone; clones share the node, the path, and the traversal's
/// identity cache.
#[derive(Clone)]
pub struct TrackedValue {
    core: Arc<WrapCore>,
}

impl TrackedValue {
    /// Wrap a value as a new traversal root.
    pub fn new(
        registry: Arc<DependencyRegistry>,
        scope: Scope,
        target: SharedValue,
        depth: Depth,
    ) -> Self {
        Self {
            core: WrapCore::root(registry, scope, depth, target),
        }
    }

    /// Wrap key-scoped state.
    pub fn wrap_key(
        registry: Arc<DependencyRegistry>,
        key: impl Into<String>,
        value: Value,
        depth: Depth,
    ) -> Self {
        Self::new(registry, Scope::key(key), value.into_shared(), depth)
    }

    /// Wrap item-scoped state.
    pub fn wrap_item(
        registry: Arc<DependencyRegistry>,
        collection: impl Into<String>,
        id: impl Into<String>,
        value: Value,
        depth: Depth,
    ) -> Self {
        Self::new(registry, Scope::item(collection, id), value.into_shared(), depth)
    }

    pub(crate) fn from_core(core: Arc<WrapCore>) -> Self {
        Self { core }
    }

    /// Whether two wrappers are the same handle from the same traversal.
    pub fn ptr_eq(a: &TrackedValue, b: &TrackedValue) -> bool {
        Arc::ptr_eq(&a.core, &b.core)
    }

    /// The dot-joined path of this wrapper; empty at the root.
    pub fn path(&self) -> &str {
        self.core.path.as_str()
    }

    /// The shape of the wrapped node.
    pub fn kind(&self) -> ValueKind {
        self.core.kind()
    }

    /// The wrapped node's bare handle.
    pub fn target(&self) -> &SharedValue {
        &self.core.target
    }

    /// Read one property. Tracks the child path even when the property is
    /// absent, so an observer re-runs once the property appears.
    pub fn get(&self, prop: &str) -> Option<ValueRead<TrackedValue>> {
        self.core.track_child(prop);
        let child = self.core.object_child(prop)?;
        Some(match self.core.classify_child(child, prop) {
            ChildRead::Core(core) => ValueRead::Wrapped(TrackedValue::from_core(core)),
            ChildRead::Raw(value) => ValueRead::Raw(value),
            ChildRead::Leaf(value) => ValueRead::Leaf(value),
        })
    }

    /// Write one property, then trigger its path.
    pub fn set(&self, prop: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.core.with_object_mut(|map| {
            map.insert(prop.to_owned(), value.into_shared());
        })?;
        self.core.trigger_child(prop);
        Ok(())
    }

    /// Delete one property. Triggers its path when something was removed;
    /// returns the removed value.
    pub fn remove(&self, prop: &str) -> Result<Option<Value>> {
        let removed = self
            .core
            .with_object_mut(|map| map.shift_remove(prop))?;
        match removed {
            Some(node) => {
                self.core.trigger_child(prop);
                let value = node.read().clone();
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Property names in insertion order. Tracks the node itself.
    pub fn keys(&self) -> Vec<String> {
        self.core.track_self();
        self.core.object_keys()
    }

    /// Whether the property exists. Tracks the child path.
    pub fn contains(&self, prop: &str) -> bool {
        self.core.track_child(prop);
        self.core.object_contains(prop)
    }

    /// A detached deep copy of the wrapped subtree. Tracks the node itself.
    pub fn snapshot(&self) -> Value {
        self.core.track_self();
        self.core.snapshot()
    }

    /// The list view of this node, when it wraps a list.
    pub fn as_list(&self) -> Option<TrackedList> {
        match self.kind() {
            ValueKind::List => Some(TrackedList {
                core: self.core.clone(),
            }),
            _ => None,
        }
    }
}

impl std::fmt::Debug for TrackedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedValue")
            .field("path", &self.core.path)
            .field("kind", &self.kind())
            .finish()
    }
}

/// The list view over a wrapped node.
///
/// Index reads track `<path>.<index>` and length reads track
/// `<path>.length`. Mutating operations delegate to the underlying vector
/// and then trigger the list's own path once; iterating operations track
/// the list's own path before delegating.
#[derive(Clone)]
pub struct TrackedList {
    core: Arc<WrapCore>,
}

impl TrackedList {
    /// The dot-joined path of this list; empty at the root.
    pub fn path(&self) -> &str {
        self.core.path.as_str()
    }

    /// Element count. Tracks `<path>.length`.
    pub fn len(&self) -> usize {
        self.core.track_child("length");
        self.core.list_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one element. Tracks `<path>.<index>` even past the end.
    pub fn index(&self, index: usize) -> Option<ValueRead<TrackedValue>> {
        let segment = index.to_string();
        self.core.track_child(&segment);
        let child = self.core.list_item(index)?;
        Some(match self.core.classify_child(child, &segment) {
            ChildRead::Core(core) => ValueRead::Wrapped(TrackedValue::from_core(core)),
            ChildRead::Raw(value) => ValueRead::Raw(value),
            ChildRead::Leaf(value) => ValueRead::Leaf(value),
        })
    }

    /// Write one element. An in-place overwrite triggers
    /// `<path>.<index>`; writing one past the end appends and triggers the
    /// whole list, since the length changes too. Anything further out is
    /// an error.
    pub fn set_index(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let appended = self.core.with_list_mut(|items| {
            if index < items.len() {
                items[index] = value.into_shared();
                Ok(false)
            } else if index == items.len() {
                items.push(value.into_shared());
                Ok(true)
            } else {
                Err(TrellisError::IndexOutOfBounds {
                    path: self.core.path.to_string(),
                    index,
                    len: items.len(),
                })
            }
        })??;
        if appended {
            self.core.trigger_self();
        } else {
            self.core.trigger_child(&index.to_string());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mutating operations: delegate, then trigger the whole list
    // ------------------------------------------------------------------

    /// Append to the end.
    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.core.with_list_mut(|items| {
            items.push(value.into_shared());
        })?;
        self.core.trigger_self();
        Ok(())
    }

    /// Remove from the end.
    pub fn pop(&self) -> Result<Option<Value>> {
        let removed = self.core.with_list_mut(Vec::pop)?;
        self.core.trigger_self();
        Ok(removed.map(|node| node.read().clone()))
    }

    /// Remove from the front.
    pub fn shift(&self) -> Result<Option<Value>> {
        let removed = self.core.with_list_mut(|items| {
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        })?;
        self.core.trigger_self();
        Ok(removed.map(|node| node.read().clone()))
    }

    /// Insert at the front.
    pub fn unshift(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.core.with_list_mut(|items| {
            items.insert(0, value.into_shared());
        })?;
        self.core.trigger_self();
        Ok(())
    }

    /// Remove `delete_count` elements at `start` (both clamped) and insert
    /// `insert` in their place. Returns the removed values.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        insert: Vec<Value>,
    ) -> Result<Vec<Value>> {
        let removed = self.core.with_list_mut(|items| {
            let start = start.min(items.len());
            let end = start.saturating_add(delete_count).min(items.len());
            let replacement: Vec<SharedValue> =
                insert.into_iter().map(Value::into_shared).collect();
            items
                .splice(start..end, replacement)
                .collect::<Vec<SharedValue>>()
        })?;
        self.core.trigger_self();
        Ok(removed.into_iter().map(|node| node.read().clone()).collect())
    }

    /// Sort by the given comparator over element snapshots.
    pub fn sort_by(&self, mut compare: impl FnMut(&Value, &Value) -> CmpOrdering) -> Result<()> {
        self.core.with_list_mut(|items| {
            items.sort_by(|a, b| compare(&a.read(), &b.read()));
        })?;
        self.core.trigger_self();
        Ok(())
    }

    /// Reverse in place.
    pub fn reverse(&self) -> Result<()> {
        self.core.with_list_mut(|items| items.reverse())?;
        self.core.trigger_self();
        Ok(())
    }

    /// Fill `start..end` (clamped; `end` defaults to the length) with the
    /// given value. Every filled slot aliases one shared handle.
    pub fn fill(&self, value: impl Into<Value>, start: usize, end: Option<usize>) -> Result<()> {
        let handle = value.into().into_shared();
        self.core.with_list_mut(|items| {
            let len = items.len();
            let start = start.min(len);
            let end = end.unwrap_or(len).min(len);
            for slot in items[start..end.max(start)].iter_mut() {
                *slot = handle.clone();
            }
        })?;
        self.core.trigger_self();
        Ok(())
    }

    /// Copy `start..end` (clamped; `end` defaults to the length) over the
    /// elements starting at `target`, without changing the length. Copies
    /// handles, not values.
    pub fn copy_within(&self, target: usize, start: usize, end: Option<usize>) -> Result<()> {
        self.core.with_list_mut(|items| {
            let len = items.len();
            let target = target.min(len);
            let start = start.min(len);
            let end = end.unwrap_or(len).min(len);
            let window: Vec<SharedValue> = items[start..end.max(start)].to_vec();
            for (offset, handle) in window.into_iter().enumerate() {
                let slot = target + offset;
                if slot >= len {
                    break;
                }
                items[slot] = handle;
            }
        })?;
        self.core.trigger_self();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Iterating operations: track the whole list, then delegate
    // ------------------------------------------------------------------

    fn items(&self) -> Vec<SharedValue> {
        self.core.track_self();
        self.core.list_snapshot()
    }

    pub fn for_each(&self, mut visit: impl FnMut(&SharedValue)) {
        for item in self.items() {
            visit(&item);
        }
    }

    pub fn map<T>(&self, mut transform: impl FnMut(&SharedValue) -> T) -> Vec<T> {
        self.items().iter().map(|item| transform(item)).collect()
    }

    pub fn filter(&self, mut keep: impl FnMut(&SharedValue) -> bool) -> Vec<SharedValue> {
        self.items().into_iter().filter(|item| keep(item)).collect()
    }

    pub fn find(&self, mut matches: impl FnMut(&SharedValue) -> bool) -> Option<SharedValue> {
        self.items().into_iter().find(|item| matches(item))
    }

    pub fn position(&self, mut matches: impl FnMut(&SharedValue) -> bool) -> Option<usize> {
        self.items().iter().position(|item| matches(item))
    }

    pub fn any(&self, mut matches: impl FnMut(&SharedValue) -> bool) -> bool {
        self.items().iter().any(|item| matches(item))
    }

    pub fn all(&self, mut matches: impl FnMut(&SharedValue) -> bool) -> bool {
        self.items().iter().all(|item| matches(item))
    }

    pub fn fold<A>(&self, init: A, mut step: impl FnMut(A, &SharedValue) -> A) -> A {
        self.items().iter().fold(init, |acc, item| step(acc, item))
    }

    pub fn rfold<A>(&self, init: A, mut step: impl FnMut(A, &SharedValue) -> A) -> A {
        self.items()
            .iter()
            .rev()
            .fold(init, |acc, item| step(acc, item))
    }
}

impl std::fmt::Debug for TrackedList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedList")
            .field("path", &self.core.path)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
