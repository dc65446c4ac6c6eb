//! Wrap Cores
//!
//! The shared machinery behind every wrapper variant: one [`WrapCore`] per
//! wrapped node, one [`WrapCtx`] per root-wrap call. The context carries the
//! scope, depth, registry handle, and the identity cache; cores carry the
//! node handle and its accumulated path.
//!
//! The cache maps node identity (the `Arc` pointer of the [`SharedValue`])
//! to the core built for it. Cached cores hold the node alive, so a cached
//! pointer can never be recycled while the cache exists. Re-encountering a
//! node, whether through aliasing or a cycle, returns the existing core
//! under the path of its first encounter.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, TrellisError};
use crate::registry::DependencyRegistry;
use crate::value::{SharedValue, Value, ValueKind};

use super::{Depth, Path, Scope};

/// Per-root-wrap shared state.
pub(crate) struct WrapCtx {
    pub(crate) scope: Scope,
    pub(crate) depth: Depth,
    pub(crate) registry: Arc<DependencyRegistry>,
    cache: RwLock<HashMap<usize, Arc<WrapCore>>>,
}

/// Per-node wrap state.
pub(crate) struct WrapCore {
    pub(crate) target: SharedValue,
    pub(crate) path: Path,
    pub(crate) ctx: Arc<WrapCtx>,
}

/// What one child read resolved to, before the wrapper type is chosen.
pub(crate) enum ChildRead {
    Core(Arc<WrapCore>),
    Raw(SharedValue),
    Leaf(Value),
}

fn ident(value: &SharedValue) -> usize {
    Arc::as_ptr(value) as *const () as usize
}

impl WrapCore {
    /// Build the root core of a new traversal, seeding the identity cache
    /// with the root itself so a cycle back to the root resolves to the
    /// same core.
    pub(crate) fn root(
        registry: Arc<DependencyRegistry>,
        scope: Scope,
        depth: Depth,
        target: SharedValue,
    ) -> Arc<WrapCore> {
        let ctx = Arc::new(WrapCtx {
            scope,
            depth,
            registry,
            cache: RwLock::new(HashMap::new()),
        });
        let core = Arc::new(WrapCore {
            target: target.clone(),
            path: Path::root(),
            ctx,
        });
        core.ctx.cache.write().insert(ident(&target), core.clone());
        core
    }

    // ------------------------------------------------------------------
    // Selector dispatch
    // ------------------------------------------------------------------

    fn track_path(&self, path: &Path) {
        match (&self.ctx.scope, path.is_root()) {
            (Scope::Key(key), true) => self.ctx.registry.track(key),
            (Scope::Key(key), false) => self.ctx.registry.track_property(key, path.as_str()),
            (Scope::Item { collection, id }, true) => self.ctx.registry.track_item(collection, id),
            (Scope::Item { collection, id }, false) => self
                .ctx
                .registry
                .track_item_property(collection, id, path.as_str()),
        }
    }

    fn trigger_path(&self, path: &Path) {
        match (&self.ctx.scope, path.is_root()) {
            (Scope::Key(key), true) => self.ctx.registry.trigger(key),
            (Scope::Key(key), false) => self.ctx.registry.trigger_property(key, path.as_str()),
            (Scope::Item { collection, id }, true) => {
                self.ctx.registry.trigger_item(collection, id)
            }
            (Scope::Item { collection, id }, false) => self
                .ctx
                .registry
                .trigger_item_property(collection, id, path.as_str()),
        }
    }

    pub(crate) fn track_self(&self) {
        self.track_path(&self.path);
    }

    pub(crate) fn trigger_self(&self) {
        self.trigger_path(&self.path);
    }

    pub(crate) fn track_child(&self, segment: &str) {
        self.track_path(&self.path.child(segment));
    }

    pub(crate) fn trigger_child(&self, segment: &str) {
        self.trigger_path(&self.path.child(segment));
    }

    // ------------------------------------------------------------------
    // Identity cache
    // ------------------------------------------------------------------

    /// The core for a composite child, cached by node identity.
    fn child_core(&self, child: &SharedValue, segment: &str) -> Arc<WrapCore> {
        let key = ident(child);
        let mut cache = self.ctx.cache.write();
        cache
            .entry(key)
            .or_insert_with(|| {
                Arc::new(WrapCore {
                    target: child.clone(),
                    path: self.path.child(segment),
                    ctx: self.ctx.clone(),
                })
            })
            .clone()
    }

    /// Resolve a child read: composite children wrap in deep mode and pass
    /// through raw in shallow mode; everything else is cloned out as a
    /// leaf.
    pub(crate) fn classify_child(&self, child: SharedValue, segment: &str) -> ChildRead {
        let composite = child.read().is_composite();
        if !composite {
            let value = child.read().clone();
            return ChildRead::Leaf(value);
        }
        match self.ctx.depth {
            Depth::Deep => ChildRead::Core(self.child_core(&child, segment)),
            Depth::Shallow => ChildRead::Raw(child),
        }
    }

    // ------------------------------------------------------------------
    // Untracked target access
    // ------------------------------------------------------------------

    pub(crate) fn kind(&self) -> ValueKind {
        self.target.read().kind()
    }

    pub(crate) fn object_child(&self, prop: &str) -> Option<SharedValue> {
        self.target.read().child(prop)
    }

    pub(crate) fn object_keys(&self) -> Vec<String> {
        match &*self.target.read() {
            Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn object_contains(&self, prop: &str) -> bool {
        match &*self.target.read() {
            Value::Object(map) => map.contains_key(prop),
            _ => false,
        }
    }

    pub(crate) fn list_len(&self) -> usize {
        match &*self.target.read() {
            Value::List(items) => items.len(),
            _ => 0,
        }
    }

    pub(crate) fn list_item(&self, index: usize) -> Option<SharedValue> {
        self.target.read().element(index)
    }

    pub(crate) fn list_snapshot(&self) -> Vec<SharedValue> {
        match &*self.target.read() {
            Value::List(items) => items.clone(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn snapshot(&self) -> Value {
        self.target.read().deep_clone()
    }

    // ------------------------------------------------------------------
    // Mutation plumbing (used by the mutable wrappers only)
    // ------------------------------------------------------------------

    /// Run `mutate` against the target's object map, or fail with the
    /// target's actual shape.
    pub(crate) fn with_object_mut<R>(
        &self,
        mutate: impl FnOnce(&mut indexmap::IndexMap<String, SharedValue>) -> R,
    ) -> Result<R> {
        let mut target = self.target.write();
        match &mut *target {
            Value::Object(map) => Ok(mutate(map)),
            other => Err(TrellisError::KindMismatch {
                path: self.path.to_string(),
                expected: ValueKind::Object,
                found: other.kind(),
            }),
        }
    }

    /// Run `mutate` against the target's element vector, or fail with the
    /// target's actual shape.
    pub(crate) fn with_list_mut<R>(
        &self,
        mutate: impl FnOnce(&mut Vec<SharedValue>) -> R,
    ) -> Result<R> {
        let mut target = self.target.write();
        match &mut *target {
            Value::List(items) => Ok(mutate(items)),
            other => Err(TrellisError::KindMismatch {
                path: self.path.to_string(),
                expected: ValueKind::List,
                found: other.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_core(value: Value) -> Arc<WrapCore> {
        WrapCore::root(
            Arc::new(DependencyRegistry::new()),
            Scope::key("state"),
            Depth::Deep,
            value.into_shared(),
        )
    }

    #[test]
    fn root_is_seeded_into_the_cache() {
        let core = key_core(Value::object([("n", Value::from(1))]));
        let cached = core.child_core(&core.target, "ignored");
        // The root's own identity resolves to the root core, not a new one
        // under the bogus segment.
        assert!(Arc::ptr_eq(&core, &cached));
        assert!(cached.path.is_root());
    }

    #[test]
    fn child_cores_are_cached_by_identity() {
        let core = key_core(Value::object([(
            "stats",
            Value::object([("health", Value::from(100))]),
        )]));

        let stats = core.object_child("stats").unwrap();
        let first = core.child_core(&stats, "stats");
        let second = core.child_core(&stats, "stats");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.path.as_str(), "stats");
    }

    #[test]
    fn mutation_through_the_wrong_shape_is_reported() {
        let core = key_core(Value::list([Value::from(1)]));
        let err = core.with_object_mut(|_| ()).unwrap_err();
        assert!(matches!(err, TrellisError::KindMismatch { .. }));
    }
}
