//! Read-Only Wrappers
//!
//! Identical read tracking to the mutable family; every write or delete,
//! direct or through the list view, fails with
//! [`TrellisError::ReadOnly`] carrying the offending path, and the
//! underlying target is left unmodified. This is a hard contract: the
//! read-only variants never delegate to a host runtime's native wrapping
//! primitive, which could not enforce it.

use std::sync::Arc;

use crate::error::{Result, TrellisError};
use crate::registry::DependencyRegistry;
use crate::value::{SharedValue, Value, ValueKind};

use super::node::{ChildRead, WrapCore};
use super::{Depth, Scope, ValueRead};

/// A read-only wrapper over one node of the state tree.
#[derive(Clone)]
pub struct ReadonlyValue {
    core: Arc<WrapCore>,
}

impl ReadonlyValue {
    /// Wrap a value as a new read-only traversal root.
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

    /// Wrap key-scoped state read-only.
    pub fn wrap_key(
        registry: Arc<DependencyRegistry>,
        key: impl Into<String>,
        value: Value,
        depth: Depth,
    ) -> Self {
        Self::new(registry, Scope::key(key), value.into_shared(), depth)
    }

    /// Wrap item-scoped state read-only.
    pub fn wrap_item(
        registry: Arc<DependencyRegistry>,
        collection: impl Into<String>,
        id: impl Into<String>,
        value: Value,
        depth: Depth,
    ) -> Self {
        Self::new(registry, Scope::item(collection, id), value.into_shared(), depth)
    }

    fn from_core(core: Arc<WrapCore>) -> Self {
        Self { core }
    }

    /// Whether two wrappers are the same handle from the same traversal.
    pub fn ptr_eq(a: &ReadonlyValue, b: &ReadonlyValue) -> bool {
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

    /// Read one property. Tracks the child path even when absent.
    pub fn get(&self, prop: &str) -> Option<ValueRead<ReadonlyValue>> {
        self.core.track_child(prop);
        let child = self.core.object_child(prop)?;
        Some(match self.core.classify_child(child, prop) {
            ChildRead::Core(core) => ValueRead::Wrapped(ReadonlyValue::from_core(core)),
            ChildRead::Raw(value) => ValueRead::Raw(value),
            ChildRead::Leaf(value) => ValueRead::Leaf(value),
        })
    }

    /// Rejected: this wrapper is read-only.
    pub fn set(&self, prop: &str, _value: impl Into<Value>) -> Result<()> {
        Err(TrellisError::ReadOnly {
            path: self.core.path.child(prop).to_string(),
        })
    }

    /// Rejected: this wrapper is read-only.
    pub fn remove(&self, prop: &str) -> Result<Option<Value>> {
        Err(TrellisError::ReadOnly {
            path: self.core.path.child(prop).to_string(),
        })
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

    /// The read-only list view of this node, when it wraps a list.
    pub fn as_list(&self) -> Option<ReadonlyList> {
        match self.kind() {
            ValueKind::List => Some(ReadonlyList {
                core: self.core.clone(),
            }),
            _ => None,
        }
    }
}

impl std::fmt::Debug for ReadonlyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadonlyValue")
            .field("path", &self.core.path)
            .field("kind", &self.kind())
            .finish()
    }
}

/// The read-only list view over a wrapped node.
#[derive(Clone)]
pub struct ReadonlyList {
    core: Arc<WrapCore>,
}

impl ReadonlyList {
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
    pub fn index(&self, index: usize) -> Option<ValueRead<ReadonlyValue>> {
        let segment = index.to_string();
        self.core.track_child(&segment);
        let child = self.core.list_item(index)?;
        Some(match self.core.classify_child(child, &segment) {
            ChildRead::Core(core) => ValueRead::Wrapped(ReadonlyValue::from_core(core)),
            ChildRead::Raw(value) => ValueRead::Raw(value),
            ChildRead::Leaf(value) => ValueRead::Leaf(value),
        })
    }

    fn rejected<T>(&self) -> Result<T> {
        Err(TrellisError::ReadOnly {
            path: self.core.path.to_string(),
        })
    }

    /// Rejected: this wrapper is read-only.
    pub fn set_index(&self, index: usize, _value: impl Into<Value>) -> Result<()> {
        Err(TrellisError::ReadOnly {
            path: self.core.path.child(&index.to_string()).to_string(),
        })
    }

    /// Rejected: this wrapper is read-only.
    pub fn push(&self, _value: impl Into<Value>) -> Result<()> {
        self.rejected()
    }

    /// Rejected: this wrapper is read-only.
    pub fn pop(&self) -> Result<Option<Value>> {
        self.rejected()
    }

    /// Rejected: this wrapper is read-only.
    pub fn shift(&self) -> Result<Option<Value>> {
        self.rejected()
    }

    /// Rejected: this wrapper is read-only.
    pub fn unshift(&self, _value: impl Into<Value>) -> Result<()> {
        self.rejected()
    }

    /// Rejected: this wrapper is read-only.
    pub fn splice(
        &self,
        _start: usize,
        _delete_count: usize,
        _insert: Vec<Value>,
    ) -> Result<Vec<Value>> {
        self.rejected()
    }

    /// Rejected: this wrapper is read-only.
    pub fn sort_by(
        &self,
        _compare: impl FnMut(&Value, &Value) -> std::cmp::Ordering,
    ) -> Result<()> {
        self.rejected()
    }

    /// Rejected: this wrapper is read-only.
    pub fn reverse(&self) -> Result<()> {
        self.rejected()
    }

    /// Rejected: this wrapper is read-only.
    pub fn fill(&self, _value: impl Into<Value>, _start: usize, _end: Option<usize>) -> Result<()> {
        self.rejected()
    }

    /// Rejected: this wrapper is read-only.
    pub fn copy_within(&self, _target: usize, _start: usize, _end: Option<usize>) -> Result<()> {
        self.rejected()
    }

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

impl std::fmt::Debug for ReadonlyList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadonlyList")
            .field("path", &self.core.path)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::adapter::{Adapter, Dependency};

    struct CountingDependency {
        depends: AtomicUsize,
    }

    impl Dependency for CountingDependency {
        fn depend(&self) {
            self.depends.fetch_add(1, Ordering::SeqCst);
        }

        fn notify(&self) {}

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct CountingAdapter;

    impl Adapter for CountingAdapter {
        fn create(&self) -> Arc<dyn Dependency> {
            Arc::new(CountingDependency {
                depends: AtomicUsize::new(0),
            })
        }
    }

    fn state() -> Value {
        Value::object([
            ("title", Value::from("frozen")),
            ("stats", Value::object([("health", Value::from(100))])),
            ("tags", Value::list([Value::from("a"), Value::from("b")])),
        ])
    }

    fn readonly() -> (ReadonlyValue, Arc<DependencyRegistry>) {
        let registry = Arc::new(DependencyRegistry::with_adapter(Arc::new(CountingAdapter)));
        let wrapper = ReadonlyValue::wrap_key(registry.clone(), "config", state(), Depth::Deep);
        (wrapper, registry)
    }

    #[test]
    fn reads_track_like_the_mutable_family() {
        let (wrapper, registry) = readonly();

        let stats = wrapper.get("stats").unwrap().wrapped().unwrap();
        let health = stats.get("health").unwrap().leaf().unwrap();
        assert_eq!(health.as_i64(), Some(100));

        let dep = registry.property_dependency("config", "stats.health").unwrap();
        let counting = dep.as_any().downcast_ref::<CountingDependency>().unwrap();
        assert_eq!(counting.depends.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn every_object_mutation_is_rejected_and_harmless() {
        let (wrapper, _) = readonly();
        let before = wrapper.core.snapshot();

        let err = wrapper.set("title", "thawed").unwrap_err();
        assert!(matches!(err, TrellisError::ReadOnly { ref path } if path == "title"));

        let stats = wrapper.get("stats").unwrap().wrapped().unwrap();
        let err = stats.set("health", 0).unwrap_err();
        assert!(matches!(err, TrellisError::ReadOnly { ref path } if path == "stats.health"));

        let err = wrapper.remove("title").unwrap_err();
        assert!(matches!(err, TrellisError::ReadOnly { .. }));

        assert_eq!(wrapper.core.snapshot(), before);
    }

    #[test]
    fn every_list_mutation_is_rejected_and_harmless() {
        let (wrapper, _) = readonly();
        let list = wrapper.get("tags").unwrap().wrapped().unwrap().as_list().unwrap();
        let before = wrapper.core.snapshot();

        assert!(matches!(list.push("c"), Err(TrellisError::ReadOnly { .. })));
        assert!(matches!(list.pop(), Err(TrellisError::ReadOnly { .. })));
        assert!(matches!(list.shift(), Err(TrellisError::ReadOnly { .. })));
        assert!(matches!(list.unshift("c"), Err(TrellisError::ReadOnly { .. })));
        assert!(matches!(
            list.splice(0, 1, Vec::new()),
            Err(TrellisError::ReadOnly { .. })
        ));
        assert!(matches!(
            list.sort_by(|_, _| std::cmp::Ordering::Equal),
            Err(TrellisError::ReadOnly { .. })
        ));
        assert!(matches!(list.reverse(), Err(TrellisError::ReadOnly { .. })));
        assert!(matches!(
            list.fill(0, 0, None),
            Err(TrellisError::ReadOnly { .. })
        ));
        assert!(matches!(
            list.copy_within(0, 0, None),
            Err(TrellisError::ReadOnly { .. })
        ));
        assert!(matches!(
            list.set_index(0, 1),
            Err(TrellisError::ReadOnly { ref path }) if path == "tags.0"
        ));

        assert_eq!(wrapper.core.snapshot(), before);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn readonly_identity_is_stable() {
        let (wrapper, _) = readonly();

        let first = wrapper.get("stats").unwrap().wrapped().unwrap();
        let second = wrapper.get("stats").unwrap().wrapped().unwrap();
        assert!(ReadonlyValue::ptr_eq(&first, &second));
    }

    #[test]
    fn list_reads_still_work() {
        let (wrapper, _) = readonly();
        let list = wrapper.get("tags").unwrap().wrapped().unwrap().as_list().unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(
            list.index(1).unwrap().leaf().unwrap().as_str(),
            Some("b")
        );
        assert_eq!(list.map(|item| item.read().as_str().unwrap().to_owned()), vec!["a", "b"]);
        assert_eq!(list.position(|item| item.read().as_str() == Some("b")), Some(1));
    }
}
