//! Value Tree
//!
//! The observable state model. Application state is held as a tree of
//! [`Value`] nodes; every child of an object or list is a [`SharedValue`]
//! handle, so the same node can appear in several places (and a node can,
//! transitively, contain itself). Node identity is `Arc` pointer identity,
//! which is what the interception layer keys its identity cache on.
//!
//! Only the composite kinds, [`Value::Object`] and [`Value::List`], are
//! eligible for wrapping. Everything else, including [`Value::Opaque`]
//! (the escape hatch for host values the tree does not model: dates,
//! patterns, set- and map-likes, errors, futures), passes through the
//! interception layer unwrapped.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

/// A shared, mutable handle to one node of the state tree.
pub type SharedValue = Arc<RwLock<Value>>;

/// One node of the observable state tree.
#[derive(Clone)]
pub enum Value {
    /// The absent value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A string.
    Str(String),
    /// A string-keyed map of child nodes. Insertion order is preserved.
    Object(IndexMap<String, SharedValue>),
    /// An ordered sequence of child nodes.
    List(Vec<SharedValue>),
    /// A host value the tree does not model. Never wrapped, never tracked.
    Opaque(Arc<dyn Any + Send + Sync>),
}

/// The shape of a [`Value`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Object,
    List,
    Opaque,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Str => "string",
            ValueKind::Object => "object",
            ValueKind::List => "list",
            ValueKind::Opaque => "opaque",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Build an object node from `(key, value)` pairs.
    pub fn object<K, I>(entries: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into_shared()))
                .collect(),
        )
    }

    /// Build a list node from values.
    pub fn list<I>(items: I) -> Value
    where
        I: IntoIterator<Item = Value>,
    {
        Value::List(items.into_iter().map(Value::into_shared).collect())
    }

    /// Move this value behind a shared handle.
    pub fn into_shared(self) -> SharedValue {
        Arc::new(RwLock::new(self))
    }

    /// The shape of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::Object(_) => ValueKind::Object,
            Value::List(_) => ValueKind::List,
            Value::Opaque(_) => ValueKind::Opaque,
        }
    }

    /// Whether this value is eligible for wrapping (object or list).
    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Object(_) | Value::List(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Direct, untracked access to an object child.
    pub fn child(&self, key: &str) -> Option<SharedValue> {
        match self {
            Value::Object(map) => map.get(key).cloned(),
            _ => None,
        }
    }

    /// Direct, untracked access to a list element.
    pub fn element(&self, index: usize) -> Option<SharedValue> {
        match self {
            Value::List(items) => items.get(index).cloned(),
            _ => None,
        }
    }

    /// A detached deep copy of this subtree.
    ///
    /// `Clone` on a composite is shallow (children stay shared); this
    /// produces fresh handles all the way down. Only meaningful for acyclic
    /// subtrees.
    pub fn deep_clone(&self) -> Value {
        match self {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.read().deep_clone().into_shared()))
                    .collect(),
            ),
            Value::List(items) => Value::List(
                items
                    .iter()
                    .map(|v| v.read().deep_clone().into_shared())
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

/// Structural equality. Composites compare children recursively; `Opaque`
/// compares by handle identity. Only meaningful for acyclic subtrees.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, va)| {
                        b.get(key).is_some_and(|vb| *va.read() == *vb.read())
                    })
            }
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(va, vb)| *va.read() == *vb.read())
            }
            (Value::Opaque(a), Value::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(n) => write!(f, "Float({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Object(map) => {
                let mut dbg = f.debug_map();
                for (k, v) in map {
                    dbg.entry(k, &*v.read());
                }
                dbg.finish()
            }
            Value::List(items) => {
                let mut dbg = f.debug_list();
                for v in items {
                    dbg.entry(&*v.read());
                }
                dbg.finish()
            }
            Value::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Value {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Value {
        Value::list(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_produce_the_expected_shapes() {
        let state = Value::object([
            ("name", Value::from("ada")),
            ("score", Value::from(42)),
            ("tags", Value::list([Value::from("a"), Value::from("b")])),
        ]);

        assert_eq!(state.kind(), ValueKind::Object);
        assert!(state.is_composite());

        let tags = state.child("tags").unwrap();
        assert_eq!(tags.read().kind(), ValueKind::List);
        assert_eq!(
            tags.read().element(1).unwrap().read().as_str(),
            Some("b")
        );
    }

    #[test]
    fn clone_is_shallow_deep_clone_detaches() {
        let original = Value::object([("n", Value::from(1))]);
        let shallow = original.clone();
        let deep = original.deep_clone();

        // Mutating through the original's child handle is visible to the
        // shallow copy but not to the deep one.
        *original.child("n").unwrap().write() = Value::Int(2);

        assert_eq!(shallow.child("n").unwrap().read().as_i64(), Some(2));
        assert_eq!(deep.child("n").unwrap().read().as_i64(), Some(1));
    }

    #[test]
    fn structural_equality() {
        let a = Value::object([("x", Value::from(1)), ("y", Value::list([Value::from(2)]))]);
        let b = Value::object([("x", Value::from(1)), ("y", Value::list([Value::from(2)]))]);
        let c = Value::object([("x", Value::from(1)), ("y", Value::list([Value::from(3)]))]);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn opaque_compares_by_identity() {
        let handle: Arc<dyn Any + Send + Sync> = Arc::new("anything");
        let a = Value::Opaque(handle.clone());
        let b = Value::Opaque(handle);
        let c = Value::Opaque(Arc::new("anything"));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.is_composite());
    }
}
