//! Interception Layer
//!
//! Wrapper handles over plain [`Value`](crate::value::Value) state, so
//! ordinary reads and writes transparently become track/trigger calls into
//! the [`DependencyRegistry`](crate::registry::DependencyRegistry).
//!
//! # Axes
//!
//! Wrapping varies along three axes:
//!
//! - **Depth**: [`Depth::Shallow`] intercepts only the wrapped node's own
//!   properties (nested values come back unwrapped); [`Depth::Deep`]
//!   recursively wraps every composite child, extending the path.
//! - **Mutability**: [`TrackedValue`] permits writes; [`ReadonlyValue`]
//!   rejects every write with a descriptive error and leaves the target
//!   untouched.
//! - **Scope**: [`Scope::Key`] addresses whole-key/property selectors;
//!   [`Scope::Item`] addresses collection/id/property selectors.
//!
//! # Identity and Cycles
//!
//! All wrappers produced from one root wrap share a single identity cache
//! keyed on node identity. The same underlying node always yields the same
//! wrapper within that traversal, and re-encountering a node mid-descent
//! (a cycle) returns the cached wrapper instead of recursing.

mod node;
mod readonly;
mod tracked;

pub use readonly::{ReadonlyList, ReadonlyValue};
pub use tracked::{TrackedList, TrackedValue};

use std::fmt;

use crate::value::{SharedValue, Value};

/// How far wrapping descends into the value tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// Intercept only the wrapped node's own properties.
    Shallow,
    /// Recursively wrap composite children, extending the path.
    Deep,
}

/// Which selector family a wrapper addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Whole-key state: the root maps to the key dependency, nested reads
    /// and writes to key-property dependencies.
    Key(String),
    /// Item state: the root maps to the item dependency, nested reads and
    /// writes to item-property dependencies.
    Item { collection: String, id: String },
}

impl Scope {
    /// Key-scoped addressing.
    pub fn key(key: impl Into<String>) -> Self {
        Scope::Key(key.into())
    }

    /// Item-scoped addressing.
    pub fn item(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Scope::Item {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

/// A dot-joined trail of property names, accumulated during descent.
///
/// Empty at the wrap root. Non-root paths are the discriminator for
/// property-level dependencies (`"stats.health"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(String);

impl Path {
    /// The empty path of a wrap root.
    pub fn root() -> Self {
        Path(String::new())
    }

    /// This path extended by one property segment.
    pub fn child(&self, segment: &str) -> Path {
        if self.0.is_empty() {
            Path(segment.to_owned())
        } else {
            Path(format!("{}.{}", self.0, segment))
        }
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw dot-joined form; empty for the root.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// The result of reading one property through a wrapper.
pub enum ValueRead<W> {
    /// A composite child, wrapped (deep mode).
    Wrapped(W),
    /// A composite child, returned as the bare handle (shallow mode).
    Raw(SharedValue),
    /// A non-composite value, cloned out.
    Leaf(Value),
}

impl<W> ValueRead<W> {
    /// The wrapper, if this read produced one.
    pub fn wrapped(self) -> Option<W> {
        match self {
            ValueRead::Wrapped(w) => Some(w),
            _ => None,
        }
    }

    /// The bare handle, if this read produced one.
    pub fn raw(self) -> Option<SharedValue> {
        match self {
            ValueRead::Raw(v) => Some(v),
            _ => None,
        }
    }

    /// The leaf value, if this read produced one.
    pub fn leaf(self) -> Option<Value> {
        match self {
            ValueRead::Leaf(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_join_with_dots() {
        let root = Path::root();
        assert!(root.is_root());
        assert_eq!(root.as_str(), "");
        assert_eq!(root.to_string(), "<root>");

        let stats = root.child("stats");
        let health = stats.child("health");
        assert_eq!(stats.as_str(), "stats");
        assert_eq!(health.as_str(), "stats.health");
        assert_eq!(health.to_string(), "stats.health");
    }
}
