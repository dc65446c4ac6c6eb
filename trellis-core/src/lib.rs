//! Trellis Core
//!
//! Runtime-agnostic dependency tracking. This crate sits between an
//! application's mutable state and any number of pluggable host reactive
//! runtimes, letting a runtime observe fine-grained reads and writes of a
//! value tree (at whole-key, per-item, per-property, and per-item-property
//! granularity) without the state owner adopting that runtime's API.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `adapter`: the contracts a host runtime implements (`Adapter`,
//!   `Dependency`)
//! - `registry`: the multi-level dependency registry (track/trigger
//!   semantics)
//! - `wrap`: the interception layer, wrapper handles that turn plain
//!   reads/writes into track/trigger calls
//! - `composite`: fan-out so several runtimes observe the same state at
//!   once
//! - `events`: an independent type-keyed publish/subscribe channel
//! - `tracker`: the facade composing a registry and a channel
//!
//! With no adapter configured, every tracking and triggering operation is
//! a safe no-op: instrumentation can never crash application code that
//! runs without a host runtime attached.
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::{Depth, Tracker, Value};
//!
//! let tracker = Tracker::with_adapter(my_runtime_adapter());
//!
//! // Wrap plain state; reads and writes now drive the registry.
//! let config = tracker
//!     .wrap("config", Value::object([("theme", Value::from("dark"))]), Depth::Deep)
//!     .tracked()
//!     .unwrap();
//!
//! let theme = config.get("theme");      // tracks `config` / `theme`
//! config.set("theme", "light")?;        // notifies exactly `theme`
//!
//! // Or drive the registry explicitly.
//! tracker.track_item_property("users", "u1", "score");
//! tracker.trigger_item("users", "u1");
//! ```

pub mod adapter;
pub mod composite;
pub mod error;
pub mod events;
pub mod registry;
pub mod tracker;
pub mod value;
pub mod wrap;

pub use adapter::{Adapter, Dependency, DisposeCallback};
pub use composite::{CompositeDependency, MultiAdapter};
pub use error::{Result, TrellisError};
pub use events::{BoxError, EventChannel, ListenerId};
pub use registry::DependencyRegistry;
pub use tracker::{Tracker, WrappedState};
pub use value::{SharedValue, Value, ValueKind};
pub use wrap::{
    Depth, Path, ReadonlyList, ReadonlyValue, Scope, TrackedList, TrackedValue, ValueRead,
};
