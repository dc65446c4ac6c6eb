//! Host Runtime Contracts
//!
//! The seam between the tracking core and pluggable host reactive runtimes.
//! A host runtime supplies an [`Adapter`], which manufactures [`Dependency`]
//! handles on demand. The core never learns anything else about the runtime:
//! `depend()` on a read, `notify()` on a write is the entire protocol.
//!
//! Everything beyond `create()` is optional. A runtime without a scope probe
//! is treated as always observing; a runtime without a dispose hook simply
//! drops cleanup requests; a runtime without a native wrapping primitive
//! gets the generic interception layer.

use std::any::Any;
use std::sync::Arc;

use crate::value::SharedValue;

/// A cleanup callback forwarded to a host runtime's dispose hook.
pub type DisposeCallback = Arc<dyn Fn() + Send + Sync>;

/// One observable slot, as seen by a host runtime.
///
/// The minimal common denominator every runtime must implement:
/// register-the-current-observer, and notify-registered-observers.
pub trait Dependency: Send + Sync {
    /// Register the currently observing computation on this slot.
    fn depend(&self);

    /// Notify every observer previously registered on this slot.
    fn notify(&self);

    /// Concrete-type access. Lets the multi-adapter recover its own
    /// composite handle from a `dyn Dependency`.
    fn as_any(&self) -> &dyn Any;
}

/// Factory for [`Dependency`] handles, supplied by one host runtime.
pub trait Adapter: Send + Sync {
    /// Produce a fresh dependency handle.
    fn create(&self) -> Arc<dyn Dependency>;

    /// Whether an observing context is currently active.
    ///
    /// Runtimes without a probe keep the default: always active.
    fn is_in_scope(&self) -> bool {
        true
    }

    /// Ask the runtime to run `callback` when the current observing context
    /// ends, on behalf of `dependency`.
    ///
    /// Runtimes without a dispose hook keep the default, which drops the
    /// request.
    fn on_dispose(&self, callback: DisposeCallback, dependency: &Arc<dyn Dependency>) {
        let _ = (callback, dependency);
    }

    /// Native fast-path: wrap `value` with the runtime's own reactive
    /// primitive instead of the generic interception layer.
    ///
    /// Returning `None` (the default) selects the generic layer. Only
    /// key-scoped mutable wraps ever consult this; item-scoped and
    /// read-only wraps cannot be expressed by a generic native primitive.
    fn wrap_reactive(&self, value: &SharedValue) -> Option<SharedValue> {
        let _ = value;
        None
    }
}
