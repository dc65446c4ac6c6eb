//! Error Types
//!
//! The error taxonomy of the tracking core:
//!
//! - Invalid configuration (e.g. a multi-adapter built without any backing
//!   adapters) fails immediately at the offending call.
//! - Illegal mutation (any write through a read-only wrapper) fails
//!   synchronously at the disallowed operation, carrying the offending path.
//! - Shape misuse (mutating an object slot on a list, writing past the end
//!   of a list) fails at the call site with the addressed path.
//!
//! Tracking and triggering themselves never error: with no adapter
//! configured, every such operation degrades to a no-op, so instrumentation
//! cannot crash otherwise-correct application code. Listener errors are not
//! part of this enum; the event channel routes them per its configured
//! policy.

use thiserror::Error;

use crate::value::ValueKind;

pub type Result<T> = std::result::Result<T, TrellisError>;

/// Errors surfaced by the tracking core.
#[derive(Debug, Error)]
pub enum TrellisError {
    /// A multi-adapter was constructed without any backing adapters.
    #[error("multi-adapter requires at least one backing adapter")]
    EmptyAdapters,

    /// A write or delete was attempted through a read-only wrapper.
    #[error("cannot mutate read-only state at `{path}`")]
    ReadOnly {
        /// The path of the slot the mutation addressed.
        path: String,
    },

    /// A mutation addressed a value of the wrong shape.
    #[error("expected {expected} at `{path}`, found {found}")]
    KindMismatch {
        /// The path of the value the mutation addressed.
        path: String,
        /// The shape the operation requires.
        expected: ValueKind,
        /// The shape actually found there.
        found: ValueKind,
    },

    /// A list write addressed an index past the end of the list.
    #[error("index {index} out of bounds at `{path}` (len {len})")]
    IndexOutOfBounds {
        /// The path of the list.
        path: String,
        /// The index the write addressed.
        index: usize,
        /// The list length at the time of the write.
        len: usize,
    },
}
