//! Errors for status parsing and transition validation.

use thiserror::Error;

/// Error in a status lookup or transition check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The requested edge is not in the adjacency table.
    #[error("invalid {machine} transition: {from} -> {to}")]
    InvalidTransition {
        /// Which machine rejected the move ("invoice", "milestone").
        machine: &'static str,
        /// Current status name.
        from: String,
        /// Requested status name.
        to: String,
    },

    /// The status name is not part of the vocabulary.
    #[error("unknown {machine} status {name:?}")]
    UnknownStatus {
        /// Which vocabulary was consulted.
        machine: &'static str,
        /// The rejected input.
        name: String,
    },
}
