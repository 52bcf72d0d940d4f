//! # Error Types
//!
//! Errors raised while constructing or parsing core primitives. Workflow
//! and state machine errors live in their own crates and wrap this one
//! where needed.

use thiserror::Error;

/// Error constructing or parsing a core primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Identifier string is not a valid UUID.
    #[error("invalid {kind} identifier {value:?}: {reason}")]
    InvalidIdentifier {
        /// Identifier namespace (e.g. "invoice").
        kind: &'static str,
        /// The rejected input.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// Timestamp string is malformed or not UTC.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Actor name outside the closed vocabulary.
    #[error("unknown actor {0:?}; expected admin, customer, or system")]
    UnknownActor(String),

    /// Arithmetic on money overflowed or went negative.
    #[error("money arithmetic out of range: {0}")]
    MoneyOutOfRange(String),
}
