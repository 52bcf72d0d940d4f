//! # Workflow Errors
//!
//! Hard failures abort an operation and come back as `Err`. Soft failures
//! (quote sync, notification, audit append after commit) never do; they are
//! carried in [`SideEffect::Failed`](crate::report::SideEffect).

use cater_core::{CoreError, InvoiceId, QuoteId};
use cater_state::StateError;
use thiserror::Error;

/// Failure of the persistence collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend unreachable or the write was refused.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Insert of a key that already exists.
    #[error("{kind} {id} already exists")]
    Duplicate { kind: &'static str, id: String },

    /// Update of a key that does not exist.
    #[error("{kind} {id} does not exist")]
    Missing { kind: &'static str, id: String },

    /// Compare-and-save saw a different version.
    #[error("stale write to invoice {id}: expected version {expected}, found {found}")]
    VersionMismatch {
        id: InvoiceId,
        expected: u64,
        found: u64,
    },

    /// A stored row could not be decoded.
    #[error("corrupt {kind} row: {reason}")]
    Corrupt { kind: &'static str, reason: String },
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Hard failure of a workflow operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The referenced entity does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// The requested status change is not an edge of the machine.
    #[error("invalid {machine} transition: {from} -> {to}")]
    InvalidTransition {
        machine: &'static str,
        from: String,
        to: String,
    },

    /// The core write failed; nothing was changed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// An optimistic-lock edit was based on a stale version.
    #[error("version conflict: expected {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },

    /// Input rejected before any write.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl WorkflowError {
    /// `NotFound` for an id type from `cater-core`.
    pub fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<StateError> for WorkflowError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::InvalidTransition { machine, from, to } => {
                Self::InvalidTransition { machine, from, to }
            }
            other @ StateError::UnknownStatus { .. } => Self::Validation(other.to_string()),
        }
    }
}

impl From<CoreError> for WorkflowError {
    fn from(err: CoreError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Soft failure of the quote synchronizer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The invoice points at a quote that is gone.
    #[error("quote {0} not found")]
    QuoteNotFound(QuoteId),

    /// Reading or writing the quote failed.
    #[error("quote store failure: {0}")]
    Store(#[from] StoreError),
}
