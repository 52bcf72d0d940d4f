//! Outcome types shared by the mutator and the engine.

use cater_core::AuditRecordId;
use cater_notify::Notification;
use cater_state::{InvoiceStatus, QuoteStatus};
use serde::Serialize;

use crate::model::Invoice;

/// Result of a best-effort step that runs after the core write.
///
/// A `Failed` side effect never undoes the core write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum SideEffect<T> {
    Applied(T),
    /// Nothing to do (no linked quote, no notification for this status).
    Skipped,
    Failed(String),
}

impl<T> SideEffect<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn applied(&self) -> Option<&T> {
        match self {
            Self::Applied(value) => Some(value),
            _ => None,
        }
    }
}

/// What [`mutator::transition`](crate::mutator::transition) did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationReport {
    /// The invoice as persisted.
    pub invoice: Invoice,
    pub previous_status: InvoiceStatus,
    pub audit: SideEffect<AuditRecordId>,
}

/// Full pipeline outcome: the committed change plus its side effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionReport {
    pub invoice: Invoice,
    pub previous_status: InvoiceStatus,
    pub audit: SideEffect<AuditRecordId>,
    pub quote_sync: SideEffect<QuoteStatus>,
    pub notification: SideEffect<Notification>,
    /// Automatic move to `paid` when the invoice entered a payable status
    /// with every milestone already complete.
    pub settlement: SideEffect<Box<TransitionReport>>,
}

impl TransitionReport {
    pub fn new_status(&self) -> InvoiceStatus {
        self.invoice.workflow_status
    }

    /// Whether any side effect failed, including those of the settlement.
    pub fn has_soft_failures(&self) -> bool {
        self.audit.is_failed()
            || self.quote_sync.is_failed()
            || self.notification.is_failed()
            || self.settlement.is_failed()
            || self.settlement.applied().is_some_and(|paid| paid.has_soft_failures())
    }
}
