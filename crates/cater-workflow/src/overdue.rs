//! # Overdue Checker
//!
//! Marks an invoice `overdue` when its due date has passed while it is
//! still `sent` or `approved`. Any other status, or no due date, leaves it
//! unchanged. Invoked by an external scheduler.

use cater_core::{Actor, InvoiceId, Timestamp};
use cater_state::InvoiceStatus;

use crate::error::WorkflowError;
use crate::mutator;
use crate::report::MutationReport;
use crate::reporting::is_overdue_eligible;
use crate::store::WorkflowStore;

/// What the checker decided for one invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverdueCheck {
    MarkedOverdue(Box<MutationReport>),
    /// Eligible status, but not past due (or no due date).
    NotDue,
    /// Status is not `sent` or `approved`.
    NotEligible(InvoiceStatus),
}

pub async fn check_and_mark_overdue<S: WorkflowStore>(
    store: &S,
    invoice_id: InvoiceId,
    now: Timestamp,
) -> Result<OverdueCheck, WorkflowError> {
    let invoice = store
        .fetch_invoice(invoice_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("invoice", invoice_id))?;

    if !invoice.workflow_status.is_overdue_candidate() {
        return Ok(OverdueCheck::NotEligible(invoice.workflow_status));
    }
    if !is_overdue_eligible(&invoice, now) {
        return Ok(OverdueCheck::NotDue);
    }

    let report = mutator::transition(
        store,
        invoice_id,
        InvoiceStatus::Overdue,
        Actor::System,
        Some("Payment due date passed".to_string()),
    )
    .await?;
    Ok(OverdueCheck::MarkedOverdue(Box::new(report)))
}
