//! # Milestone Aggregation
//!
//! When the last outstanding milestone of an invoice is completed, or the
//! invoice enters a payable status with none outstanding, it moves to
//! `paid` on behalf of `system`.
//!
//! The check reads every milestone and then writes the invoice, so two
//! completions racing on the same invoice could both see "all complete".
//! [`Workflow::complete_milestone`](crate::engine::Workflow::complete_milestone)
//! serializes completions per invoice before calling in here.

use cater_core::{Actor, InvoiceId, MilestoneId};
use cater_state::InvoiceStatus;

use crate::error::WorkflowError;
use crate::mutator;
use crate::report::MutationReport;
use crate::store::WorkflowStore;

/// Audit reason recorded on the automatic `paid` transition.
pub const ALL_MILESTONES_COMPLETED: &str = "All payment milestones completed";

/// What the aggregator decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregation {
    /// Some milestones are still open.
    Outstanding { completed: usize, total: usize },
    /// The invoice was already paid; nothing written.
    AlreadyPaid,
    /// This completion was the last one; the invoice is now paid.
    MarkedPaid(Box<MutationReport>),
}

/// Re-evaluate the parent invoice of a just-completed milestone.
///
/// # Errors
///
/// `NotFound` if the milestone or its invoice is gone, and
/// `InvalidTransition` if every milestone is complete but the invoice is in
/// a status that cannot move to `paid` (e.g. still `sent`).
pub async fn on_milestone_completed<S: WorkflowStore>(
    store: &S,
    milestone_id: MilestoneId,
) -> Result<Aggregation, WorkflowError> {
    let milestone = store
        .fetch_milestone(milestone_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("milestone", milestone_id))?;
    settle_invoice(store, milestone.invoice_id).await
}

/// Mark an invoice paid if it has milestones and all of them are complete.
///
/// An invoice without milestones is never paid here. Runs after a milestone
/// completes and after the invoice itself enters a status that can move to
/// `paid`, so completions made while it was still `sent` are not lost.
pub async fn settle_invoice<S: WorkflowStore>(
    store: &S,
    invoice_id: InvoiceId,
) -> Result<Aggregation, WorkflowError> {
    let invoice = store
        .fetch_invoice(invoice_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("invoice", invoice_id))?;

    if invoice.workflow_status == InvoiceStatus::Paid {
        return Ok(Aggregation::AlreadyPaid);
    }

    let milestones = store.milestones_for_invoice(invoice.id).await?;
    let total = milestones.len();
    let completed = milestones.iter().filter(|m| m.status.is_completed()).count();
    if total == 0 || completed < total {
        tracing::debug!(invoice_id = %invoice.id, completed, total, "milestones outstanding");
        return Ok(Aggregation::Outstanding { completed, total });
    }

    let report = mutator::transition(
        store,
        invoice.id,
        InvoiceStatus::Paid,
        Actor::System,
        Some(ALL_MILESTONES_COMPLETED.to_string()),
    )
    .await?;
    Ok(Aggregation::MarkedPaid(Box::new(report)))
}
