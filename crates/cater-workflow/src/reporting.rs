//! # Reporting Helpers
//!
//! Pure read-side calculations over invoices and milestones. No I/O.

use std::collections::BTreeMap;

use cater_core::{Money, Timestamp};
use cater_state::InvoiceStatus;
use serde::Serialize;

use crate::model::{Invoice, Milestone};

/// How much of an invoice has been paid through its milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaymentProgress {
    pub total: Money,
    /// Sum of completed milestone amounts, capped at the largest amount.
    pub paid: Money,
    /// `total - paid`, floored at zero.
    pub remaining: Money,
    /// `paid / total` as a whole percentage, rounded down and capped at 100.
    /// Zero when the total is zero.
    pub percent: u8,
    pub milestones_total: usize,
    pub milestones_completed: usize,
}

/// Progress of `invoice` given its milestones.
///
/// Milestones of other invoices in the slice are ignored.
pub fn payment_progress(invoice: &Invoice, milestones: &[Milestone]) -> PaymentProgress {
    let own: Vec<&Milestone> = milestones
        .iter()
        .filter(|m| m.invoice_id == invoice.id)
        .collect();
    let completed: Vec<&Milestone> = own.iter().copied().filter(|m| m.status.is_completed()).collect();
    let paid = completed
        .iter()
        .fold(Money::ZERO, |acc, m| acc.saturating_add(m.amount));
    let total = invoice.total_amount;

    let percent = if total.cents() == 0 {
        0
    } else {
        let ratio = i128::from(paid.cents()) * 100 / i128::from(total.cents());
        ratio.clamp(0, 100) as u8
    };

    PaymentProgress {
        total,
        paid,
        remaining: total.saturating_sub(paid),
        percent,
        milestones_total: own.len(),
        milestones_completed: completed.len(),
    }
}

/// Whether the overdue checker would mark this invoice now.
pub fn is_overdue_eligible(invoice: &Invoice, now: Timestamp) -> bool {
    invoice.workflow_status.is_overdue_candidate()
        && invoice.due_date.is_some_and(|due| due < now)
}

/// Whole days past due for an unpaid, live invoice; zero otherwise.
pub fn days_overdue(invoice: &Invoice, now: Timestamp) -> i64 {
    let unpaid = matches!(
        invoice.workflow_status,
        InvoiceStatus::Sent | InvoiceStatus::Approved | InvoiceStatus::Overdue
    );
    match invoice.due_date {
        Some(due) if unpaid => due.days_until(&now),
        _ => 0,
    }
}

/// Invoice count per status. Statuses with no invoices are omitted.
pub fn status_summary<'a, I>(invoices: I) -> BTreeMap<InvoiceStatus, usize>
where
    I: IntoIterator<Item = &'a Invoice>,
{
    let mut summary = BTreeMap::new();
    for invoice in invoices {
        *summary.entry(invoice.workflow_status).or_insert(0) += 1;
    }
    summary
}
