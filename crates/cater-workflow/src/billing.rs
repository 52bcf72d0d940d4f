//! # Billing Edits
//!
//! Quote promotion and line-item editing. These are the only writes to an
//! invoice outside the state mutator, and they never touch
//! `workflow_status`.
//!
//! Line-item edits use optimistic locking: the caller passes the version it
//! read, and a mismatch is a [`WorkflowError::VersionConflict`].

use cater_core::{Actor, InvoiceId, Money, QuoteId, Timestamp};
use cater_state::InvoiceStatus;
use serde::Serialize;

use crate::error::{StoreError, WorkflowError};
use crate::model::{Invoice, LineItem};
use crate::mutator::append_audit;
use crate::report::SideEffect;
use crate::store::WorkflowStore;
use crate::sync::sync_quote_status;

/// Priced content of an invoice about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub line_items: Vec<LineItem>,
    pub tax_rate_bps: u32,
    pub due_date: Option<Timestamp>,
}

/// Subtotal, tax, and total for a set of line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

/// Flat-rate totals. Tax is rounded half-up to the cent.
pub fn compute_totals(items: &[LineItem], tax_rate_bps: u32) -> Result<Totals, WorkflowError> {
    let line_totals = items
        .iter()
        .map(LineItem::line_total)
        .collect::<Result<Vec<_>, _>>()?;
    let subtotal = Money::checked_sum(line_totals)?;
    let tax = subtotal.apply_rate_bps(tax_rate_bps)?;
    let total = subtotal.checked_add(tax)?;
    Ok(Totals {
        subtotal,
        tax,
        total,
    })
}

fn validate_items(items: &[LineItem]) -> Result<(), WorkflowError> {
    for (n, item) in items.iter().enumerate() {
        if item.description.trim().is_empty() {
            return Err(WorkflowError::Validation(format!(
                "line item {n} has an empty description"
            )));
        }
        if item.quantity == 0 {
            return Err(WorkflowError::Validation(format!(
                "line item {n} ({}) has zero quantity",
                item.description
            )));
        }
    }
    Ok(())
}

fn apply_totals(invoice: &mut Invoice, totals: Totals) {
    invoice.subtotal = totals.subtotal;
    invoice.tax_amount = totals.tax;
    invoice.total_amount = totals.total;
}

/// Create a `draft` invoice from a quote.
///
/// Fails with `NotFound` if the quote does not exist and `Validation` if it
/// already has an invoice. The creation audit record and the quote sync to
/// `pending` run after the insert; their failures are logged, not returned.
pub async fn promote_quote<S: WorkflowStore>(
    store: &S,
    quote_id: QuoteId,
    new_invoice: NewInvoice,
) -> Result<Invoice, WorkflowError> {
    if store.fetch_quote(quote_id).await?.is_none() {
        return Err(WorkflowError::not_found("quote", quote_id));
    }
    if let Some(existing) = store.invoice_for_quote(quote_id).await? {
        return Err(WorkflowError::Validation(format!(
            "quote {quote_id} already promoted to {}",
            existing.invoice_number
        )));
    }
    validate_items(&new_invoice.line_items)?;
    let totals = compute_totals(&new_invoice.line_items, new_invoice.tax_rate_bps)?;

    let now = Timestamp::now();
    let mut invoice = Invoice::draft(Some(quote_id), now);
    invoice.line_items = new_invoice.line_items;
    invoice.tax_rate_bps = new_invoice.tax_rate_bps;
    invoice.due_date = new_invoice.due_date;
    apply_totals(&mut invoice, totals);

    store.insert_invoice(&invoice).await?;
    let audit = append_audit(
        store,
        invoice.id,
        None,
        InvoiceStatus::Draft,
        Actor::Admin,
        Some(format!("Promoted from quote {quote_id}")),
        now,
    )
    .await;
    if let SideEffect::Failed(err) = &audit {
        tracing::error!(invoice_id = %invoice.id, error = %err, "invoice created without audit record");
    }

    if let Err(err) = sync_quote_status(store, quote_id, InvoiceStatus::Draft).await {
        tracing::warn!(quote_id = %quote_id, error = %err, "quote sync failed after promotion");
    }

    tracing::info!(
        invoice_id = %invoice.id,
        invoice_number = %invoice.invoice_number,
        quote_id = %quote_id,
        total = %invoice.total_amount,
        audited = audit.is_applied(),
        "quote promoted to invoice"
    );
    Ok(invoice)
}

/// Replace an invoice's line items and recompute its totals.
///
/// Allowed only while the invoice is `draft` or `pending_review`.
pub async fn update_line_items<S: WorkflowStore>(
    store: &S,
    invoice_id: InvoiceId,
    expected_version: u64,
    items: Vec<LineItem>,
) -> Result<Invoice, WorkflowError> {
    let mut invoice = store
        .fetch_invoice(invoice_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("invoice", invoice_id))?;

    if invoice.version != expected_version {
        return Err(WorkflowError::VersionConflict {
            expected: expected_version,
            found: invoice.version,
        });
    }
    if !matches!(
        invoice.workflow_status,
        InvoiceStatus::Draft | InvoiceStatus::PendingReview
    ) {
        return Err(WorkflowError::Validation(format!(
            "line items are locked while invoice is {}",
            invoice.workflow_status
        )));
    }
    validate_items(&items)?;
    let totals = compute_totals(&items, invoice.tax_rate_bps)?;

    invoice.line_items = items;
    apply_totals(&mut invoice, totals);
    invoice.version += 1;
    invoice.updated_at = Timestamp::now();

    match store.compare_and_save_invoice(&invoice, expected_version).await {
        Ok(()) => {}
        Err(StoreError::VersionMismatch { expected, found, .. }) => {
            return Err(WorkflowError::VersionConflict { expected, found });
        }
        Err(other) => return Err(other.into()),
    }

    tracing::info!(
        invoice_id = %invoice_id,
        version = invoice.version,
        total = %invoice.total_amount,
        "invoice line items updated"
    );
    Ok(invoice)
}
