//! # Quote Synchronizer
//!
//! Projects an invoice status onto its originating quote through
//! [`QuoteStatus::for_invoice`]. Idempotent: when the quote already holds
//! the projected status nothing is written.

use cater_core::{QuoteId, Timestamp};
use cater_state::{InvoiceStatus, QuoteStatus};

use crate::error::SyncError;
use crate::store::WorkflowStore;

/// Set the quote's status from `invoice_status`, returning the status it
/// now holds.
pub async fn sync_quote_status<S: WorkflowStore>(
    store: &S,
    quote_id: QuoteId,
    invoice_status: InvoiceStatus,
) -> Result<QuoteStatus, SyncError> {
    let mut quote = store
        .fetch_quote(quote_id)
        .await?
        .ok_or(SyncError::QuoteNotFound(quote_id))?;
    let target = QuoteStatus::for_invoice(invoice_status);
    if quote.status == target {
        return Ok(target);
    }

    let previous = quote.status;
    quote.status = target;
    quote.updated_at = Timestamp::now();
    store.save_quote(&quote).await?;

    tracing::debug!(
        quote_id = %quote_id,
        from = %previous,
        to = %target,
        invoice_status = %invoice_status,
        "quote status synchronized"
    );
    Ok(target)
}
