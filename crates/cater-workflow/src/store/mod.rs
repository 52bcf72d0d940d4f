//! # Persistence Collaborator
//!
//! [`WorkflowStore`] is everything the workflow needs from storage. The
//! workflow functions take the store explicitly; none of them hold state
//! of their own.
//!
//! - [`InMemoryStore`]: `parking_lot` maps behind an `Arc`, with a
//!   serializable [`Snapshot`] and fault injection for tests.
//! - `PgStore` (feature `postgres`): sqlx over Postgres.
//!
//! Implementations are not required to make multi-record writes atomic.
//! The mutator orders its writes so that a failure leaves nothing half
//! applied on the invoice itself.

mod memory;
#[cfg(feature = "postgres")]
mod pg;

pub use memory::{InMemoryStore, Snapshot};
#[cfg(feature = "postgres")]
pub use pg::PgStore;

use cater_core::{InvoiceId, MilestoneId, QuoteId};
use cater_state::InvoiceStatus;

use crate::audit::AuditRecord;
use crate::error::StoreError;
use crate::model::{Invoice, Milestone, Quote};

/// Storage for invoices, quotes, milestones, and audit records.
#[allow(async_fn_in_trait)]
pub trait WorkflowStore: Send + Sync {
    /// Fetch an invoice. `Ok(None)` if it does not exist.
    async fn fetch_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError>;

    /// Store a new invoice. Fails with [`StoreError::Duplicate`] if the id exists.
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), StoreError>;

    /// Overwrite an existing invoice unconditionally.
    async fn save_invoice(&self, invoice: &Invoice) -> Result<(), StoreError>;

    /// Overwrite an existing invoice only if its stored version is
    /// `expected_version`. Fails with [`StoreError::VersionMismatch`]
    /// otherwise.
    async fn compare_and_save_invoice(
        &self,
        invoice: &Invoice,
        expected_version: u64,
    ) -> Result<(), StoreError>;

    /// Every invoice whose status is one of `statuses`.
    async fn invoices_with_status(
        &self,
        statuses: &[InvoiceStatus],
    ) -> Result<Vec<Invoice>, StoreError>;

    /// The invoice promoted from `quote_id`, if any.
    async fn invoice_for_quote(&self, quote_id: QuoteId) -> Result<Option<Invoice>, StoreError>;

    async fn fetch_quote(&self, id: QuoteId) -> Result<Option<Quote>, StoreError>;

    /// Insert or overwrite a quote.
    async fn save_quote(&self, quote: &Quote) -> Result<(), StoreError>;

    async fn fetch_milestone(&self, id: MilestoneId) -> Result<Option<Milestone>, StoreError>;

    /// Insert or overwrite a milestone.
    async fn save_milestone(&self, milestone: &Milestone) -> Result<(), StoreError>;

    /// Milestones of one invoice, ordered by due date then id.
    async fn milestones_for_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<Milestone>, StoreError>;

    /// Append one record to the audit log.
    async fn append_audit(&self, record: &AuditRecord) -> Result<(), StoreError>;

    /// An invoice's audit records, oldest first.
    async fn audit_trail(&self, invoice_id: InvoiceId) -> Result<Vec<AuditRecord>, StoreError>;

    /// The newest audit record of an invoice.
    async fn latest_audit(&self, invoice_id: InvoiceId) -> Result<Option<AuditRecord>, StoreError> {
        Ok(self.audit_trail(invoice_id).await?.pop())
    }
}
