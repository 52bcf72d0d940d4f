//! In-memory [`WorkflowStore`].
//!
//! All operations are synchronous under the hood: the locks are
//! `parking_lot` and are never held across an `.await`. Clones share the
//! same tables.

use std::collections::HashMap;
use std::sync::Arc;

use cater_core::{InvoiceId, MilestoneId, QuoteId};
use cater_state::InvoiceStatus;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use super::WorkflowStore;
use crate::audit::AuditRecord;
use crate::error::StoreError;
use crate::model::{Invoice, Milestone, Quote};

#[derive(Debug, Default)]
struct Tables {
    invoices: HashMap<InvoiceId, Invoice>,
    quotes: HashMap<QuoteId, Quote>,
    milestones: HashMap<MilestoneId, Milestone>,
    audit: Vec<AuditRecord>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Faults {
    invoice_writes: bool,
    quote_writes: bool,
    audit_appends: bool,
}

/// Full contents of a store, in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub quotes: Vec<Quote>,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    /// Append order is preserved.
    #[serde(default)]
    pub audit: Vec<AuditRecord>,
}

/// Thread-safe, cloneable in-memory store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    faults: Arc<Mutex<Faults>>,
}

impl InMemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::Duplicate`] if an id appears twice.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, StoreError> {
        let mut tables = Tables::default();
        for quote in snapshot.quotes {
            if let Some(dup) = tables.quotes.insert(quote.id, quote) {
                return Err(duplicate("quote", dup.id));
            }
        }
        for invoice in snapshot.invoices {
            if let Some(dup) = tables.invoices.insert(invoice.id, invoice) {
                return Err(duplicate("invoice", dup.id));
            }
        }
        for milestone in snapshot.milestones {
            if let Some(dup) = tables.milestones.insert(milestone.id, milestone) {
                return Err(duplicate("milestone", dup.id));
            }
        }
        tables.audit = snapshot.audit;
        Ok(Self {
            tables: Arc::new(RwLock::new(tables)),
            faults: Arc::default(),
        })
    }

    /// Copy out everything, sorted for deterministic serialization.
    pub fn snapshot(&self) -> Snapshot {
        let tables = self.tables.read();
        let mut quotes: Vec<Quote> = tables.quotes.values().cloned().collect();
        quotes.sort_by_key(|q| q.id);
        let mut invoices: Vec<Invoice> = tables.invoices.values().cloned().collect();
        invoices.sort_by_key(|i| (i.created_at, i.id));
        let mut milestones: Vec<Milestone> = tables.milestones.values().cloned().collect();
        milestones.sort_by_key(|m| (m.invoice_id, m.due_date, m.id));
        Snapshot {
            quotes,
            invoices,
            milestones,
            audit: tables.audit.clone(),
        }
    }

    /// Make invoice inserts and saves fail until turned off.
    pub fn fail_invoice_writes(&self, on: bool) {
        self.faults.lock().invoice_writes = on;
    }

    /// Make quote saves fail until turned off.
    pub fn fail_quote_writes(&self, on: bool) {
        self.faults.lock().quote_writes = on;
    }

    /// Make audit appends fail until turned off.
    pub fn fail_audit_appends(&self, on: bool) {
        self.faults.lock().audit_appends = on;
    }

    fn faults(&self) -> Faults {
        *self.faults.lock()
    }
}

fn duplicate(kind: &'static str, id: impl std::fmt::Display) -> StoreError {
    StoreError::Duplicate {
        kind,
        id: id.to_string(),
    }
}

fn injected(what: &str) -> StoreError {
    StoreError::Unavailable(format!("injected {what} failure"))
}

impl WorkflowStore for InMemoryStore {
    async fn fetch_invoice(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
        Ok(self.tables.read().invoices.get(&id).cloned())
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), StoreError> {
        if self.faults().invoice_writes {
            return Err(injected("invoice write"));
        }
        let mut tables = self.tables.write();
        if tables.invoices.contains_key(&invoice.id) {
            return Err(duplicate("invoice", invoice.id));
        }
        tables.invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn save_invoice(&self, invoice: &Invoice) -> Result<(), StoreError> {
        if self.faults().invoice_writes {
            return Err(injected("invoice write"));
        }
        match self.tables.write().invoices.get_mut(&invoice.id) {
            Some(slot) => {
                *slot = invoice.clone();
                Ok(())
            }
            None => Err(StoreError::Missing {
                kind: "invoice",
                id: invoice.id.to_string(),
            }),
        }
    }

    async fn compare_and_save_invoice(
        &self,
        invoice: &Invoice,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        if self.faults().invoice_writes {
            return Err(injected("invoice write"));
        }
        let mut tables = self.tables.write();
        let Some(slot) = tables.invoices.get_mut(&invoice.id) else {
            return Err(StoreError::Missing {
                kind: "invoice",
                id: invoice.id.to_string(),
            });
        };
        if slot.version != expected_version {
            return Err(StoreError::VersionMismatch {
                id: invoice.id,
                expected: expected_version,
                found: slot.version,
            });
        }
        *slot = invoice.clone();
        Ok(())
    }

    async fn invoices_with_status(
        &self,
        statuses: &[InvoiceStatus],
    ) -> Result<Vec<Invoice>, StoreError> {
        let tables = self.tables.read();
        let mut out: Vec<Invoice> = tables
            .invoices
            .values()
            .filter(|i| statuses.contains(&i.workflow_status))
            .cloned()
            .collect();
        out.sort_by_key(|i| (i.created_at, i.id));
        Ok(out)
    }

    async fn invoice_for_quote(&self, quote_id: QuoteId) -> Result<Option<Invoice>, StoreError> {
        Ok(self
            .tables
            .read()
            .invoices
            .values()
            .find(|i| i.quote_id == Some(quote_id))
            .cloned())
    }

    async fn fetch_quote(&self, id: QuoteId) -> Result<Option<Quote>, StoreError> {
        Ok(self.tables.read().quotes.get(&id).cloned())
    }

    async fn save_quote(&self, quote: &Quote) -> Result<(), StoreError> {
        if self.faults().quote_writes {
            return Err(injected("quote write"));
        }
        self.tables.write().quotes.insert(quote.id, quote.clone());
        Ok(())
    }

    async fn fetch_milestone(&self, id: MilestoneId) -> Result<Option<Milestone>, StoreError> {
        Ok(self.tables.read().milestones.get(&id).cloned())
    }

    async fn save_milestone(&self, milestone: &Milestone) -> Result<(), StoreError> {
        self.tables
            .write()
            .milestones
            .insert(milestone.id, milestone.clone());
        Ok(())
    }

    async fn milestones_for_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<Milestone>, StoreError> {
        let tables = self.tables.read();
        let mut out: Vec<Milestone> = tables
            .milestones
            .values()
            .filter(|m| m.invoice_id == invoice_id)
            .cloned()
            .collect();
        out.sort_by_key(|m| (m.due_date, m.id));
        Ok(out)
    }

    async fn append_audit(&self, record: &AuditRecord) -> Result<(), StoreError> {
        if self.faults().audit_appends {
            return Err(injected("audit append"));
        }
        self.tables.write().audit.push(record.clone());
        Ok(())
    }

    async fn audit_trail(&self, invoice_id: InvoiceId) -> Result<Vec<AuditRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .audit
            .iter()
            .filter(|r| r.invoice_id == invoice_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cater_core::{Money, Timestamp};

    fn invoice() -> Invoice {
        Invoice::draft(None, Timestamp::parse("2026-01-10T10:00:00Z").unwrap())
    }

    #[tokio::test]
    async fn insert_rejects_duplicates() {
        let store = InMemoryStore::new();
        let inv = invoice();
        store.insert_invoice(&inv).await.unwrap();
        let err = store.insert_invoice(&inv).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { kind: "invoice", .. }));
    }

    #[tokio::test]
    async fn save_requires_existing_row() {
        let store = InMemoryStore::new();
        let err = store.save_invoice(&invoice()).await.unwrap_err();
        assert!(matches!(err, StoreError::Missing { .. }));
    }

    #[tokio::test]
    async fn compare_and_save_checks_version() {
        let store = InMemoryStore::new();
        let mut inv = invoice();
        store.insert_invoice(&inv).await.unwrap();

        inv.version = 2;
        store.compare_and_save_invoice(&inv, 1).await.unwrap();

        inv.version = 3;
        let err = store.compare_and_save_invoice(&inv, 1).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::VersionMismatch {
                id: inv.id,
                expected: 1,
                found: 2
            }
        );
    }

    #[tokio::test]
    async fn injected_faults_leave_data_untouched() {
        let store = InMemoryStore::new();
        let mut inv = invoice();
        store.insert_invoice(&inv).await.unwrap();

        store.fail_invoice_writes(true);
        inv.workflow_status = InvoiceStatus::Sent;
        assert!(store.save_invoice(&inv).await.is_err());
        store.fail_invoice_writes(false);

        let stored = store.fetch_invoice(inv.id).await.unwrap().unwrap();
        assert_eq!(stored.workflow_status, InvoiceStatus::Draft);
    }

    #[tokio::test]
    async fn clones_share_tables() {
        let store = InMemoryStore::new();
        let other = store.clone();
        let inv = invoice();
        store.insert_invoice(&inv).await.unwrap();
        assert!(other.fetch_invoice(inv.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn snapshot_round_trips_through_json() {
        let store = InMemoryStore::new();
        let quote = Quote::new("Harbour Lights Gala", None);
        let mut inv = invoice();
        inv.quote_id = Some(quote.id);
        store.save_quote(&quote).await.unwrap();
        store.insert_invoice(&inv).await.unwrap();
        store
            .save_milestone(&Milestone::new(inv.id, "deposit", Money::from_cents(500).unwrap()))
            .await
            .unwrap();

        let json = serde_json::to_string(&store.snapshot()).unwrap();
        let restored = InMemoryStore::from_snapshot(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(restored.snapshot(), store.snapshot());
        assert_eq!(
            restored.invoice_for_quote(quote.id).await.unwrap().map(|i| i.id),
            Some(inv.id)
        );
    }

    #[test]
    fn snapshot_with_duplicate_ids_is_rejected() {
        let inv = invoice();
        let snapshot = Snapshot {
            invoices: vec![inv.clone(), inv],
            ..Snapshot::default()
        };
        assert!(matches!(
            InMemoryStore::from_snapshot(snapshot),
            Err(StoreError::Duplicate { kind: "invoice", .. })
        ));
    }
}
