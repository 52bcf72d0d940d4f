//! # State Mutator
//!
//! The only code path that changes an invoice's `workflow_status`.
//!
//! Order of operations:
//!
//! 1. Load the invoice (`NotFound` if absent).
//! 2. Validate the edge against the adjacency table (`InvalidTransition`).
//!    Nothing has been written yet.
//! 3. Persist the new status with its audit metadata. A store failure here
//!    is `Persistence` and nothing else is written.
//! 4. Append the chained audit record. This runs after the commit, so a
//!    failure is logged and reported, not returned.

use cater_core::{Actor, InvoiceId, Timestamp};
use cater_state::{validate_transition, InvoiceStatus};

use crate::audit::AuditRecord;
use crate::error::WorkflowError;
use crate::report::{MutationReport, SideEffect};
use crate::store::WorkflowStore;

/// Move an invoice to `new_status`.
pub async fn transition<S: WorkflowStore>(
    store: &S,
    invoice_id: InvoiceId,
    new_status: InvoiceStatus,
    actor: Actor,
    reason: Option<String>,
) -> Result<MutationReport, WorkflowError> {
    let mut invoice = store
        .fetch_invoice(invoice_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("invoice", invoice_id))?;
    let from = invoice.workflow_status;

    if let Err(err) = validate_transition(from, new_status) {
        tracing::warn!(
            invoice_id = %invoice_id,
            from = %from,
            to = %new_status,
            actor = %actor,
            "invoice transition rejected"
        );
        return Err(err.into());
    }

    let now = Timestamp::now();
    invoice.last_status = Some(from);
    invoice.workflow_status = new_status;
    invoice.status_changed_by = Some(actor);
    invoice.status_changed_at = Some(now);
    invoice.updated_at = now;
    invoice.version += 1;

    if let Err(err) = store.save_invoice(&invoice).await {
        tracing::error!(
            invoice_id = %invoice_id,
            from = %from,
            to = %new_status,
            error = %err,
            "failed to persist invoice transition"
        );
        return Err(err.into());
    }

    let audit = append_audit(store, invoice_id, Some(from), new_status, actor, reason, now).await;

    tracing::info!(
        invoice_id = %invoice_id,
        invoice_number = %invoice.invoice_number,
        from = %from,
        to = %new_status,
        actor = %actor,
        version = invoice.version,
        "invoice status changed"
    );

    Ok(MutationReport {
        invoice,
        previous_status: from,
        audit,
    })
}

/// Chain and append one audit record. Failures are soft.
pub(crate) async fn append_audit<S: WorkflowStore>(
    store: &S,
    invoice_id: InvoiceId,
    previous_status: Option<InvoiceStatus>,
    new_status: InvoiceStatus,
    actor: Actor,
    reason: Option<String>,
    at: Timestamp,
) -> SideEffect<cater_core::AuditRecordId> {
    let predecessor = match store.latest_audit(invoice_id).await {
        Ok(p) => p,
        Err(err) => {
            tracing::warn!(invoice_id = %invoice_id, error = %err, "could not read audit chain head");
            return SideEffect::Failed(err.to_string());
        }
    };
    let record = AuditRecord::chained(
        predecessor.as_ref(),
        invoice_id,
        previous_status,
        new_status,
        actor,
        reason,
        at,
    );
    match store.append_audit(&record).await {
        Ok(()) => SideEffect::Applied(record.id),
        Err(err) => {
            tracing::warn!(invoice_id = %invoice_id, error = %err, "audit append failed after commit");
            SideEffect::Failed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Invoice;
    use crate::store::InMemoryStore;

    async fn seeded(status: InvoiceStatus) -> (InMemoryStore, InvoiceId) {
        let store = InMemoryStore::new();
        let mut invoice = Invoice::draft(None, Timestamp::now());
        invoice.workflow_status = status;
        store.insert_invoice(&invoice).await.unwrap();
        (store, invoice.id)
    }

    #[tokio::test]
    async fn legal_transition_persists_and_audits() {
        let (store, id) = seeded(InvoiceStatus::Draft).await;
        let report = transition(&store, id, InvoiceStatus::Sent, Actor::Admin, Some("ready".into()))
            .await
            .unwrap();

        assert_eq!(report.previous_status, InvoiceStatus::Draft);
        assert!(report.audit.is_applied());

        let stored = store.fetch_invoice(id).await.unwrap().unwrap();
        assert_eq!(stored.workflow_status, InvoiceStatus::Sent);
        assert_eq!(stored.last_status, Some(InvoiceStatus::Draft));
        assert_eq!(stored.status_changed_by, Some(Actor::Admin));
        assert_eq!(stored.version, 2);

        let trail = store.audit_trail(id).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].previous_status, Some(InvoiceStatus::Draft));
        assert_eq!(trail[0].new_status, InvoiceStatus::Sent);
        assert_eq!(trail[0].reason.as_deref(), Some("ready"));
    }

    #[tokio::test]
    async fn illegal_transition_writes_nothing() {
        let (store, id) = seeded(InvoiceStatus::Draft).await;
        let err = transition(&store, id, InvoiceStatus::Paid, Actor::Admin, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

        let stored = store.fetch_invoice(id).await.unwrap().unwrap();
        assert_eq!(stored.workflow_status, InvoiceStatus::Draft);
        assert_eq!(stored.version, 1);
        assert!(store.audit_trail(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_invoice_is_not_found() {
        let store = InMemoryStore::new();
        let err = transition(&store, InvoiceId::new(), InvoiceStatus::Sent, Actor::Admin, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { kind: "invoice", .. }));
    }

    #[tokio::test]
    async fn persistence_failure_skips_audit() {
        let (store, id) = seeded(InvoiceStatus::Draft).await;
        store.fail_invoice_writes(true);
        let err = transition(&store, id, InvoiceStatus::Sent, Actor::Admin, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Persistence(_)));
        assert!(store.audit_trail(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn audit_failure_is_soft() {
        let (store, id) = seeded(InvoiceStatus::Draft).await;
        store.fail_audit_appends(true);
        let report = transition(&store, id, InvoiceStatus::Sent, Actor::Admin, None)
            .await
            .unwrap();
        assert!(report.audit.is_failed());
        let stored = store.fetch_invoice(id).await.unwrap().unwrap();
        assert_eq!(stored.workflow_status, InvoiceStatus::Sent);
    }

    #[tokio::test]
    async fn successive_records_form_a_chain() {
        let (store, id) = seeded(InvoiceStatus::Draft).await;
        for to in [InvoiceStatus::Sent, InvoiceStatus::Approved, InvoiceStatus::Paid] {
            transition(&store, id, to, Actor::Admin, None).await.unwrap();
        }
        let trail = store.audit_trail(id).await.unwrap();
        assert_eq!(crate::audit::verify_chain(id, &trail), Ok(3));
    }
}
