//! # Postgres Store Tests
//!
//! Run against a live database:
//!
//! ```text
//! DATABASE_URL=postgres://... cargo test -p cater-workflow --features postgres -- --ignored
//! ```
//!
//! Every test writes fresh ids, so a shared database is fine. Without
//! `DATABASE_URL` the tests return early.

#![cfg(feature = "postgres")]

use cater_core::{Actor, Money, Timestamp};
use cater_state::{InvoiceStatus, MilestoneStatus, QuoteStatus};
use cater_workflow::mutator;
use cater_workflow::{
    verify_chain, Invoice, LineItem, Milestone, PgStore, Quote, StoreError, WorkflowStore,
};

async fn store() -> Option<PgStore> {
    let url = std::env::var("DATABASE_URL").ok()?;
    Some(PgStore::connect(&url).await.expect("connect and migrate"))
}

fn at(s: &str) -> Timestamp {
    Timestamp::parse(s).expect("valid timestamp")
}

fn cents(c: i64) -> Money {
    Money::from_cents(c).expect("non-negative")
}

/// A quote plus a linked, fully populated invoice, both persisted.
async fn seeded(store: &PgStore) -> (Quote, Invoice) {
    let mut quote = Quote::new("Harbour Lights Gala", Some("events@harbour.test".into()));
    quote.updated_at = at("2026-05-01T10:00:00Z");
    store.save_quote(&quote).await.expect("save quote");

    let mut invoice = Invoice::draft(Some(quote.id), at("2026-05-01T10:05:00Z"));
    invoice.line_items = vec![
        LineItem::new("Canapés", 120, cents(450)),
        LineItem::new("Service staff: evening", 6, cents(18_000)),
    ];
    invoice.subtotal = cents(162_000);
    invoice.tax_rate_bps = 825;
    invoice.tax_amount = cents(13_365);
    invoice.total_amount = cents(175_365);
    invoice.due_date = Some(at("2026-06-01T23:59:59Z"));
    store.insert_invoice(&invoice).await.expect("insert invoice");
    (quote, invoice)
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn rows_read_back_as_written() {
    let Some(store) = store().await else { return };
    let (mut quote, invoice) = seeded(&store).await;

    assert_eq!(store.fetch_invoice(invoice.id).await.unwrap(), Some(invoice.clone()));
    assert_eq!(store.invoice_for_quote(quote.id).await.unwrap(), Some(invoice.clone()));
    assert_eq!(store.fetch_quote(quote.id).await.unwrap(), Some(quote.clone()));

    quote.status = QuoteStatus::Estimated;
    store.save_quote(&quote).await.unwrap();
    assert_eq!(store.fetch_quote(quote.id).await.unwrap().unwrap().status, QuoteStatus::Estimated);

    let mut deposit = Milestone::new(invoice.id, "deposit", cents(50_000))
        .with_due_date(at("2026-05-15T23:59:59Z"));
    let balance = Milestone::new(invoice.id, "balance", cents(125_365))
        .with_due_date(at("2026-06-01T23:59:59Z"));
    for m in [&balance, &deposit] {
        store.save_milestone(m).await.unwrap();
    }
    deposit.status = MilestoneStatus::Completed;
    deposit.completed_at = Some(at("2026-05-10T12:00:00Z"));
    store.save_milestone(&deposit).await.unwrap();

    assert_eq!(store.fetch_milestone(deposit.id).await.unwrap(), Some(deposit.clone()));
    assert_eq!(
        store.milestones_for_invoice(invoice.id).await.unwrap(),
        vec![deposit, balance]
    );
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn transitions_chain_audit_records() {
    let Some(store) = store().await else { return };
    let (_, invoice) = seeded(&store).await;

    for (to, actor) in [
        (InvoiceStatus::Sent, Actor::Admin),
        (InvoiceStatus::Approved, Actor::Customer),
    ] {
        let report = mutator::transition(&store, invoice.id, to, actor, Some("walkthrough".into()))
            .await
            .unwrap();
        assert!(report.audit.is_applied());
    }

    let stored = store.fetch_invoice(invoice.id).await.unwrap().unwrap();
    assert_eq!(stored.workflow_status, InvoiceStatus::Approved);
    assert_eq!(stored.last_status, Some(InvoiceStatus::Sent));
    assert_eq!(stored.status_changed_by, Some(Actor::Customer));
    assert_eq!(stored.version, invoice.version + 2);

    let trail = store.audit_trail(invoice.id).await.unwrap();
    assert_eq!(trail.len(), 2);
    assert_eq!(verify_chain(invoice.id, &trail), Ok(2));
    assert_eq!(store.latest_audit(invoice.id).await.unwrap().as_ref(), trail.last());

    let approved = store.invoices_with_status(&[InvoiceStatus::Approved]).await.unwrap();
    assert!(approved.iter().any(|i| i.id == invoice.id));
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn stale_version_is_rejected() {
    let Some(store) = store().await else { return };
    let (_, invoice) = seeded(&store).await;

    let mut edited = invoice.clone();
    edited.line_items.push(LineItem::new("Late-night snacks", 120, cents(300)));
    edited.version += 1;
    store.compare_and_save_invoice(&edited, invoice.version).await.unwrap();

    let err = store
        .compare_and_save_invoice(&edited, invoice.version)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::VersionMismatch { expected, found, .. }
            if expected == invoice.version && found == edited.version
    ));
    assert_eq!(store.fetch_invoice(invoice.id).await.unwrap(), Some(edited));
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn duplicate_insert_is_rejected() {
    let Some(store) = store().await else { return };
    let (_, invoice) = seeded(&store).await;
    assert!(matches!(
        store.insert_invoice(&invoice).await,
        Err(StoreError::Duplicate { kind: "invoice", .. })
    ));
}
