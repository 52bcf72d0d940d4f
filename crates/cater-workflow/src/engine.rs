//! # Workflow Engine
//!
//! [`Workflow`] bundles the store, the notifier, the configuration, and a
//! table of per-invoice locks, and runs the one-directional pipeline:
//!
//! ```text
//! validate ─▶ persist + audit ─▶ sync quote ─▶ notify ─▶ report
//! ```
//!
//! Only the first two steps can fail the operation. Quote sync and
//! notification run after the commit and land in the returned
//! [`TransitionReport`] as [`SideEffect`]s.
//!
//! An invoice entering `approved` or `overdue` is then settled: if it has
//! milestones and all are complete, it moves on to `paid` under the same
//! lock and that second pipeline run is reported as the settlement.
//!
//! ## Locking
//!
//! Every write that goes through the engine holds the invoice's async mutex
//! for the whole pipeline. Two milestone completions on the same invoice
//! therefore cannot both observe "all complete", and quote sync order
//! follows commit order. The locks are process-local; several processes
//! sharing one database need row locks in the store instead.

use std::collections::BTreeMap;
use std::sync::Arc;

use cater_core::{Actor, InvoiceId, MilestoneId, QuoteId, Timestamp};
use cater_notify::Notifier;
use cater_state::{InvoiceStatus, MilestoneStatus};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::audit::{verify_chain, AuditRecord, ChainError};
use crate::billing::{self, NewInvoice};
use crate::config::WorkflowConfig;
use crate::dispatch;
use crate::error::WorkflowError;
use crate::milestones::{self, Aggregation};
use crate::model::{Invoice, LineItem, Milestone};
use crate::mutator;
use crate::overdue::{self, OverdueCheck};
use crate::report::{MutationReport, SideEffect, TransitionReport};
use crate::reporting::{self, PaymentProgress};
use crate::store::WorkflowStore;
use crate::sync::sync_quote_status;

/// Effect of a milestone completion on its invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InvoicePayment {
    Outstanding { completed: usize, total: usize },
    AlreadyPaid,
    MarkedPaid { transition: Box<TransitionReport> },
    /// Every milestone is complete but the invoice cannot move to `paid`
    /// from its current status. It is settled when it later enters
    /// `approved` or `overdue`.
    Blocked { reason: String },
}

/// Outcome of [`Workflow::complete_milestone`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MilestoneReport {
    pub milestone: Milestone,
    /// `false` when the milestone was already completed.
    pub newly_completed: bool,
    pub payment: InvoicePayment,
}

/// Outcome of [`Workflow::check_overdue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OverdueOutcome {
    MarkedOverdue { transition: Box<TransitionReport> },
    NotDue,
    NotEligible { status: InvoiceStatus },
}

/// Outcome of [`Workflow::sweep_overdue`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub checked: usize,
    pub marked: Vec<InvoiceId>,
    /// Invoices whose check failed; the sweep carries on past them.
    pub errors: Vec<(InvoiceId, String)>,
}

/// Result of re-verifying an invoice's audit chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStatus {
    Intact { records: usize },
    Broken(ChainError),
}

/// The billing workflow over a store and a notifier.
#[derive(Debug)]
pub struct Workflow<S, N> {
    store: S,
    notifier: N,
    config: WorkflowConfig,
    locks: DashMap<InvoiceId, Arc<Mutex<()>>>,
}

impl<S: WorkflowStore, N: Notifier> Workflow<S, N> {
    pub fn new(store: S, notifier: N, config: WorkflowConfig) -> Self {
        Self {
            store,
            notifier,
            config,
            locks: DashMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    fn invoice_lock(&self, invoice_id: InvoiceId) -> Arc<Mutex<()>> {
        // Clone out of the shard so no DashMap guard lives across an await.
        self.locks.entry(invoice_id).or_default().clone()
    }

    /// Move an invoice to `new_status` and run its side effects.
    pub async fn transition(
        &self,
        invoice_id: InvoiceId,
        new_status: InvoiceStatus,
        actor: Actor,
        reason: Option<String>,
    ) -> Result<TransitionReport, WorkflowError> {
        let lock = self.invoice_lock(invoice_id);
        let _guard = lock.lock().await;
        let mutation = mutator::transition(&self.store, invoice_id, new_status, actor, reason).await?;
        let mut report = self.propagate(mutation, actor).await;
        report.settlement = self.settle(&report).await;
        Ok(report)
    }

    /// Caller holds the invoice lock.
    async fn settle(&self, report: &TransitionReport) -> SideEffect<Box<TransitionReport>> {
        if !report.new_status().can_transition_to(InvoiceStatus::Paid) {
            return SideEffect::Skipped;
        }
        let invoice_id = report.invoice.id;
        match milestones::settle_invoice(&self.store, invoice_id).await {
            Ok(Aggregation::MarkedPaid(mutation)) => {
                tracing::info!(invoice_id = %invoice_id, "invoice settled by completed milestones");
                SideEffect::Applied(Box::new(self.propagate(*mutation, Actor::System).await))
            }
            Ok(Aggregation::Outstanding { .. } | Aggregation::AlreadyPaid) => SideEffect::Skipped,
            Err(err) => {
                tracing::warn!(invoice_id = %invoice_id, error = %err, "settlement failed; transition stands");
                SideEffect::Failed(err.to_string())
            }
        }
    }

    async fn propagate(&self, mutation: MutationReport, actor: Actor) -> TransitionReport {
        let invoice_id = mutation.invoice.id;
        let new_status = mutation.invoice.workflow_status;

        let quote_sync = match mutation.invoice.quote_id {
            None => SideEffect::Skipped,
            Some(quote_id) => match sync_quote_status(&self.store, quote_id, new_status).await {
                Ok(status) => SideEffect::Applied(status),
                Err(err) => {
                    tracing::warn!(
                        invoice_id = %invoice_id,
                        quote_id = %quote_id,
                        error = %err,
                        "quote sync failed; transition stands"
                    );
                    SideEffect::Failed(err.to_string())
                }
            },
        };

        let notification = dispatch::notify(
            &self.notifier,
            self.config.notify_timeout,
            invoice_id,
            new_status,
            actor,
        )
        .await;

        TransitionReport {
            invoice: mutation.invoice,
            previous_status: mutation.previous_status,
            audit: mutation.audit,
            quote_sync,
            notification,
            settlement: SideEffect::Skipped,
        }
    }

    /// Mark a milestone completed and, if it was the last open one, the
    /// invoice paid.
    ///
    /// Completing an already-completed milestone writes nothing but still
    /// re-runs the aggregation. If the milestone is saved but the invoice
    /// update then fails, the error is returned and a retry is safe.
    pub async fn complete_milestone(
        &self,
        milestone_id: MilestoneId,
        actor: Actor,
    ) -> Result<MilestoneReport, WorkflowError> {
        let invoice_id = self.fetch_milestone(milestone_id).await?.invoice_id;
        let lock = self.invoice_lock(invoice_id);
        let _guard = lock.lock().await;

        let mut milestone = self.fetch_milestone(milestone_id).await?;
        let newly_completed = !milestone.status.is_completed();
        if newly_completed {
            milestone.status.validate_transition(MilestoneStatus::Completed)?;
            milestone.status = MilestoneStatus::Completed;
            milestone.completed_at = Some(Timestamp::now());
            self.store.save_milestone(&milestone).await?;
            tracing::info!(
                milestone_id = %milestone_id,
                invoice_id = %invoice_id,
                label = %milestone.label,
                amount = %milestone.amount,
                actor = %actor,
                "milestone completed"
            );
        }

        let payment = match milestones::on_milestone_completed(&self.store, milestone_id).await {
            Ok(Aggregation::Outstanding { completed, total }) => {
                InvoicePayment::Outstanding { completed, total }
            }
            Ok(Aggregation::AlreadyPaid) => InvoicePayment::AlreadyPaid,
            Ok(Aggregation::MarkedPaid(mutation)) => InvoicePayment::MarkedPaid {
                transition: Box::new(self.propagate(*mutation, Actor::System).await),
            },
            Err(err @ WorkflowError::InvalidTransition { .. }) => {
                tracing::warn!(
                    invoice_id = %invoice_id,
                    error = %err,
                    "all milestones completed but invoice cannot be marked paid"
                );
                InvoicePayment::Blocked {
                    reason: err.to_string(),
                }
            }
            Err(err) => return Err(err),
        };

        Ok(MilestoneReport {
            milestone,
            newly_completed,
            payment,
        })
    }

    /// Move a milestone along its own edge table. `Completed` goes through
    /// [`complete_milestone`](Self::complete_milestone).
    pub async fn set_milestone_status(
        &self,
        milestone_id: MilestoneId,
        status: MilestoneStatus,
        actor: Actor,
    ) -> Result<Milestone, WorkflowError> {
        if status == MilestoneStatus::Completed {
            return Ok(self.complete_milestone(milestone_id, actor).await?.milestone);
        }
        let invoice_id = self.fetch_milestone(milestone_id).await?.invoice_id;
        let lock = self.invoice_lock(invoice_id);
        let _guard = lock.lock().await;

        let mut milestone = self.fetch_milestone(milestone_id).await?;
        milestone.status.validate_transition(status)?;
        let from = milestone.status;
        milestone.status = status;
        self.store.save_milestone(&milestone).await?;
        tracing::info!(
            milestone_id = %milestone_id,
            from = %from,
            to = %status,
            actor = %actor,
            "milestone status changed"
        );
        Ok(milestone)
    }

    async fn fetch_milestone(&self, milestone_id: MilestoneId) -> Result<Milestone, WorkflowError> {
        self.store
            .fetch_milestone(milestone_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("milestone", milestone_id))
    }

    /// Run the overdue checker on one invoice.
    pub async fn check_overdue(
        &self,
        invoice_id: InvoiceId,
        now: Timestamp,
    ) -> Result<OverdueOutcome, WorkflowError> {
        let lock = self.invoice_lock(invoice_id);
        let _guard = lock.lock().await;
        Ok(
            match overdue::check_and_mark_overdue(&self.store, invoice_id, now).await? {
                OverdueCheck::MarkedOverdue(mutation) => {
                    let mut report = self.propagate(*mutation, Actor::System).await;
                    report.settlement = self.settle(&report).await;
                    OverdueOutcome::MarkedOverdue {
                        transition: Box::new(report),
                    }
                }
                OverdueCheck::NotDue => OverdueOutcome::NotDue,
                OverdueCheck::NotEligible(status) => OverdueOutcome::NotEligible { status },
            },
        )
    }

    /// Check every `sent` or `approved` invoice.
    pub async fn sweep_overdue(&self, now: Timestamp) -> Result<SweepReport, WorkflowError> {
        let candidates = self
            .store
            .invoices_with_status(&[InvoiceStatus::Sent, InvoiceStatus::Approved])
            .await?;
        let mut report = SweepReport::default();
        for invoice in candidates {
            report.checked += 1;
            match self.check_overdue(invoice.id, now).await {
                Ok(OverdueOutcome::MarkedOverdue { .. }) => report.marked.push(invoice.id),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(invoice_id = %invoice.id, error = %err, "overdue check failed");
                    report.errors.push((invoice.id, err.to_string()));
                }
            }
        }
        tracing::info!(
            checked = report.checked,
            marked = report.marked.len(),
            errors = report.errors.len(),
            "overdue sweep finished"
        );
        Ok(report)
    }

    /// Promote a quote using the configured tax rate and payment terms.
    pub async fn promote_quote(
        &self,
        quote_id: QuoteId,
        line_items: Vec<LineItem>,
        due_date: Option<Timestamp>,
    ) -> Result<Invoice, WorkflowError> {
        let due_date = due_date.unwrap_or_else(|| {
            Timestamp::now().plus_days(i64::from(self.config.default_payment_terms_days))
        });
        billing::promote_quote(
            &self.store,
            quote_id,
            NewInvoice {
                line_items,
                tax_rate_bps: self.config.default_tax_rate_bps,
                due_date: Some(due_date),
            },
        )
        .await
    }

    /// Optimistic-lock line-item edit.
    pub async fn update_line_items(
        &self,
        invoice_id: InvoiceId,
        expected_version: u64,
        items: Vec<LineItem>,
    ) -> Result<Invoice, WorkflowError> {
        let lock = self.invoice_lock(invoice_id);
        let _guard = lock.lock().await;
        billing::update_line_items(&self.store, invoice_id, expected_version, items).await
    }

    pub async fn invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, WorkflowError> {
        self.store
            .fetch_invoice(invoice_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("invoice", invoice_id))
    }

    pub async fn payment_progress(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<PaymentProgress, WorkflowError> {
        let invoice = self.invoice(invoice_id).await?;
        let milestones = self.store.milestones_for_invoice(invoice_id).await?;
        Ok(reporting::payment_progress(&invoice, &milestones))
    }

    pub async fn status_summary(&self) -> Result<BTreeMap<InvoiceStatus, usize>, WorkflowError> {
        let invoices = self.store.invoices_with_status(&InvoiceStatus::ALL).await?;
        Ok(reporting::status_summary(&invoices))
    }

    pub async fn audit_trail(&self, invoice_id: InvoiceId) -> Result<Vec<AuditRecord>, WorkflowError> {
        Ok(self.store.audit_trail(invoice_id).await?)
    }

    pub async fn verify_audit(&self, invoice_id: InvoiceId) -> Result<ChainStatus, WorkflowError> {
        let records = self.audit_trail(invoice_id).await?;
        Ok(match verify_chain(invoice_id, &records) {
            Ok(records) => ChainStatus::Intact { records },
            Err(err) => ChainStatus::Broken(err),
        })
    }
}
