//! # cater-workflow — Invoice Billing Workflow
//!
//! Moves invoices through their billing lifecycle and keeps everything
//! downstream of a status change consistent with it.
//!
//! ## Modules
//!
//! - **Mutator** (`mutator.rs`): the single path that changes
//!   `workflow_status`. Validates, persists, appends the audit record.
//! - **Sync** (`sync.rs`): projects the invoice status onto its quote.
//! - **Dispatch** (`dispatch.rs`): at most one notification per change,
//!   with a timeout.
//! - **Milestones** (`milestones.rs`): last completed milestone pays the
//!   invoice.
//! - **Overdue** (`overdue.rs`): past-due `sent`/`approved` invoices become
//!   `overdue`.
//! - **Billing** (`billing.rs`): quote promotion, line-item edits, totals.
//! - **Reporting** (`reporting.rs`): payment progress and summaries.
//! - **Audit** (`audit.rs`): per-invoice SHA-256 hash chain.
//! - **Store** (`store/`): the persistence trait and its implementations.
//! - **Engine** (`engine.rs`): [`Workflow`], which runs the pipeline under
//!   per-invoice locks.
//!
//! The free functions take the store explicitly and can be called without
//! the engine. The engine adds locking, configuration, and side-effect
//! propagation.
//!
//! ## Soft vs. hard failures
//!
//! Validation and the core write return `Err`. Everything after the commit
//! (audit append, quote sync, notification) reports into a
//! [`TransitionReport`] and never rolls the transition back.

pub mod audit;
pub mod billing;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod milestones;
pub mod model;
pub mod mutator;
pub mod overdue;
pub mod report;
pub mod reporting;
pub mod store;
pub mod sync;

pub use audit::{verify_chain, AuditRecord, ChainError};
pub use config::WorkflowConfig;
pub use engine::{ChainStatus, InvoicePayment, MilestoneReport, OverdueOutcome, SweepReport, Workflow};
pub use error::{StoreError, SyncError, WorkflowError};
pub use model::{Invoice, LineItem, Milestone, Quote};
pub use report::{MutationReport, SideEffect, TransitionReport};
pub use store::{InMemoryStore, Snapshot, WorkflowStore};
#[cfg(feature = "postgres")]
pub use store::PgStore;
