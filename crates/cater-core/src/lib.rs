//! # cater-core — Foundational Types for the Billing Workflow
//!
//! Defines the primitives every other crate in the workspace builds on.
//! It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `InvoiceId`, `QuoteId`, `MilestoneId`,
//!    `AuditRecordId` wrap a UUID each. An invoice id cannot be passed
//!    where a quote id is expected.
//!
//! 2. **UTC-only timestamps.** [`Timestamp`] is UTC with seconds precision,
//!    so audit records and due dates compare and serialize deterministically.
//!
//! 3. **Integer money.** [`Money`] holds minor units (cents). No floats in
//!    totals, tax, or payment progress.
//!
//! 4. **Closed actor vocabulary.** [`Actor`] is `admin`, `customer`, or
//!    `system`. It is recorded for audit only; no authorization happens here.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `cater-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod actor;
pub mod error;
pub mod identity;
pub mod money;
pub mod temporal;

pub use actor::Actor;
pub use error::CoreError;
pub use identity::{AuditRecordId, InvoiceId, MilestoneId, QuoteId};
pub use money::Money;
pub use temporal::Timestamp;
