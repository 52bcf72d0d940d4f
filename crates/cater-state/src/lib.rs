//! # cater-state — Status Registry and Static Business Tables
//!
//! Every business rule of the billing workflow that is a flat table lives
//! here, as an exhaustive `match` over a closed enum:
//!
//! - **Invoice** (`invoice.rs`): the seven workflow statuses and the
//!   adjacency table that is the single source of truth for legal moves.
//!
//! - **Quote** (`quote.rs`): the coarser quote vocabulary and the total
//!   mapping from invoice status to quote status.
//!
//! - **Milestone** (`milestone.rs`): payment milestone statuses and their
//!   own small edge table.
//!
//! - **Notification** (`notification.rs`): which status change produces
//!   which notification, and for whom.
//!
//! ## Design
//!
//! The invoice status is persisted and arrives from storage at runtime, so
//! the machine is an enum with a validated `valid_transitions()` table
//! rather than a typestate. Changing a business rule means changing one
//! `match` arm; the compiler then points at every consumer that must be
//! revisited.
//!
//! Nothing in this crate performs I/O.

pub mod error;
pub mod invoice;
pub mod milestone;
pub mod notification;
pub mod quote;

pub use error::StateError;
pub use invoice::{is_valid_transition, validate_transition, InvoiceStatus};
pub use milestone::MilestoneStatus;
pub use notification::{notification_for, NotificationKind, NotificationRoute, RecipientClass};
pub use quote::QuoteStatus;
