//! # cater-notify — Outbound Notifications
//!
//! The workflow fires at most one notification per invoice status change.
//! This crate defines what a notification is and who delivers it:
//!
//! - [`Notifier`]: the collaborator seam. One `send` call per notification;
//!   no retry and no batching at this layer.
//! - [`HttpNotifier`]: posts notifications as JSON to an external
//!   notification service.
//! - [`RecordingNotifier`]: keeps every notification in memory. Used by
//!   tests and by the CLI when no service is configured.
//!
//! Delivery mechanics (email rendering, push) live behind the HTTP service
//! and are not modelled here.

pub mod config;
pub mod error;
pub mod http;
pub mod recording;

pub use config::{ConfigError, NotifierConfig};
pub use error::NotifyError;
pub use http::HttpNotifier;
pub use recording::RecordingNotifier;

use cater_core::{Actor, InvoiceId, Timestamp};
use cater_state::{InvoiceStatus, NotificationKind, RecipientClass};
use serde::{Deserialize, Serialize};

/// A single outbound notification, as put on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Invoice whose status changed.
    pub invoice_id: InvoiceId,
    /// Template family.
    pub kind: NotificationKind,
    /// Recipient class; the service resolves the concrete address.
    pub recipient: RecipientClass,
    /// The status the invoice moved to.
    pub status: InvoiceStatus,
    /// Who triggered the change.
    pub actor: Actor,
    /// When the notification was built.
    pub created_at: Timestamp,
}

/// Delivers notifications.
///
/// Implementations report failure through [`NotifyError`]; callers in the
/// workflow treat every error as soft.
#[allow(async_fn_in_trait)]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the notification could not be handed off.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}
