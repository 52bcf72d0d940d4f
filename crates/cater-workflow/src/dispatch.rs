//! # Notification Dispatcher
//!
//! Looks up the routing table for the new status and makes at most one
//! `send` call, bounded by a timeout. Every failure is folded into the
//! returned outcome; nothing here returns `Err` or retries.

use std::time::Duration;

use cater_core::{Actor, InvoiceId, Timestamp};
use cater_notify::{Notification, Notifier};
use cater_state::{notification_for, InvoiceStatus};

use crate::report::SideEffect;

/// Outcome of one dispatch. `Skipped` when the status has no notification.
pub type DispatchOutcome = SideEffect<Notification>;

/// Notify whoever the routing table names for `new_status`.
pub async fn notify<N: Notifier>(
    notifier: &N,
    timeout: Duration,
    invoice_id: InvoiceId,
    new_status: InvoiceStatus,
    actor: Actor,
) -> DispatchOutcome {
    let Some(route) = notification_for(new_status) else {
        return SideEffect::Skipped;
    };
    let notification = Notification {
        invoice_id,
        kind: route.kind,
        recipient: route.recipient,
        status: new_status,
        actor,
        created_at: Timestamp::now(),
    };

    match tokio::time::timeout(timeout, notifier.send(&notification)).await {
        Ok(Ok(())) => {
            tracing::info!(
                invoice_id = %invoice_id,
                kind = %route.kind,
                recipient = %route.recipient,
                "notification sent"
            );
            SideEffect::Applied(notification)
        }
        Ok(Err(err)) => {
            tracing::warn!(invoice_id = %invoice_id, kind = %route.kind, error = %err, "notification failed");
            SideEffect::Failed(err.to_string())
        }
        Err(_) => {
            tracing::warn!(
                invoice_id = %invoice_id,
                kind = %route.kind,
                timeout_ms = timeout.as_millis() as u64,
                "notification timed out"
            );
            SideEffect::Failed(format!("notification timed out after {timeout:?}"))
        }
    }
}
