//! # Notification Routing Table
//!
//! Maps a new invoice status to at most one outbound notification. Statuses
//! without a row (draft, cancelled) notify nobody.

use serde::{Deserialize, Serialize};

use crate::invoice::InvoiceStatus;

/// Template family of an outbound notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The estimate is ready for the customer to review.
    EstimateReady,
    /// The customer asked for changes.
    ChangeRequestReceived,
    /// The customer approved the estimate.
    EstimateApproved,
    /// Payment received in full.
    PaymentConfirmed,
    /// Payment is past due.
    PaymentOverdue,
}

impl NotificationKind {
    /// Canonical snake_case name (template key on the notification service).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EstimateReady => "estimate_ready",
            Self::ChangeRequestReceived => "change_request_received",
            Self::EstimateApproved => "estimate_approved",
            Self::PaymentConfirmed => "payment_confirmed",
            Self::PaymentOverdue => "payment_overdue",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who receives a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientClass {
    /// The back-office team.
    Admin,
    /// The customer on the quote.
    Customer,
}

impl RecipientClass {
    /// Canonical snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Customer => "customer",
        }
    }
}

impl std::fmt::Display for RecipientClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRoute {
    /// Template family.
    pub kind: NotificationKind,
    /// Recipient class.
    pub recipient: RecipientClass,
}

/// The routing table.
pub fn notification_for(status: InvoiceStatus) -> Option<NotificationRoute> {
    let (kind, recipient) = match status {
        InvoiceStatus::Sent => (NotificationKind::EstimateReady, RecipientClass::Customer),
        InvoiceStatus::PendingReview => {
            (NotificationKind::ChangeRequestReceived, RecipientClass::Admin)
        }
        InvoiceStatus::Approved => (NotificationKind::EstimateApproved, RecipientClass::Admin),
        InvoiceStatus::Paid => (NotificationKind::PaymentConfirmed, RecipientClass::Customer),
        InvoiceStatus::Overdue => (NotificationKind::PaymentOverdue, RecipientClass::Customer),
        InvoiceStatus::Draft | InvoiceStatus::Cancelled => return None,
    };
    Some(NotificationRoute { kind, recipient })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sent_notifies_customer_estimate_ready() {
        assert_eq!(
            notification_for(InvoiceStatus::Sent),
            Some(NotificationRoute {
                kind: NotificationKind::EstimateReady,
                recipient: RecipientClass::Customer,
            })
        );
    }

    #[test]
    fn draft_and_cancelled_are_silent() {
        assert_eq!(notification_for(InvoiceStatus::Draft), None);
        assert_eq!(notification_for(InvoiceStatus::Cancelled), None);
    }

    #[test]
    fn admin_gets_review_and_approval() {
        for status in [InvoiceStatus::PendingReview, InvoiceStatus::Approved] {
            let route = notification_for(status).unwrap();
            assert_eq!(route.recipient, RecipientClass::Admin, "{status}");
        }
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&NotificationKind::ChangeRequestReceived).unwrap();
        assert_eq!(json, "\"change_request_received\"");
    }
}
