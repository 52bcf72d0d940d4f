//! # Invoice Workflow Status
//!
//! The billing lifecycle of an invoice.
//!
//! ## Transitions
//!
//! ```text
//! DRAFT ──▶ SENT ──▶ APPROVED ──▶ PAID
//!   │        │  ▲       │          │
//!   │        ▼  │       ▼          │
//!   │   PENDING_REVIEW  OVERDUE ───┘ (paid)
//!   │        │           │
//!   ▼        ▼           ▼
//!           CANCELLED (terminal, reachable from every other state)
//! ```
//!
//! `SENT` may also go straight to `OVERDUE`, and `PENDING_REVIEW` straight
//! to `APPROVED`. There are no self-edges; re-requesting the current status
//! is an invalid transition like any other unlisted pair.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Workflow status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Created from a quote, still being edited.
    Draft,
    /// Estimate delivered to the customer.
    Sent,
    /// Customer asked for changes; back with the admin team.
    PendingReview,
    /// Customer accepted the estimate.
    Approved,
    /// Fully paid.
    Paid,
    /// Past the due date without full payment.
    Overdue,
    /// Withdrawn. Terminal.
    Cancelled,
}

impl InvoiceStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [InvoiceStatus; 7] = [
        Self::Draft,
        Self::Sent,
        Self::PendingReview,
        Self::Approved,
        Self::Paid,
        Self::Overdue,
        Self::Cancelled,
    ];

    /// Canonical snake_case name, as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::PendingReview => "pending_review",
            Self::Approved => "approved",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }

    /// Look up a status by its canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "draft" => Some(Self::Draft),
            "sent" => Some(Self::Sent),
            "pending_review" => Some(Self::PendingReview),
            "approved" => Some(Self::Approved),
            "paid" => Some(Self::Paid),
            "overdue" => Some(Self::Overdue),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// The adjacency table. This is the only place legal moves are defined.
    pub fn valid_transitions(&self) -> &'static [InvoiceStatus] {
        match self {
            Self::Draft => &[Self::Sent, Self::Cancelled],
            Self::Sent => &[
                Self::Approved,
                Self::PendingReview,
                Self::Overdue,
                Self::Cancelled,
            ],
            Self::PendingReview => &[Self::Sent, Self::Approved, Self::Cancelled],
            Self::Approved => &[Self::Paid, Self::Overdue, Self::Cancelled],
            Self::Paid => &[Self::Cancelled],
            Self::Overdue => &[Self::Paid, Self::Cancelled],
            Self::Cancelled => &[],
        }
    }

    /// Whether `to` is reachable from `self` in one step.
    pub fn can_transition_to(&self, to: InvoiceStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }

    /// Statuses from which an invoice may be marked overdue by the checker.
    pub fn is_overdue_candidate(&self) -> bool {
        matches!(self, Self::Sent | Self::Approved)
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| StateError::UnknownStatus {
            machine: "invoice",
            name: s.to_string(),
        })
    }
}

/// Pure validator over the adjacency table.
pub fn is_valid_transition(from: InvoiceStatus, to: InvoiceStatus) -> bool {
    from.can_transition_to(to)
}

/// Like [`is_valid_transition`], returning a structured error on rejection.
pub fn validate_transition(from: InvoiceStatus, to: InvoiceStatus) -> Result<(), StateError> {
    if is_valid_transition(from, to) {
        Ok(())
    } else {
        Err(StateError::InvalidTransition {
            machine: "invoice",
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_status() -> impl Strategy<Value = InvoiceStatus> {
        proptest::sample::select(InvoiceStatus::ALL.to_vec())
    }

    #[test]
    fn draft_edges() {
        assert!(is_valid_transition(InvoiceStatus::Draft, InvoiceStatus::Sent));
        assert!(is_valid_transition(InvoiceStatus::Draft, InvoiceStatus::Cancelled));
        assert!(!is_valid_transition(InvoiceStatus::Draft, InvoiceStatus::Paid));
        assert!(!is_valid_transition(InvoiceStatus::Draft, InvoiceStatus::Approved));
    }

    #[test]
    fn review_loop_back_to_sent() {
        assert!(is_valid_transition(InvoiceStatus::Sent, InvoiceStatus::PendingReview));
        assert!(is_valid_transition(InvoiceStatus::PendingReview, InvoiceStatus::Sent));
    }

    #[test]
    fn sent_cannot_jump_to_paid() {
        assert!(!is_valid_transition(InvoiceStatus::Sent, InvoiceStatus::Paid));
    }

    #[test]
    fn cancelled_is_the_only_terminal() {
        let terminals: Vec<_> = InvoiceStatus::ALL
            .iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminals, vec![&InvoiceStatus::Cancelled]);
    }

    #[test]
    fn overdue_candidates() {
        let candidates: Vec<_> = InvoiceStatus::ALL
            .into_iter()
            .filter(InvoiceStatus::is_overdue_candidate)
            .collect();
        assert_eq!(candidates, vec![InvoiceStatus::Sent, InvoiceStatus::Approved]);
    }

    #[test]
    fn validate_reports_names() {
        let err = validate_transition(InvoiceStatus::Paid, InvoiceStatus::Draft).unwrap_err();
        assert_eq!(err.to_string(), "invalid invoice transition: paid -> draft");
    }

    #[test]
    fn names_round_trip_and_match_serde() {
        for status in InvoiceStatus::ALL {
            assert_eq!(status.as_str().parse::<InvoiceStatus>().unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert!("PAID".parse::<InvoiceStatus>().is_err());
    }

    proptest! {
        #[test]
        fn no_self_transitions(s in any_status()) {
            prop_assert!(!is_valid_transition(s, s));
        }

        #[test]
        fn everything_except_cancelled_can_be_cancelled(s in any_status()) {
            prop_assert_eq!(
                is_valid_transition(s, InvoiceStatus::Cancelled),
                s != InvoiceStatus::Cancelled
            );
        }

        #[test]
        fn validate_agrees_with_predicate(from in any_status(), to in any_status()) {
            prop_assert_eq!(validate_transition(from, to).is_ok(), is_valid_transition(from, to));
        }
    }
}
