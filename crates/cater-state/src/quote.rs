//! # Quote Status Projection
//!
//! A quote keeps its own, coarser status vocabulary. Whenever the invoice
//! derived from it changes status, the quote status is recomputed from the
//! fixed table in [`QuoteStatus::for_invoice`]. The table is total: an
//! invoice status without an explicit row projects to the default
//! (`pending`).

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::invoice::InvoiceStatus;

/// Status of the originating quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    /// Submitted, not yet priced. Also the projection default.
    #[default]
    Pending,
    /// Customer requested changes to the estimate.
    UnderReview,
    /// Estimate priced and delivered.
    Estimated,
    /// Estimate accepted.
    Approved,
    /// Accepted and waiting on an overdue payment.
    AwaitingPayment,
    /// Paid in full.
    Paid,
    /// Event confirmed by staff. Set outside the invoice projection.
    Confirmed,
}

impl QuoteStatus {
    /// Every status.
    pub const ALL: [QuoteStatus; 7] = [
        Self::Pending,
        Self::UnderReview,
        Self::Estimated,
        Self::Approved,
        Self::AwaitingPayment,
        Self::Paid,
        Self::Confirmed,
    ];

    /// The projection table from invoice status to quote status.
    pub fn for_invoice(status: InvoiceStatus) -> QuoteStatus {
        match status {
            InvoiceStatus::Draft => Self::Pending,
            InvoiceStatus::Sent => Self::Estimated,
            InvoiceStatus::PendingReview => Self::UnderReview,
            InvoiceStatus::Approved => Self::Approved,
            InvoiceStatus::Paid => Self::Paid,
            InvoiceStatus::Overdue => Self::AwaitingPayment,
            // No quote-side counterpart for a withdrawn invoice.
            InvoiceStatus::Cancelled => Self::default(),
        }
    }

    /// Canonical snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::UnderReview => "under_review",
            Self::Estimated => "estimated",
            Self::Approved => "approved",
            Self::AwaitingPayment => "awaiting_payment",
            Self::Paid => "paid",
            Self::Confirmed => "confirmed",
        }
    }

    /// Look up a status by its canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }
}

impl std::fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteStatus {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| StateError::UnknownStatus {
            machine: "quote",
            name: s.to_string(),
        })
    }
}
