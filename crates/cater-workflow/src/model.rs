//! # Domain Records
//!
//! Invoices, quotes, payment milestones, and line items as they are
//! persisted. All money is in cents (see [`Money`]).
//!
//! `workflow_status` on an [`Invoice`] is only changed by
//! [`mutator::transition`](crate::mutator::transition). The other mutable
//! fields (line items and totals) change through
//! [`billing::update_line_items`](crate::billing::update_line_items).

use cater_core::{Actor, InvoiceId, MilestoneId, Money, QuoteId, Timestamp};
use cater_state::{InvoiceStatus, MilestoneStatus, QuoteStatus};
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// One priced line on an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: u32, unit_price: Money) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    /// `quantity × unit_price`.
    pub fn line_total(&self) -> Result<Money, WorkflowError> {
        Ok(self.unit_price.checked_mul(self.quantity)?)
    }
}

/// A billable document derived from a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    /// Originating quote, if the invoice came from one.
    pub quote_id: Option<QuoteId>,
    /// Human-facing number, `INV-YYYYMMDD-XXXXXXXX`.
    pub invoice_number: String,
    pub workflow_status: InvoiceStatus,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
    #[serde(default)]
    pub tax_rate_bps: u32,
    pub due_date: Option<Timestamp>,
    /// Status before the most recent transition.
    pub last_status: Option<InvoiceStatus>,
    pub status_changed_by: Option<Actor>,
    pub status_changed_at: Option<Timestamp>,
    /// Bumped by every write.
    #[serde(default)]
    pub version: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Invoice {
    /// A fresh draft with zero totals and version 1.
    pub fn draft(quote_id: Option<QuoteId>, created_at: Timestamp) -> Self {
        let id = InvoiceId::new();
        Self {
            id,
            quote_id,
            invoice_number: invoice_number(&id, &created_at),
            workflow_status: InvoiceStatus::Draft,
            line_items: Vec::new(),
            subtotal: Money::ZERO,
            tax_amount: Money::ZERO,
            total_amount: Money::ZERO,
            tax_rate_bps: 0,
            due_date: None,
            last_status: None,
            status_changed_by: None,
            status_changed_at: None,
            version: 1,
            created_at,
            updated_at: created_at,
        }
    }
}

/// `INV-` + creation date + first eight hex digits of the id, uppercased.
pub fn invoice_number(id: &InvoiceId, created_at: &Timestamp) -> String {
    let simple = id.as_uuid().simple().to_string();
    format!(
        "INV-{}-{}",
        created_at.as_datetime().format("%Y%m%d"),
        simple[..8].to_ascii_uppercase()
    )
}

/// The pre-billing record an invoice is promoted from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub customer_name: String,
    pub contact_email: Option<String>,
    pub status: QuoteStatus,
    pub updated_at: Timestamp,
}

impl Quote {
    pub fn new(customer_name: impl Into<String>, contact_email: Option<String>) -> Self {
        Self {
            id: QuoteId::new(),
            customer_name: customer_name.into(),
            contact_email,
            status: QuoteStatus::Pending,
            updated_at: Timestamp::now(),
        }
    }
}

/// A partial payment obligation on an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: MilestoneId,
    pub invoice_id: InvoiceId,
    /// e.g. "deposit", "final balance".
    pub label: String,
    pub amount: Money,
    pub due_date: Option<Timestamp>,
    pub status: MilestoneStatus,
    pub completed_at: Option<Timestamp>,
}

impl Milestone {
    pub fn new(invoice_id: InvoiceId, label: impl Into<String>, amount: Money) -> Self {
        Self {
            id: MilestoneId::new(),
            invoice_id,
            label: label.into(),
            amount,
            due_date: None,
            status: MilestoneStatus::Pending,
            completed_at: None,
        }
    }

    pub fn with_due_date(mut self, due_date: Timestamp) -> Self {
        self.due_date = Some(due_date);
        self
    }
}
