//! # Payment Milestone Status
//!
//! A milestone is a partial payment obligation (deposit, final balance).
//!
//! ```text
//! PENDING ──▶ PROCESSING ──▶ COMPLETED (terminal)
//!    │  ▲          │              ▲
//!    │  └─ FAILED ◀┘              │
//!    └────────────────────────────┘
//! ```
//!
//! A failed charge can be retried (back to pending or straight to
//! processing). Completed is terminal.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Status of a payment milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    /// Not yet charged.
    #[default]
    Pending,
    /// Charge in flight.
    Processing,
    /// Paid.
    Completed,
    /// Charge failed.
    Failed,
}

impl MilestoneStatus {
    /// Every status.
    pub const ALL: [MilestoneStatus; 4] =
        [Self::Pending, Self::Processing, Self::Completed, Self::Failed];

    /// Canonical snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Legal next statuses.
    pub fn valid_transitions(&self) -> &'static [MilestoneStatus] {
        match self {
            Self::Pending => &[Self::Processing, Self::Completed, Self::Failed],
            Self::Processing => &[Self::Completed, Self::Failed],
            Self::Failed => &[Self::Pending, Self::Processing],
            Self::Completed => &[],
        }
    }

    /// Validate a move, returning a structured error on rejection.
    pub fn validate_transition(&self, to: MilestoneStatus) -> Result<(), StateError> {
        if self.valid_transitions().contains(&to) {
            Ok(())
        } else {
            Err(StateError::InvalidTransition {
                machine: "milestone",
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }

    /// Whether the obligation has been met.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MilestoneStatus {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| StateError::UnknownStatus {
                machine: "milestone",
                name: s.to_string(),
            })
    }
}
