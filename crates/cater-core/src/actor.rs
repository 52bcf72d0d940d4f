//! # Actors
//!
//! The identity class responsible for a transition. Recorded on the
//! invoice and in every audit record; never used for authorization.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Who triggered a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// Back-office staff acting through the admin dashboards.
    Admin,
    /// The customer acting through the portal.
    Customer,
    /// Automatic transitions (milestone aggregation, overdue checks).
    System,
}

impl Actor {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Customer => "customer",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Actor {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "customer" => Ok(Self::Customer),
            "system" => Ok(Self::System),
            other => Err(CoreError::UnknownActor(other.to_string())),
        }
    }
}
