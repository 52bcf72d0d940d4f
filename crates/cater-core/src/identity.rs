//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier in the billing workflow. These
//! prevent accidental identifier confusion: a `QuoteId` cannot be passed
//! where an `InvoiceId` is expected, which matters because an invoice
//! carries a back-reference to its quote.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Identifier namespace, used in error messages and logs.
            pub const fn kind() -> &'static str {
                $kind
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|e| CoreError::InvalidIdentifier {
                        kind: $kind,
                        value: s.to_string(),
                        reason: e.to_string(),
                    })
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for an invoice.
    InvoiceId,
    "invoice"
);

uuid_identifier!(
    /// Unique identifier for the quote an invoice was promoted from.
    QuoteId,
    "quote"
);

uuid_identifier!(
    /// Unique identifier for a payment milestone (deposit, final balance).
    MilestoneId,
    "milestone"
);

uuid_identifier!(
    /// Unique identifier for an audit log record.
    AuditRecordId,
    "audit_record"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(InvoiceId::new(), InvoiceId::new());
    }

    #[test]
    fn parse_round_trips_display() {
        let id = QuoteId::new();
        let parsed: QuoteId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_trims_whitespace() {
        let id = MilestoneId::new();
        let parsed: MilestoneId = format!("  {id}\n").parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_garbage_with_kind() {
        let err = "not-a-uuid".parse::<InvoiceId>().unwrap_err();
        match err {
            CoreError::InvalidIdentifier { kind, value, .. } => {
                assert_eq!(kind, "invoice");
                assert_eq!(value, "not-a-uuid");
            }
            other => panic!("expected InvalidIdentifier, got {other:?}"),
        }
    }

    #[test]
    fn serializes_as_bare_uuid_string() {
        let id = InvoiceId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.0));
    }
}
