//! # Audit Trail
//!
//! Append-only record of every invoice status change, one chain per
//! invoice. Each record stores the hash of its predecessor and its own
//! SHA-256 digest over a fixed field layout, so a deleted, reordered, or
//! edited record breaks verification.
//!
//! The first record of an invoice chains to [`GENESIS_HASH`].

use cater_core::{Actor, AuditRecordId, InvoiceId, Timestamp};
use cater_state::InvoiceStatus;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Predecessor hash of the first record in a chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// One audited status change. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditRecordId,
    pub invoice_id: InvoiceId,
    /// `None` for the creation record.
    pub previous_status: Option<InvoiceStatus>,
    pub new_status: InvoiceStatus,
    pub actor: Actor,
    pub reason: Option<String>,
    pub created_at: Timestamp,
    pub previous_hash: String,
    pub record_hash: String,
}

impl AuditRecord {
    /// Build the next record of an invoice's chain.
    ///
    /// `predecessor` is the latest existing record for the same invoice, or
    /// `None` when the chain is empty.
    pub fn chained(
        predecessor: Option<&AuditRecord>,
        invoice_id: InvoiceId,
        previous_status: Option<InvoiceStatus>,
        new_status: InvoiceStatus,
        actor: Actor,
        reason: Option<String>,
        created_at: Timestamp,
    ) -> Self {
        let mut record = Self {
            id: AuditRecordId::new(),
            invoice_id,
            previous_status,
            new_status,
            actor,
            reason,
            created_at,
            previous_hash: predecessor
                .map(|p| p.record_hash.clone())
                .unwrap_or_else(|| GENESIS_HASH.to_string()),
            record_hash: String::new(),
        };
        record.record_hash = record.compute_hash();
        record
    }

    /// Digest over every field except `record_hash` itself.
    pub fn compute_hash(&self) -> String {
        let hash_input = format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            self.previous_hash,
            self.id,
            self.invoice_id,
            self.previous_status.map(|s| s.as_str()).unwrap_or("-"),
            self.new_status,
            self.actor,
            self.reason.as_deref().unwrap_or(""),
            self.created_at.to_iso8601(),
        );
        sha256_hex(&hash_input)
    }
}

/// Where a chain stopped verifying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("record {index} belongs to invoice {found}, not {expected}")]
    ForeignRecord {
        index: usize,
        expected: InvoiceId,
        found: InvoiceId,
    },
    #[error("record {index} does not link to its predecessor")]
    BrokenLink { index: usize },
    #[error("record {index} content does not match its hash")]
    HashMismatch { index: usize },
}

/// Verify one invoice's chain, oldest record first.
///
/// Returns the number of records checked.
pub fn verify_chain(invoice_id: InvoiceId, records: &[AuditRecord]) -> Result<usize, ChainError> {
    let mut expected_prev: &str = GENESIS_HASH;
    for (index, record) in records.iter().enumerate() {
        if record.invoice_id != invoice_id {
            return Err(ChainError::ForeignRecord {
                index,
                expected: invoice_id,
                found: record.invoice_id,
            });
        }
        if record.previous_hash != expected_prev {
            return Err(ChainError::BrokenLink { index });
        }
        if record.compute_hash() != record.record_hash {
            return Err(ChainError::HashMismatch { index });
        }
        expected_prev = record.record_hash.as_str();
    }
    Ok(records.len())
}

fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
