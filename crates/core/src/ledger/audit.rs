//! Append-only audit trail.

use chrono::{DateTime, Utc};
use paystore_shared::types::{AccountId, AuditId, RecordId};
use serde::{Deserialize, Serialize};

use super::record::{LedgerRecord, RecordKind, RecordStatus};

/// One audit entry, written in the same storage transaction as the record it
/// refers to. Entries are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry ID.
    pub id: AuditId,
    /// Whether the record is a payment or a withdrawal.
    pub kind: RecordKind,
    /// The record that was created.
    pub record_id: RecordId,
    /// Account the record belongs to.
    pub account_id: AccountId,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Builds the entry for a newly created record.
    #[must_use]
    pub fn for_record<S: RecordStatus>(record: &LedgerRecord<S>) -> Self {
        Self {
            id: AuditId::new(),
            kind: S::KIND,
            record_id: record.id,
            account_id: record.account_id,
            created_at: record.created_at,
        }
    }
}
