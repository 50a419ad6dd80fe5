//! Hash chain over payment and withdrawal records.
//!
//! Each record's digest is SHA-256 over a canonical JSON rendering of its
//! immutable fields, its status, and the hash of the account's previous record
//! of the same type. Rewriting any digested field of any record is detectable.
//!
//! A record is sealed against its predecessor's hash as it was at creation
//! time. When the predecessor later moves to a terminal status its hash is
//! regenerated, so a link is accepted if it matches either the predecessor's
//! current hash or the hash it carried while pending.

use chrono::SecondsFormat;
use paystore_shared::types::RecordId;
use serde_json::json;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::record::{LedgerRecord, RecordStatus};

/// Errors found while walking a chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// `previous_hash` does not point at the predecessor.
    #[error("broken link at record {record}: previous hash '{actual}' does not match its predecessor")]
    BrokenLink {
        /// Record whose link is wrong.
        record: RecordId,
        /// The stored `previous_hash`.
        actual: String,
    },

    /// Stored hash differs from the recomputed digest.
    #[error("digest mismatch at record {record}: expected '{expected}', stored '{actual}'")]
    DigestMismatch {
        /// Record whose content changed.
        record: RecordId,
        /// Digest recomputed from the stored fields.
        expected: String,
        /// Hash stored on the record.
        actual: String,
    },
}

/// Computes the digest of a record against its stored `previous_hash`.
#[must_use]
pub fn digest<S: RecordStatus>(record: &LedgerRecord<S>) -> String {
    digest_with(record, record.status, &record.previous_hash)
}

/// Computes the digest of a record as if it had `status` and `previous_hash`.
fn digest_with<S: RecordStatus>(record: &LedgerRecord<S>, status: S, previous_hash: &str) -> String {
    // serde_json's default map is ordered by key, which makes the rendering canonical
    let payload = json!({
        "uuid": record.id,
        "randId": record.rand_id,
        "createdAt": record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        "amount": record.amount,
        "fees": record.fees,
        "balanceBefore": record.balance_before,
        "balanceAfter": record.balance_after,
        "accountId": record.account_id,
        "organizationId": record.organization_id,
        "vendorRecordId": record.vendor_record_id,
        "status": status.as_str(),
        "previousHash": previous_hash,
    });

    let mut hasher = Sha256::new();
    hasher.update(payload.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Links a record to its predecessor and stores its digest.
pub fn seal<S: RecordStatus>(record: &mut LedgerRecord<S>, previous_hash: String) {
    record.previous_hash = previous_hash;
    record.hash = digest(record);
}

/// Recomputes `record`'s digest against `previous` and compares it with the
/// stored hash. `previous` is `None` for the first record of a chain.
///
/// Both the predecessor's current hash and the hash it carried while pending
/// are accepted, matching [`verify_chain`].
#[must_use]
pub fn verify<S: RecordStatus>(record: &LedgerRecord<S>, previous: Option<&LedgerRecord<S>>) -> bool {
    let sealed_with =
        |previous_hash: &str| digest_with(record, record.status, previous_hash) == record.hash;
    match previous {
        None => sealed_with(""),
        Some(p) => sealed_with(&p.hash) || sealed_with(&pending_hash(p)),
    }
}

/// The hash `record` carried before its status left pending.
fn pending_hash<S: RecordStatus>(record: &LedgerRecord<S>) -> String {
    digest_with(record, S::PENDING, &record.previous_hash)
}

/// Walks an account's records oldest-first and checks every link and digest.
///
/// # Errors
///
/// Returns the first [`ChainError`] encountered.
pub fn verify_chain<S: RecordStatus>(records: &[LedgerRecord<S>]) -> Result<(), ChainError> {
    let mut previous: Option<&LedgerRecord<S>> = None;

    for record in records {
        let linked = match previous {
            None => record.previous_hash.is_empty(),
            Some(p) => {
                record.previous_hash == p.hash || record.previous_hash == pending_hash(p)
            }
        };
        if !linked {
            return Err(ChainError::BrokenLink {
                record: record.id,
                actual: record.previous_hash.clone(),
            });
        }

        let expected = digest(record);
        if expected != record.hash {
            return Err(ChainError::DigestMismatch {
                record: record.id,
                expected,
                actual: record.hash.clone(),
            });
        }

        previous = Some(record);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::account::LedgerAccount;
    use crate::ledger::fee::FeePolicy;
    use crate::ledger::record::{Payment, PaymentStatus, Withdrawal, timestamp};
    use paystore_shared::types::OrganizationId;
    use proptest::prelude::*;

    fn account() -> LedgerAccount {
        let mut account =
            LedgerAccount::open(OrganizationId::new(), "owner", "IDR", timestamp()).unwrap();
        account.balance = 1_000_000;
        account
    }

    fn chain_of(account: &LedgerAccount, amounts: &[i64]) -> Vec<Payment> {
        let mut records: Vec<Payment> = Vec::new();
        for amount in amounts {
            let previous = records.last().map(|r| r.hash.clone()).unwrap_or_default();
            let record = Payment::draft(
                account,
                &FeePolicy::Fixed(0),
                *amount,
                "vendor",
                previous,
                timestamp(),
            )
            .unwrap();
            records.push(record);
        }
        records
    }

    #[test]
    fn test_digest_is_deterministic_hex() {
        let records = chain_of(&account(), &[100]);
        let hash = digest(&records[0]);
        assert_eq!(hash, digest(&records[0]));
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_verify_fresh_records() {
        let records = chain_of(&account(), &[100, 200]);
        assert!(verify(&records[0], None));
        assert!(verify(&records[1], Some(&records[0])));
        assert!(!verify(&records[1], None));
    }

    #[test]
    fn test_verify_detects_amount_change() {
        let mut records = chain_of(&account(), &[100]);
        records[0].amount += 1;
        assert!(!verify(&records[0], None));
    }

    #[test]
    fn test_verify_chain_valid() {
        let records = chain_of(&account(), &[100, 200, 300]);
        assert_eq!(verify_chain(&records), Ok(()));
        assert_eq!(verify_chain::<PaymentStatus>(&[]), Ok(()));
    }

    #[test]
    fn test_verify_chain_accepts_finalized_predecessor() {
        let mut records = chain_of(&account(), &[100, 200, 300]);
        records[0].transition(PaymentStatus::Paid, timestamp()).unwrap();
        records[1].transition(PaymentStatus::Failed, timestamp()).unwrap();
        assert_eq!(verify_chain(&records), Ok(()));
    }

    #[test]
    fn test_verify_accepts_finalized_predecessor() {
        let mut records = chain_of(&account(), &[100, 200]);
        records[0].transition(PaymentStatus::Paid, timestamp()).unwrap();
        assert!(verify(&records[1], Some(&records[0])));

        records[1].amount += 1;
        assert!(!verify(&records[1], Some(&records[0])));
    }

    #[test]
    fn test_verify_chain_broken_link() {
        let mut records = chain_of(&account(), &[100, 200]);
        seal(&mut records[1], "forged".to_string());
        assert!(matches!(
            verify_chain(&records),
            Err(ChainError::BrokenLink { record, .. }) if record == records[1].id
        ));
    }

    #[test]
    fn test_verify_chain_digest_mismatch() {
        let mut records = chain_of(&account(), &[100, 200, 300]);
        records[1].vendor_record_id = "tampered".to_string();
        assert!(matches!(
            verify_chain(&records),
            Err(ChainError::DigestMismatch { record, .. }) if record == records[1].id
        ));
    }

    #[test]
    fn test_chains_of_different_accounts_are_independent() {
        let a = chain_of(&account(), &[100, 200]);
        let mut b = chain_of(&account(), &[100]);
        b[0].transition(PaymentStatus::Paid, timestamp()).unwrap();
        assert_eq!(verify_chain(&a), Ok(()));
        assert_eq!(verify_chain(&b), Ok(()));
    }

    #[test]
    fn test_withdrawal_first_record_has_empty_link() {
        let acc = account();
        let w = Withdrawal::draft(&acc, &FeePolicy::Fixed(0), 10, "v", "", timestamp()).unwrap();
        assert!(verify(&w, None));
        assert_eq!(verify_chain(&[w]), Ok(()));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Changing any digested numeric field invalidates the record.
        #[test]
        fn prop_tampering_detected(
            amounts in prop::collection::vec(1i64..1_000_000, 1..8),
            field in 0usize..4,
            delta in 1i64..1_000,
            pick in any::<prop::sample::Index>(),
        ) {
            let mut records = chain_of(&account(), &amounts);
            let i = pick.index(records.len());
            match field {
                0 => records[i].amount += delta,
                1 => records[i].fees += delta,
                2 => records[i].balance_before += delta,
                _ => records[i].balance_after += delta,
            }
            let previous = if i == 0 { None } else { Some(&records[i - 1]) };
            prop_assert!(!verify(&records[i], previous));
            prop_assert!(verify_chain(&records).is_err());
        }
    }
}
