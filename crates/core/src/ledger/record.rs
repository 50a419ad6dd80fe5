//! Payment and withdrawal records and their lifecycle.
//!
//! Both record types share one shape and differ only in their status set and
//! in which side of the balance they move. A record is created `pending` and
//! makes exactly one transition to a terminal status; every transition
//! re-seals the hash while keeping the stored `previous_hash`.

use std::fmt;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use paystore_shared::types::{AccountId, OrganizationId, RecordId};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::account::LedgerAccount;
use super::chain;
use super::error::LedgerError;
use super::fee::FeePolicy;

/// Length of the secondary id used as a pagination cursor.
pub const RAND_ID_LEN: usize = 16;

/// Which side of the balance a record moves when it settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Credits the balance.
    Payment,
    /// Debits the balance.
    Withdraw,
}

impl RecordKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status set of a record type.
pub trait RecordStatus:
    Copy + Eq + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Record type this status set belongs to.
    const KIND: RecordKind;
    /// Initial status.
    const PENDING: Self;

    /// Returns the string representation of the status.
    fn as_str(&self) -> &'static str;

    /// Parses a status from a string.
    fn parse(s: &str) -> Option<Self>;

    /// True for statuses that admit no further transition.
    fn is_terminal(&self) -> bool;

    /// True for the terminal status that moves the balance.
    fn is_settled(&self) -> bool;
}

/// Payment status: `pending -> paid | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting settlement.
    Pending,
    /// Settled; the net amount was credited.
    Paid,
    /// Abandoned; the balance was not touched.
    Failed,
}

impl RecordStatus for PaymentStatus {
    const KIND: RecordKind = RecordKind::Payment;
    const PENDING: Self = Self::Pending;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Failed)
    }

    fn is_settled(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Withdrawal status: `pending -> success | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    /// Awaiting settlement.
    Pending,
    /// Settled; the net amount was debited.
    Success,
    /// Abandoned; the balance was not touched.
    Failed,
}

impl RecordStatus for WithdrawalStatus {
    const KIND: RecordKind = RecordKind::Withdraw;
    const PENDING: Self = Self::Pending;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    fn is_settled(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hash-chained financial record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord<S> {
    /// Record ID.
    pub id: RecordId,
    /// Secondary id, used as the history cursor.
    pub rand_id: String,
    /// Account the record belongs to.
    pub account_id: AccountId,
    /// Organization owning the account.
    pub organization_id: OrganizationId,
    /// Net amount that moves the balance on settlement.
    pub amount: i64,
    /// Fee computed at creation.
    pub fees: i64,
    /// Balance observed at creation.
    pub balance_before: i64,
    /// Projected balance after settlement, as of creation.
    pub balance_after: i64,
    /// Reference in the payment vendor's system.
    pub vendor_record_id: String,
    /// Lifecycle status.
    pub status: S,
    /// Hash of the account's previous record of the same type, empty for the first.
    pub previous_hash: String,
    /// Digest over the record's fields and `previous_hash`.
    pub hash: String,
    /// Creation time (microsecond precision).
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// A payment (credit) record.
pub type Payment = LedgerRecord<PaymentStatus>;

/// A withdrawal (debit) record.
pub type Withdrawal = LedgerRecord<WithdrawalStatus>;

impl<S: RecordStatus> LedgerRecord<S> {
    /// Builds a sealed, pending record against the account's current balance.
    ///
    /// The account itself is not mutated: the balance moves only on settlement.
    ///
    /// # Errors
    ///
    /// - `AccountInactive` if the account was deactivated
    /// - any fee policy error
    /// - `InsufficientFunds` for a withdrawal larger than the balance
    /// - `InvalidAmount` if the projected balance overflows
    pub fn draft(
        account: &LedgerAccount,
        fee_policy: &FeePolicy,
        gross: i64,
        vendor_record_id: impl Into<String>,
        previous_hash: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        account.ensure_active()?;
        let breakdown = fee_policy.apply(gross)?;

        let balance_before = account.balance;
        let balance_after = match S::KIND {
            RecordKind::Payment => balance_before
                .checked_add(breakdown.net)
                .ok_or(LedgerError::InvalidAmount(gross))?,
            RecordKind::Withdraw => {
                account.ensure_funds(breakdown.net)?;
                balance_before - breakdown.net
            }
        };

        let mut record = Self {
            id: RecordId::new(),
            rand_id: new_rand_id(),
            account_id: account.id,
            organization_id: account.organization_id,
            amount: breakdown.net,
            fees: breakdown.fee,
            balance_before,
            balance_after,
            vendor_record_id: vendor_record_id.into(),
            status: S::PENDING,
            previous_hash: String::new(),
            hash: String::new(),
            created_at: now,
            updated_at: now,
        };
        chain::seal(&mut record, previous_hash.into());
        Ok(record)
    }

    /// Moves a pending record to a terminal status and re-seals it.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` if the record is already terminal or `target` is pending.
    pub fn transition(&mut self, target: S, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.status.is_terminal() || !target.is_terminal() {
            return Err(LedgerError::InvalidTransition {
                from: self.status.as_str(),
                to: target.as_str(),
            });
        }

        self.status = target;
        self.updated_at = now;
        self.hash = chain::digest(self);
        Ok(())
    }
}

/// Generates a random alphanumeric secondary id.
#[must_use]
pub fn new_rand_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RAND_ID_LEN)
        .map(char::from)
        .collect()
}

/// Current time truncated to what the store of record keeps.
#[must_use]
pub fn timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Current time, moved one microsecond past `floor` if the clock has not passed it.
///
/// Successive writes to one row get strictly increasing timestamps, which
/// the read model uses to order snapshots.
#[must_use]
pub fn timestamp_after(floor: DateTime<Utc>) -> DateTime<Utc> {
    let now = timestamp();
    if now > floor {
        now
    } else {
        floor + TimeDelta::microseconds(1)
    }
}
