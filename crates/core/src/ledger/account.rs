//! Ledger account (balance) aggregate.
//!
//! The account holds the authoritative balance for one owner inside one
//! organization. Mutations happen in memory on a copy loaded under a row lock;
//! the caller persists the result before committing.

use chrono::{DateTime, Utc};
use paystore_shared::types::{AccountId, OrganizationId};
use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// Balance-holding account.
///
/// Invariants:
/// - `balance >= 0`
/// - `income_accumulation` and `withdraw_accumulation` never decrease
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAccount {
    /// Account ID.
    pub id: AccountId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Reference to the owner in the caller's system.
    pub external_id: String,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Current balance in minor units.
    pub balance: i64,
    /// Sum of all settled credits.
    pub income_accumulation: i64,
    /// Sum of all settled debits.
    pub withdraw_accumulation: i64,
    /// When the last payment settled.
    pub last_receive: Option<DateTime<Utc>>,
    /// When the last withdrawal settled.
    pub last_withdraw: Option<DateTime<Utc>>,
    /// Inactive accounts accept no new records.
    pub active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl LedgerAccount {
    /// Opens an empty account.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCurrency` unless `currency` is three uppercase ASCII letters.
    pub fn open(
        organization_id: OrganizationId,
        external_id: impl Into<String>,
        currency: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        let currency = currency.into();
        if currency.len() != 3 || !currency.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(LedgerError::InvalidCurrency(currency));
        }

        Ok(Self {
            id: AccountId::new(),
            organization_id,
            external_id: external_id.into(),
            currency,
            balance: 0,
            income_accumulation: 0,
            withdraw_accumulation: 0,
            last_receive: None,
            last_withdraw: None,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Credits the account.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if `amount <= 0` or an accumulator would overflow.
    /// The account is left unchanged on error.
    pub fn credit(&mut self, amount: i64, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount(amount))?;
        let income = self
            .income_accumulation
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount(amount))?;

        self.balance = balance;
        self.income_accumulation = income;
        self.last_receive = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Debits the account.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount <= 0` or the accumulator would overflow
    /// - `InsufficientFunds` if `amount > balance`
    ///
    /// The account is left unchanged on error.
    pub fn debit(&mut self, amount: i64, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.ensure_funds(amount)?;
        let withdrawn = self
            .withdraw_accumulation
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount(amount))?;

        self.balance -= amount;
        self.withdraw_accumulation = withdrawn;
        self.last_withdraw = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Fails with `InsufficientFunds` unless `amount` can be debited.
    pub fn ensure_funds(&self, amount: i64) -> Result<(), LedgerError> {
        if amount > self.balance {
            return Err(LedgerError::InsufficientFunds {
                available: self.balance,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Fails with `AccountInactive` if the account was deactivated.
    pub fn ensure_active(&self) -> Result<(), LedgerError> {
        if self.active {
            Ok(())
        } else {
            Err(LedgerError::AccountInactive(self.id))
        }
    }

    /// Deactivates the account. Settled history and the balance are kept.
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.active = false;
        self.updated_at = now;
    }
}
