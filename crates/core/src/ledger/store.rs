//! Store-of-record contracts.
//!
//! These traits are implemented by the db crate (and by the in-memory store
//! used in tests). The ledger service receives them as trait objects.
//!
//! Every balance-mutating workflow goes through a [`LedgerTx`]: reads of the
//! account row are locking reads, and nothing becomes visible to other
//! transactions until [`LedgerTx::commit`]. Dropping a transaction without
//! committing rolls it back.

use async_trait::async_trait;
use paystore_shared::types::{AccountId, OrganizationId, RecordId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::account::LedgerAccount;
use super::audit::AuditEntry;
use super::organization::Organization;
use super::record::{Payment, Withdrawal};
use crate::auth::AccountPin;

/// Errors reported by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write. Carries the constraint or column name.
    #[error("duplicate value violates {0}")]
    Duplicate(String),

    /// Any other backend failure.
    #[error("{0}")]
    Backend(String),
}

/// Which history timeline a query addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum HistoryScope {
    /// All records of an organization.
    Organization {
        /// The organization.
        organization_id: OrganizationId,
    },
    /// Records of one account.
    Account {
        /// Organization owning the account.
        organization_id: OrganizationId,
        /// The account.
        account_id: AccountId,
    },
}

impl HistoryScope {
    /// Scope of a single account.
    #[must_use]
    pub const fn account(account: &LedgerAccount) -> Self {
        Self::Account {
            organization_id: account.organization_id,
            account_id: account.id,
        }
    }

    /// Every scope a record of `account` appears in, narrowest first.
    #[must_use]
    pub const fn all_for(account_id: AccountId, organization_id: OrganizationId) -> [Self; 2] {
        [
            Self::Account {
                organization_id,
                account_id,
            },
            Self::Organization { organization_id },
        ]
    }

    /// Key of the cached timeline for records in `namespace`.
    #[must_use]
    pub fn timeline_key(&self, namespace: &str) -> String {
        match self {
            Self::Organization { organization_id } => {
                format!("{namespace}:organization:{organization_id}")
            }
            Self::Account {
                organization_id,
                account_id,
            } => format!("{namespace}:organization:{organization_id}:balance:{account_id}"),
        }
    }

    /// Returns true if a record of this account belongs to the scope.
    #[must_use]
    pub fn contains(&self, account_id: AccountId, organization_id: OrganizationId) -> bool {
        match *self {
            Self::Organization {
                organization_id: org,
            } => org == organization_id,
            Self::Account {
                organization_id: org,
                account_id: acc,
            } => org == organization_id && acc == account_id,
        }
    }
}

/// Organization persistence.
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Finds an organization by ID.
    async fn find_organization(&self, id: OrganizationId) -> Result<Option<Organization>, StoreError>;

    /// Finds an organization by slug.
    async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Organization>, StoreError>;

    /// Finds an organization by name.
    async fn find_organization_by_name(&self, name: &str) -> Result<Option<Organization>, StoreError>;

    /// Inserts a new organization.
    async fn insert_organization(&self, organization: &Organization) -> Result<(), StoreError>;

    /// Persists changes to an existing organization.
    async fn update_organization(&self, organization: &Organization) -> Result<(), StoreError>;
}

/// Non-locking account access.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Finds an account by ID without locking it.
    async fn find_account(&self, id: AccountId) -> Result<Option<LedgerAccount>, StoreError>;

    /// Finds the account of an owner within an organization.
    async fn find_account_by_external_id(
        &self,
        organization_id: OrganizationId,
        external_id: &str,
    ) -> Result<Option<LedgerAccount>, StoreError>;

    /// Inserts a new, empty account.
    async fn insert_account(&self, account: &LedgerAccount) -> Result<(), StoreError>;
}

/// PIN persistence.
#[async_trait]
pub trait PinStore: Send + Sync {
    /// Finds the PIN of an account.
    async fn find_pin(&self, account_id: AccountId) -> Result<Option<AccountPin>, StoreError>;

    /// Inserts or replaces the PIN of an account.
    async fn upsert_pin(&self, pin: &AccountPin) -> Result<(), StoreError>;
}

/// Read side of payment and withdrawal records.
///
/// Page queries return records newest-first, strictly older than the record
/// whose `rand_id` equals `cursor`. An unknown cursor yields an empty page.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Finds a payment by ID.
    async fn find_payment(&self, id: RecordId) -> Result<Option<Payment>, StoreError>;

    /// Finds a withdrawal by ID.
    async fn find_withdrawal(&self, id: RecordId) -> Result<Option<Withdrawal>, StoreError>;

    /// One page of payments in `scope`.
    async fn payments_page(
        &self,
        scope: &HistoryScope,
        cursor: Option<&str>,
        limit: u64,
    ) -> Result<Vec<Payment>, StoreError>;

    /// One page of withdrawals in `scope`.
    async fn withdrawals_page(
        &self,
        scope: &HistoryScope,
        cursor: Option<&str>,
        limit: u64,
    ) -> Result<Vec<Withdrawal>, StoreError>;

    /// All payments of an account, oldest first.
    async fn payment_chain(&self, account_id: AccountId) -> Result<Vec<Payment>, StoreError>;

    /// All withdrawals of an account, oldest first.
    async fn withdrawal_chain(&self, account_id: AccountId) -> Result<Vec<Withdrawal>, StoreError>;
}

/// Entry point for atomic ledger work.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Begins a storage transaction.
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError>;
}

/// One storage transaction spanning accounts, records, and the audit trail.
#[async_trait]
pub trait LedgerTx: Send {
    /// Finds an organization inside the transaction.
    async fn find_organization(&mut self, id: OrganizationId) -> Result<Option<Organization>, StoreError>;

    /// Loads an account with a locking read (`SELECT ... FOR UPDATE`).
    ///
    /// The lock is held until the transaction ends.
    async fn lock_account(&mut self, id: AccountId) -> Result<Option<LedgerAccount>, StoreError>;

    /// Writes back an account previously loaded with [`Self::lock_account`].
    async fn update_account(&mut self, account: &LedgerAccount) -> Result<(), StoreError>;

    /// Most recent payment of an account.
    async fn latest_payment(&mut self, account_id: AccountId) -> Result<Option<Payment>, StoreError>;

    /// Finds a payment inside the transaction.
    async fn find_payment(&mut self, id: RecordId) -> Result<Option<Payment>, StoreError>;

    /// Inserts a payment.
    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), StoreError>;

    /// Persists a payment's status change.
    async fn update_payment(&mut self, payment: &Payment) -> Result<(), StoreError>;

    /// Most recent withdrawal of an account.
    async fn latest_withdrawal(&mut self, account_id: AccountId) -> Result<Option<Withdrawal>, StoreError>;

    /// Finds a withdrawal inside the transaction.
    async fn find_withdrawal(&mut self, id: RecordId) -> Result<Option<Withdrawal>, StoreError>;

    /// Inserts a withdrawal.
    async fn insert_withdrawal(&mut self, withdrawal: &Withdrawal) -> Result<(), StoreError>;

    /// Persists a withdrawal's status change.
    async fn update_withdrawal(&mut self, withdrawal: &Withdrawal) -> Result<(), StoreError>;

    /// Appends an audit entry.
    async fn append_audit(&mut self, entry: &AuditEntry) -> Result<(), StoreError>;

    /// Commits every write of the transaction.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discards every write of the transaction.
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_keys() {
        let organization_id = OrganizationId::new();
        let account_id = AccountId::new();
        let [account, organization] = HistoryScope::all_for(account_id, organization_id);

        assert_eq!(
            account.timeline_key("payment"),
            format!("payment:organization:{organization_id}:balance:{account_id}")
        );
        assert_eq!(
            organization.timeline_key("withdraw"),
            format!("withdraw:organization:{organization_id}")
        );
    }

    #[test]
    fn test_scope_contains() {
        let organization_id = OrganizationId::new();
        let account_id = AccountId::new();
        let [account, organization] = HistoryScope::all_for(account_id, organization_id);

        assert!(account.contains(account_id, organization_id));
        assert!(!account.contains(AccountId::new(), organization_id));
        assert!(organization.contains(AccountId::new(), organization_id));
        assert!(!organization.contains(account_id, OrganizationId::new()));
    }
}
