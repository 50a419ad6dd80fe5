//! In-memory store of record.
//!
//! Implements every store contract on top of `DashMap` tables. A transaction
//! takes a per-account async mutex in [`LedgerTx::lock_account`] and holds it
//! until commit or drop, stages its writes, and applies them on commit.
//!
//! Faults can be injected to exercise rollback and timeout paths.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use paystore_shared::types::{AccountId, OrganizationId, RecordId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::account::LedgerAccount;
use super::audit::AuditEntry;
use super::organization::Organization;
use super::record::{LedgerRecord, Payment, RecordStatus, Withdrawal};
use super::store::{
    AccountStore, HistoryScope, LedgerStore, LedgerTx, OrganizationStore, PinStore, RecordStore,
    StoreError,
};
use crate::auth::AccountPin;

#[derive(Default)]
struct Tables {
    organizations: DashMap<OrganizationId, Organization>,
    accounts: DashMap<AccountId, LedgerAccount>,
    pins: DashMap<AccountId, AccountPin>,
    payments: DashMap<RecordId, Payment>,
    withdrawals: DashMap<RecordId, Withdrawal>,
    audit: DashMap<RecordId, Vec<AuditEntry>>,
    row_locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

#[derive(Default)]
struct Faults {
    fail_audit: AtomicBool,
    fail_commit: AtomicBool,
    lock_delay_ms: AtomicU64,
    read_delay_ms: AtomicU64,
    commit_delay_ms: AtomicU64,
}

/// `DashMap`-backed implementation of every store contract.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    tables: Arc<Tables>,
    faults: Arc<Faults>,
}

impl MemoryLedger {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every audit append fail until reset.
    pub fn fail_audit(&self, fail: bool) {
        self.faults.fail_audit.store(fail, Ordering::SeqCst);
    }

    /// Makes every commit fail until reset.
    pub fn fail_commit(&self, fail: bool) {
        self.faults.fail_commit.store(fail, Ordering::SeqCst);
    }

    /// Delays every row lock by `delay`.
    pub fn delay_locks(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.faults.lock_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Delays every non-transactional account and record lookup by `delay`,
    /// after the row has been read.
    pub fn delay_reads(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.faults.read_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Delays every commit by `delay` before its writes are applied.
    pub fn delay_commits(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.faults.commit_delay_ms.store(millis, Ordering::SeqCst);
    }

    async fn read_delay(&self) {
        let delay = self.faults.read_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    /// Number of committed payments.
    #[must_use]
    pub fn payment_count(&self) -> usize {
        self.tables.payments.len()
    }

    /// Number of committed withdrawals.
    #[must_use]
    pub fn withdrawal_count(&self) -> usize {
        self.tables.withdrawals.len()
    }

    /// Number of committed audit entries.
    #[must_use]
    pub fn audit_count(&self) -> usize {
        self.tables.audit.iter().map(|e| e.value().len()).sum()
    }

    /// Committed audit entries of a record.
    #[must_use]
    pub fn audit_for(&self, record_id: RecordId) -> Vec<AuditEntry> {
        self.tables
            .audit
            .get(&record_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    /// Rewrites a committed payment in place, bypassing every rule.
    pub fn tamper_payment(&self, id: RecordId, edit: impl FnOnce(&mut Payment)) {
        if let Some(mut payment) = self.tables.payments.get_mut(&id) {
            edit(payment.value_mut());
        }
    }

    /// Rewrites a committed withdrawal in place, bypassing every rule.
    pub fn tamper_withdrawal(&self, id: RecordId, edit: impl FnOnce(&mut Withdrawal)) {
        if let Some(mut withdrawal) = self.tables.withdrawals.get_mut(&id) {
            edit(withdrawal.value_mut());
        }
    }

    /// Overwrites the stored PIN hash of an account.
    pub fn overwrite_pin_hash(&self, account_id: AccountId, hash: &str) {
        if let Some(mut pin) = self.tables.pins.get_mut(&account_id) {
            pin.value_mut().hash = hash.to_string();
        }
    }
}

fn sorted_newest_first<S: RecordStatus>(mut records: Vec<LedgerRecord<S>>) -> Vec<LedgerRecord<S>> {
    records.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
    records
}

fn page_of<S: RecordStatus>(
    table: &DashMap<RecordId, LedgerRecord<S>>,
    scope: &HistoryScope,
    cursor: Option<&str>,
    limit: u64,
) -> Vec<LedgerRecord<S>> {
    let records = sorted_newest_first(
        table
            .iter()
            .filter(|e| scope.contains(e.account_id, e.organization_id))
            .map(|e| e.value().clone())
            .collect(),
    );

    let start = match cursor {
        None => 0,
        Some(cursor) => match records.iter().position(|r| r.rand_id == cursor) {
            Some(index) => index + 1,
            None => return Vec::new(),
        },
    };
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    records.into_iter().skip(start).take(limit).collect()
}

fn chain_of<S: RecordStatus>(
    table: &DashMap<RecordId, LedgerRecord<S>>,
    account_id: AccountId,
) -> Vec<LedgerRecord<S>> {
    let mut records = sorted_newest_first(
        table
            .iter()
            .filter(|e| e.account_id == account_id)
            .map(|e| e.value().clone())
            .collect(),
    );
    records.reverse();
    records
}

fn latest_of<S: RecordStatus>(
    committed: &DashMap<RecordId, LedgerRecord<S>>,
    staged: &HashMap<RecordId, LedgerRecord<S>>,
    account_id: AccountId,
) -> Option<LedgerRecord<S>> {
    let mut latest: Option<LedgerRecord<S>> = None;
    let candidates = committed
        .iter()
        .filter(|e| !staged.contains_key(e.key()))
        .map(|e| e.value().clone())
        .chain(staged.values().cloned())
        .filter(|r| r.account_id == account_id);
    for record in candidates {
        if latest
            .as_ref()
            .is_none_or(|l| (record.created_at, record.id) > (l.created_at, l.id))
        {
            latest = Some(record);
        }
    }
    latest
}

#[async_trait]
impl OrganizationStore for MemoryLedger {
    async fn find_organization(&self, id: OrganizationId) -> Result<Option<Organization>, StoreError> {
        Ok(self.tables.organizations.get(&id).map(|e| e.value().clone()))
    }

    async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Organization>, StoreError> {
        Ok(self
            .tables
            .organizations
            .iter()
            .find(|e| e.slug == slug)
            .map(|e| e.value().clone()))
    }

    async fn find_organization_by_name(&self, name: &str) -> Result<Option<Organization>, StoreError> {
        Ok(self
            .tables
            .organizations
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value().clone()))
    }

    async fn insert_organization(&self, organization: &Organization) -> Result<(), StoreError> {
        for existing in self.tables.organizations.iter() {
            if existing.slug == organization.slug {
                return Err(StoreError::Duplicate("organizations_slug_key".into()));
            }
            if existing.name == organization.name {
                return Err(StoreError::Duplicate("organizations_name_key".into()));
            }
        }
        self.tables
            .organizations
            .insert(organization.id, organization.clone());
        Ok(())
    }

    async fn update_organization(&self, organization: &Organization) -> Result<(), StoreError> {
        match self.tables.organizations.get_mut(&organization.id) {
            Some(mut existing) => {
                *existing = organization.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!(
                "organization {} does not exist",
                organization.id
            ))),
        }
    }
}

#[async_trait]
impl AccountStore for MemoryLedger {
    async fn find_account(&self, id: AccountId) -> Result<Option<LedgerAccount>, StoreError> {
        let account = self.tables.accounts.get(&id).map(|e| e.value().clone());
        self.read_delay().await;
        Ok(account)
    }

    async fn find_account_by_external_id(
        &self,
        organization_id: OrganizationId,
        external_id: &str,
    ) -> Result<Option<LedgerAccount>, StoreError> {
        Ok(self
            .tables
            .accounts
            .iter()
            .find(|e| e.organization_id == organization_id && e.external_id == external_id)
            .map(|e| e.value().clone()))
    }

    async fn insert_account(&self, account: &LedgerAccount) -> Result<(), StoreError> {
        let taken = self.tables.accounts.iter().any(|e| {
            e.organization_id == account.organization_id && e.external_id == account.external_id
        });
        if taken {
            return Err(StoreError::Duplicate("accounts_organization_external_key".into()));
        }
        self.tables.accounts.insert(account.id, account.clone());
        Ok(())
    }
}

#[async_trait]
impl PinStore for MemoryLedger {
    async fn find_pin(&self, account_id: AccountId) -> Result<Option<AccountPin>, StoreError> {
        Ok(self.tables.pins.get(&account_id).map(|e| e.value().clone()))
    }

    async fn upsert_pin(&self, pin: &AccountPin) -> Result<(), StoreError> {
        self.tables.pins.insert(pin.account_id, pin.clone());
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryLedger {
    async fn find_payment(&self, id: RecordId) -> Result<Option<Payment>, StoreError> {
        let payment = self.tables.payments.get(&id).map(|e| e.value().clone());
        self.read_delay().await;
        Ok(payment)
    }

    async fn find_withdrawal(&self, id: RecordId) -> Result<Option<Withdrawal>, StoreError> {
        let withdrawal = self.tables.withdrawals.get(&id).map(|e| e.value().clone());
        self.read_delay().await;
        Ok(withdrawal)
    }

    async fn payments_page(
        &self,
        scope: &HistoryScope,
        cursor: Option<&str>,
        limit: u64,
    ) -> Result<Vec<Payment>, StoreError> {
        Ok(page_of(&self.tables.payments, scope, cursor, limit))
    }

    async fn withdrawals_page(
        &self,
        scope: &HistoryScope,
        cursor: Option<&str>,
        limit: u64,
    ) -> Result<Vec<Withdrawal>, StoreError> {
        Ok(page_of(&self.tables.withdrawals, scope, cursor, limit))
    }

    async fn payment_chain(&self, account_id: AccountId) -> Result<Vec<Payment>, StoreError> {
        Ok(chain_of(&self.tables.payments, account_id))
    }

    async fn withdrawal_chain(&self, account_id: AccountId) -> Result<Vec<Withdrawal>, StoreError> {
        Ok(chain_of(&self.tables.withdrawals, account_id))
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        Ok(Box::new(MemoryTx {
            tables: self.tables.clone(),
            faults: self.faults.clone(),
            guards: Vec::new(),
            locked: HashSet::new(),
            accounts: HashMap::new(),
            payments: HashMap::new(),
            withdrawals: HashMap::new(),
            audit: Vec::new(),
        }))
    }
}

/// Staged writes plus the row locks they were made under.
struct MemoryTx {
    tables: Arc<Tables>,
    faults: Arc<Faults>,
    guards: Vec<OwnedMutexGuard<()>>,
    locked: HashSet<AccountId>,
    accounts: HashMap<AccountId, LedgerAccount>,
    payments: HashMap<RecordId, Payment>,
    withdrawals: HashMap<RecordId, Withdrawal>,
    audit: Vec<AuditEntry>,
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn find_organization(&mut self, id: OrganizationId) -> Result<Option<Organization>, StoreError> {
        Ok(self.tables.organizations.get(&id).map(|e| e.value().clone()))
    }

    async fn lock_account(&mut self, id: AccountId) -> Result<Option<LedgerAccount>, StoreError> {
        let delay = self.faults.lock_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if !self.locked.contains(&id) {
            let lock = self.tables.row_locks.entry(id).or_default().clone();
            self.guards.push(lock.lock_owned().await);
            self.locked.insert(id);
        }

        if let Some(staged) = self.accounts.get(&id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.tables.accounts.get(&id).map(|e| e.value().clone()))
    }

    async fn update_account(&mut self, account: &LedgerAccount) -> Result<(), StoreError> {
        if !self.locked.contains(&account.id) {
            return Err(StoreError::Backend(format!(
                "account {} updated without a row lock",
                account.id
            )));
        }
        self.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn latest_payment(&mut self, account_id: AccountId) -> Result<Option<Payment>, StoreError> {
        Ok(latest_of(&self.tables.payments, &self.payments, account_id))
    }

    async fn find_payment(&mut self, id: RecordId) -> Result<Option<Payment>, StoreError> {
        if let Some(staged) = self.payments.get(&id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.tables.payments.get(&id).map(|e| e.value().clone()))
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), StoreError> {
        self.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn update_payment(&mut self, payment: &Payment) -> Result<(), StoreError> {
        self.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn latest_withdrawal(&mut self, account_id: AccountId) -> Result<Option<Withdrawal>, StoreError> {
        Ok(latest_of(&self.tables.withdrawals, &self.withdrawals, account_id))
    }

    async fn find_withdrawal(&mut self, id: RecordId) -> Result<Option<Withdrawal>, StoreError> {
        if let Some(staged) = self.withdrawals.get(&id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.tables.withdrawals.get(&id).map(|e| e.value().clone()))
    }

    async fn insert_withdrawal(&mut self, withdrawal: &Withdrawal) -> Result<(), StoreError> {
        self.withdrawals.insert(withdrawal.id, withdrawal.clone());
        Ok(())
    }

    async fn update_withdrawal(&mut self, withdrawal: &Withdrawal) -> Result<(), StoreError> {
        self.withdrawals.insert(withdrawal.id, withdrawal.clone());
        Ok(())
    }

    async fn append_audit(&mut self, entry: &AuditEntry) -> Result<(), StoreError> {
        if self.faults.fail_audit.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("audit trail unavailable".into()));
        }
        self.audit.push(entry.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if self.faults.fail_commit.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("commit failed".into()));
        }
        let delay = self.faults.commit_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let tx = *self;
        for (id, account) in tx.accounts {
            tx.tables.accounts.insert(id, account);
        }
        for (id, payment) in tx.payments {
            tx.tables.payments.insert(id, payment);
        }
        for (id, withdrawal) in tx.withdrawals {
            tx.tables.withdrawals.insert(id, withdrawal);
        }
        for entry in tx.audit {
            tx.tables.audit.entry(entry.record_id).or_default().push(entry);
        }
        drop(tx.guards);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::fee::FeePolicy;
    use crate::ledger::record::{PaymentStatus, timestamp};

    async fn seeded() -> (MemoryLedger, LedgerAccount) {
        let store = MemoryLedger::new();
        let organization =
            Organization::new("Acme", "acme", FeePolicy::Fixed(0), timestamp()).unwrap();
        store.insert_organization(&organization).await.unwrap();
        let account =
            LedgerAccount::open(organization.id, "owner-1", "IDR", timestamp()).unwrap();
        store.insert_account(&account).await.unwrap();
        (store, account)
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible() {
        let (store, account) = seeded().await;
        let payment =
            Payment::draft(&account, &FeePolicy::Fixed(0), 10, "v", "", timestamp()).unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.lock_account(account.id).await.unwrap();
        tx.insert_payment(&payment).await.unwrap();
        assert!(tx.find_payment(payment.id).await.unwrap().is_some());
        assert!(store.find_payment(payment.id).await.unwrap().is_none());

        tx.rollback().await.unwrap();
        assert_eq!(store.payment_count(), 0);
    }

    #[tokio::test]
    async fn test_commit_applies_staged_writes() {
        let (store, mut account) = seeded().await;
        let mut payment =
            Payment::draft(&account, &FeePolicy::Fixed(0), 10, "v", "", timestamp()).unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.lock_account(account.id).await.unwrap();
        tx.insert_payment(&payment).await.unwrap();
        payment.transition(PaymentStatus::Paid, timestamp()).unwrap();
        tx.update_payment(&payment).await.unwrap();
        account.credit(10, timestamp()).unwrap();
        tx.update_account(&account).await.unwrap();
        tx.append_audit(&AuditEntry::for_record(&payment)).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.find_payment(payment.id).await.unwrap(), Some(payment.clone()));
        assert_eq!(store.find_account(account.id).await.unwrap().unwrap().balance, 10);
        assert_eq!(store.audit_for(payment.id).len(), 1);
    }

    #[tokio::test]
    async fn test_update_without_lock_is_rejected() {
        let (store, account) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        assert!(tx.update_account(&account).await.is_err());
    }

    #[tokio::test]
    async fn test_row_lock_blocks_second_transaction() {
        let (store, account) = seeded().await;

        let mut first = store.begin().await.unwrap();
        first.lock_account(account.id).await.unwrap();

        let mut second = store.begin().await.unwrap();
        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            second.lock_account(account.id),
        )
        .await;
        assert!(blocked.is_err());

        drop(first);
        assert!(second.lock_account(account.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unique_constraints() {
        let (store, account) = seeded().await;

        let same_slug =
            Organization::new("Other", "acme", FeePolicy::Fixed(0), timestamp()).unwrap();
        assert!(matches!(
            store.insert_organization(&same_slug).await,
            Err(StoreError::Duplicate(_))
        ));

        let same_owner =
            LedgerAccount::open(account.organization_id, "owner-1", "USD", timestamp()).unwrap();
        assert!(matches!(
            store.insert_account(&same_owner).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn test_pages_follow_cursor() {
        let (store, account) = seeded().await;
        let start = timestamp();
        let mut ids = Vec::new();
        for i in 0..5 {
            let payment = Payment::draft(
                &account,
                &FeePolicy::Fixed(0),
                10,
                "v",
                "",
                start + chrono::TimeDelta::seconds(i),
            )
            .unwrap();
            ids.push(payment.rand_id.clone());
            store.tables.payments.insert(payment.id, payment);
        }
        ids.reverse();

        let scope = HistoryScope::account(&account);
        let first = store.payments_page(&scope, None, 2).await.unwrap();
        assert_eq!(
            first.iter().map(|p| p.rand_id.clone()).collect::<Vec<_>>(),
            ids[..2]
        );

        let next = store
            .payments_page(&scope, Some(&ids[1]), 10)
            .await
            .unwrap();
        assert_eq!(next.len(), 3);
        assert_eq!(next[0].rand_id, ids[2]);

        assert!(store.payments_page(&scope, Some("unknown"), 10).await.unwrap().is_empty());
    }
}
