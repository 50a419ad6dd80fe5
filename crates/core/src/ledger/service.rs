//! Ledger service: atomic orchestration of ledger commands.
//!
//! Every mutating command follows the same shape:
//!
//! 1. begin a storage transaction under the configured deadline
//! 2. lock the account row, load what the command needs, apply business rules
//! 3. write the record, the account, and the audit entry, then commit
//! 4. project the committed result into the read model
//!
//! The deadline covers steps 1 and 2. An overrun drops the transaction, which
//! rolls it back, and reports a retryable `Timeout`. The commit itself runs
//! outside the deadline so a `Timeout` always means nothing was written. Any
//! error in step 2 or 3 rolls the transaction back. Projection failures are
//! logged and never fail the command.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paystore_shared::config::{CacheConfig, LedgerConfig};
use paystore_shared::types::{AccountId, CursorPage, PinId, RecordId};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::account::LedgerAccount;
use super::audit::AuditEntry;
use super::chain;
use super::error::LedgerError;
use super::fee::FeePolicy;
use super::organization::Organization;
use super::record::{
    LedgerRecord, Payment, PaymentStatus, RecordKind, RecordStatus, Withdrawal, WithdrawalStatus,
    timestamp, timestamp_after,
};
use super::store::{
    AccountStore, HistoryScope, LedgerStore, LedgerTx, OrganizationStore, PinStore, RecordStore,
    StoreError,
};
use crate::auth::{self, AccountPin, PinError};
use crate::read_model::{MokaReadModel, ReadModel, SnapshotCache};

/// Timing and paging settings of the service.
#[derive(Debug, Clone, Copy)]
pub struct LedgerSettings {
    /// Deadline for one storage transaction.
    pub transaction_timeout: Duration,
    /// Records per history page.
    pub page_size: u64,
}

impl LedgerSettings {
    /// Builds settings from configuration.
    #[must_use]
    pub const fn from_config(ledger: &LedgerConfig, cache: &CacheConfig) -> Self {
        Self {
            transaction_timeout: Duration::from_millis(ledger.transaction_timeout_ms),
            page_size: cache.item_per_page,
        }
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self::from_config(&LedgerConfig::default(), &CacheConfig::default())
    }
}

/// Store-of-record collaborators.
#[derive(Clone)]
pub struct LedgerStores {
    /// Organizations.
    pub organizations: Arc<dyn OrganizationStore>,
    /// Non-locking account access.
    pub accounts: Arc<dyn AccountStore>,
    /// PINs.
    pub pins: Arc<dyn PinStore>,
    /// Record reads.
    pub records: Arc<dyn RecordStore>,
    /// Transactions.
    pub ledger: Arc<dyn LedgerStore>,
}

impl LedgerStores {
    /// Uses one backend for every store.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: OrganizationStore + AccountStore + PinStore + RecordStore + LedgerStore + 'static,
    {
        Self {
            organizations: backend.clone(),
            accounts: backend.clone(),
            pins: backend.clone(),
            records: backend.clone(),
            ledger: backend,
        }
    }
}

/// Read-model collaborators.
#[derive(Clone)]
pub struct LedgerCaches {
    /// Account snapshots.
    pub accounts: Arc<dyn SnapshotCache<LedgerAccount>>,
    /// Payment snapshots and timelines.
    pub payments: Arc<dyn ReadModel<Payment>>,
    /// Withdrawal snapshots and timelines.
    pub withdrawals: Arc<dyn ReadModel<Withdrawal>>,
}

impl LedgerCaches {
    /// In-process caches backed by Moka.
    #[must_use]
    pub fn in_memory(config: &CacheConfig) -> Self {
        Self {
            accounts: Arc::new(MokaReadModel::<LedgerAccount>::new(config)),
            payments: Arc::new(MokaReadModel::<Payment>::new(config)),
            withdrawals: Arc::new(MokaReadModel::<Withdrawal>::new(config)),
        }
    }
}

/// Result of a chain verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    /// Account whose chain was walked.
    pub account_id: AccountId,
    /// Record type of the chain.
    pub kind: RecordKind,
    /// Number of records verified.
    pub records: usize,
}

/// Ledger service.
#[derive(Clone)]
pub struct LedgerService {
    stores: LedgerStores,
    caches: LedgerCaches,
    settings: LedgerSettings,
}

impl LedgerService {
    /// Creates a new ledger service.
    #[must_use]
    pub const fn new(stores: LedgerStores, caches: LedgerCaches, settings: LedgerSettings) -> Self {
        Self {
            stores,
            caches,
            settings,
        }
    }

    /// Returns the service settings.
    #[must_use]
    pub const fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    // ========== Organizations ==========

    /// Registers an organization.
    ///
    /// # Errors
    ///
    /// `InvalidOrganization`, `DuplicateSlug`, `DuplicateName`, or a storage error.
    pub async fn create_organization(
        &self,
        name: &str,
        slug: &str,
        fee_policy: FeePolicy,
    ) -> Result<Organization, LedgerError> {
        let organization = Organization::new(name, slug, fee_policy, timestamp())?;
        let store = &self.stores.organizations;

        if store
            .find_organization_by_slug(&organization.slug)
            .await?
            .is_some()
        {
            return Err(LedgerError::DuplicateSlug(organization.slug));
        }
        if store
            .find_organization_by_name(&organization.name)
            .await?
            .is_some()
        {
            return Err(LedgerError::DuplicateName(organization.name));
        }

        store
            .insert_organization(&organization)
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(field) if field.contains("name") => {
                    LedgerError::DuplicateName(organization.name.clone())
                }
                StoreError::Duplicate(_) => LedgerError::DuplicateSlug(organization.slug.clone()),
                other => other.into(),
            })?;

        info!(
            organization_id = %organization.id,
            slug = %organization.slug,
            fee_type = organization.fee_policy.type_str(),
            "organization created"
        );
        Ok(organization)
    }

    /// Finds an organization by slug.
    pub async fn organization_by_slug(&self, slug: &str) -> Result<Organization, LedgerError> {
        self.stores
            .organizations
            .find_organization_by_slug(slug)
            .await?
            .ok_or_else(|| LedgerError::OrganizationNotFound(slug.to_string()))
    }

    /// Replaces an organization's fee policy. Already-created records keep their fees.
    pub async fn update_fee_policy(
        &self,
        slug: &str,
        fee_policy: FeePolicy,
    ) -> Result<Organization, LedgerError> {
        let mut organization = self.organization_by_slug(slug).await?;
        organization.set_fee_policy(fee_policy, timestamp())?;
        self.stores
            .organizations
            .update_organization(&organization)
            .await?;

        info!(
            organization_id = %organization.id,
            fee_type = fee_policy.type_str(),
            fee_constant = fee_policy.constant(),
            "fee policy updated"
        );
        Ok(organization)
    }

    // ========== Accounts ==========

    /// Opens an account for an owner in an organization.
    ///
    /// # Errors
    ///
    /// `OrganizationNotFound`, `InvalidCurrency`, `DuplicateAccount`, `Timeout`,
    /// or a storage error.
    pub async fn create_account(
        &self,
        organization_slug: &str,
        external_id: &str,
        currency: &str,
    ) -> Result<LedgerAccount, LedgerError> {
        let account = self
            .with_deadline("create_account", async {
                let organization = self.organization_by_slug(organization_slug).await?;
                let store = &self.stores.accounts;

                if store
                    .find_account_by_external_id(organization.id, external_id)
                    .await?
                    .is_some()
                {
                    return Err(LedgerError::DuplicateAccount(external_id.to_string()));
                }

                let account =
                    LedgerAccount::open(organization.id, external_id, currency, timestamp())?;
                store.insert_account(&account).await.map_err(|e| match e {
                    StoreError::Duplicate(_) => LedgerError::DuplicateAccount(external_id.to_string()),
                    other => other.into(),
                })?;
                Ok(account)
            })
            .await?;

        info!(
            account_id = %account.id,
            organization_id = %account.organization_id,
            currency = %account.currency,
            "account created"
        );
        self.project_account(&account).await;
        Ok(account)
    }

    /// Reads an account, from the read model when possible.
    pub async fn account(&self, account_id: AccountId) -> Result<LedgerAccount, LedgerError> {
        match self.caches.accounts.get(&account_id.to_string()).await {
            Ok(Some(account)) => return Ok(account),
            Ok(None) => {}
            Err(e) => warn!(%account_id, error = %e, "account cache read failed"),
        }

        let account = self
            .stores
            .accounts
            .find_account(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        self.project_account(&account).await;
        Ok(account)
    }

    /// Deactivates an account. Pending records can still be finalized.
    pub async fn deactivate_account(&self, account_id: AccountId) -> Result<LedgerAccount, LedgerError> {
        let (tx, result) = self
            .with_deadline("deactivate_account", async {
                let mut tx = self.stores.ledger.begin().await?;
                let result: Result<LedgerAccount, LedgerError> = async {
                    let mut account = tx
                        .lock_account(account_id)
                        .await?
                        .ok_or(LedgerError::AccountNotFound(account_id))?;
                    if account.active {
                        account.deactivate(timestamp_after(account.updated_at));
                        tx.update_account(&account).await?;
                    }
                    Ok(account)
                }
                .await;
                Ok((tx, result))
            })
            .await?;
        let account = settle(tx, result).await?;

        info!(%account_id, "account deactivated");
        self.project_account(&account).await;
        Ok(account)
    }

    // ========== PIN ==========

    /// Sets or replaces the withdrawal PIN of an account.
    ///
    /// # Errors
    ///
    /// `InvalidPin`, `AccountNotFound`, or a storage error.
    pub async fn set_pin(&self, account_id: AccountId, pin: &str) -> Result<(), LedgerError> {
        auth::validate_pin(pin)?;
        self.stores
            .accounts
            .find_account(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))?;

        let pin = pin.to_string();
        let hash = blocking(move || auth::hash_pin(&pin)).await??;

        let now = timestamp();
        let stored = match self.stores.pins.find_pin(account_id).await? {
            Some(existing) => AccountPin {
                hash,
                updated_at: now,
                ..existing
            },
            None => AccountPin {
                id: PinId::new(),
                account_id,
                hash,
                created_at: now,
                updated_at: now,
            },
        };
        self.stores.pins.upsert_pin(&stored).await?;

        info!(%account_id, "pin set");
        Ok(())
    }

    /// Checks a candidate PIN against the account's stored PIN.
    ///
    /// # Errors
    ///
    /// `PinNotSet`, `PinMismatch`, or `InvalidHashFormat` if the stored hash is corrupt.
    pub async fn verify_pin(&self, account_id: AccountId, candidate: &str) -> Result<(), LedgerError> {
        let stored = self
            .stores
            .pins
            .find_pin(account_id)
            .await?
            .ok_or(LedgerError::PinNotSet(account_id))?;

        let candidate = candidate.to_string();
        let matches = blocking(move || auth::verify_pin(&candidate, &stored.hash))
            .await?
            .inspect_err(|e| {
                if matches!(e, PinError::InvalidHash) {
                    error!(%account_id, "stored pin hash is malformed");
                }
            })?;

        if matches {
            Ok(())
        } else {
            warn!(%account_id, "pin mismatch");
            Err(LedgerError::PinMismatch)
        }
    }

    // ========== Payments ==========

    /// Creates a pending payment. The balance moves only when it is paid.
    ///
    /// # Errors
    ///
    /// `AccountNotFound`, `AccountInactive`, `OrganizationNotFound`, a fee
    /// policy error, `Timeout`, or a storage error. Nothing is persisted on error.
    pub async fn create_payment(
        &self,
        account_id: AccountId,
        gross: i64,
        vendor_record_id: &str,
    ) -> Result<Payment, LedgerError> {
        self.create_record::<PaymentStatus>(account_id, gross, vendor_record_id)
            .await
    }

    /// Moves a pending payment to `paid` (crediting the account) or `failed`.
    ///
    /// # Errors
    ///
    /// `AccountNotFound`, `PaymentNotFound`, `UnmatchedAccount`,
    /// `InvalidTransition`, `Timeout`, or a storage error.
    pub async fn finalize_payment(
        &self,
        account_id: AccountId,
        payment_id: RecordId,
        status: PaymentStatus,
    ) -> Result<Payment, LedgerError> {
        self.finalize_record(account_id, payment_id, status).await
    }

    /// Reads a payment.
    pub async fn payment(&self, payment_id: RecordId) -> Result<Payment, LedgerError> {
        self.record::<PaymentStatus>(payment_id).await
    }

    /// One page of payment history.
    pub async fn payment_history(
        &self,
        scope: HistoryScope,
        cursor: Option<&str>,
    ) -> Result<CursorPage<Payment>, LedgerError> {
        self.history::<PaymentStatus>(scope, cursor).await
    }

    /// Walks an account's payment chain.
    ///
    /// # Errors
    ///
    /// `IntegrityViolation` on the first broken link or digest mismatch.
    pub async fn verify_payment_chain(&self, account_id: AccountId) -> Result<ChainReport, LedgerError> {
        self.verify_chain::<PaymentStatus>(account_id).await
    }

    // ========== Withdrawals ==========

    /// Creates a pending withdrawal after checking the PIN.
    ///
    /// The balance is checked now and debited only on success.
    ///
    /// # Errors
    ///
    /// `PinNotSet`, `PinMismatch`, `InvalidHashFormat`, `InsufficientFunds`,
    /// plus everything [`Self::create_payment`] can return.
    pub async fn create_withdrawal(
        &self,
        account_id: AccountId,
        gross: i64,
        vendor_record_id: &str,
        pin: &str,
    ) -> Result<Withdrawal, LedgerError> {
        self.verify_pin(account_id, pin).await?;
        self.create_record::<WithdrawalStatus>(account_id, gross, vendor_record_id)
            .await
    }

    /// Moves a pending withdrawal to `success` (debiting the account) or `failed`.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` if the balance no longer covers the withdrawal,
    /// plus everything [`Self::finalize_payment`] can return.
    pub async fn finalize_withdrawal(
        &self,
        account_id: AccountId,
        withdrawal_id: RecordId,
        status: WithdrawalStatus,
    ) -> Result<Withdrawal, LedgerError> {
        self.finalize_record(account_id, withdrawal_id, status).await
    }

    /// Reads a withdrawal.
    pub async fn withdrawal(&self, withdrawal_id: RecordId) -> Result<Withdrawal, LedgerError> {
        self.record::<WithdrawalStatus>(withdrawal_id).await
    }

    /// One page of withdrawal history.
    pub async fn withdrawal_history(
        &self,
        scope: HistoryScope,
        cursor: Option<&str>,
    ) -> Result<CursorPage<Withdrawal>, LedgerError> {
        self.history::<WithdrawalStatus>(scope, cursor).await
    }

    /// Walks an account's withdrawal chain.
    pub async fn verify_withdrawal_chain(
        &self,
        account_id: AccountId,
    ) -> Result<ChainReport, LedgerError> {
        self.verify_chain::<WithdrawalStatus>(account_id).await
    }

    // ========== History scopes ==========

    /// History scope of an account.
    pub async fn account_scope(&self, account_id: AccountId) -> Result<HistoryScope, LedgerError> {
        Ok(HistoryScope::account(&self.account(account_id).await?))
    }

    /// History scope of an organization.
    pub async fn organization_scope(&self, slug: &str) -> Result<HistoryScope, LedgerError> {
        let organization = self.organization_by_slug(slug).await?;
        Ok(HistoryScope::Organization {
            organization_id: organization.id,
        })
    }

    // ========== Shared record workflows ==========

    async fn create_record<S: Lane>(
        &self,
        account_id: AccountId,
        gross: i64,
        vendor_record_id: &str,
    ) -> Result<LedgerRecord<S>, LedgerError> {
        let (tx, result) = self
            .with_deadline("create_record", async {
                let mut tx = self.stores.ledger.begin().await?;
                let result = draft_in::<S>(tx.as_mut(), account_id, gross, vendor_record_id).await;
                Ok((tx, result))
            })
            .await?;
        let record = settle(tx, result).await?;

        info!(
            kind = %S::KIND,
            record_id = %record.id,
            %account_id,
            amount = record.amount,
            fees = record.fees,
            "record created"
        );

        let scopes = HistoryScope::all_for(record.account_id, record.organization_id);
        if let Err(e) = S::cache(&self.caches).append_to_timeline(&record, &scopes).await {
            warn!(kind = %S::KIND, record_id = %record.id, error = %e, "read model projection failed");
        }
        Ok(record)
    }

    async fn finalize_record<S: Lane>(
        &self,
        account_id: AccountId,
        record_id: RecordId,
        status: S,
    ) -> Result<LedgerRecord<S>, LedgerError> {
        let (tx, result) = self
            .with_deadline("finalize_record", async {
                let mut tx = self.stores.ledger.begin().await?;
                let result = finalize_in(tx.as_mut(), account_id, record_id, status).await;
                Ok((tx, result))
            })
            .await?;
        let (record, account) = settle(tx, result).await?;

        info!(
            kind = %S::KIND,
            %record_id,
            %account_id,
            status = %record.status,
            "record finalized"
        );

        if let Err(e) = S::cache(&self.caches).set(&record).await {
            warn!(kind = %S::KIND, %record_id, error = %e, "read model projection failed");
        }
        if let Some(account) = account {
            self.project_account(&account).await;
        }
        Ok(record)
    }

    async fn record<S: Lane>(&self, record_id: RecordId) -> Result<LedgerRecord<S>, LedgerError> {
        let cache = S::cache(&self.caches);
        match cache.get(&record_id.to_string()).await {
            Ok(Some(record)) => return Ok(record),
            Ok(None) => {}
            Err(e) => warn!(kind = %S::KIND, %record_id, error = %e, "record cache read failed"),
        }

        let record = S::fetch(self.stores.records.as_ref(), record_id)
            .await?
            .ok_or_else(|| S::not_found(record_id))?;
        if let Err(e) = cache.set(&record).await {
            warn!(kind = %S::KIND, %record_id, error = %e, "read model projection failed");
        }
        Ok(record)
    }

    async fn history<S: Lane>(
        &self,
        scope: HistoryScope,
        cursor: Option<&str>,
    ) -> Result<CursorPage<LedgerRecord<S>>, LedgerError> {
        let cache = S::cache(&self.caches);
        let limit = self.settings.page_size;

        match cache.fetch_page(&scope, cursor, limit).await {
            Ok(Some(page)) => return Ok(page),
            Ok(None) => debug!(kind = %S::KIND, ?scope, "history cache miss"),
            Err(e) => warn!(kind = %S::KIND, ?scope, error = %e, "history cache read failed"),
        }

        let mut items = S::page(self.stores.records.as_ref(), &scope, cursor, limit + 1).await?;
        let page_len = usize::try_from(limit).unwrap_or(usize::MAX);
        let exhausted = items.len() <= page_len;
        items.truncate(page_len);

        if let Err(e) = cache.seed(&scope, cursor, &items, exhausted).await {
            warn!(kind = %S::KIND, ?scope, error = %e, "history seeding failed");
        }
        Ok(CursorPage::new(items, exhausted, |r| r.rand_id.clone()))
    }

    async fn verify_chain<S: Lane>(&self, account_id: AccountId) -> Result<ChainReport, LedgerError> {
        self.stores
            .accounts
            .find_account(account_id)
            .await?
            .ok_or(LedgerError::AccountNotFound(account_id))?;

        let records = S::chain(self.stores.records.as_ref(), account_id).await?;
        chain::verify_chain(&records).map_err(|e| {
            error!(kind = %S::KIND, %account_id, error = %e, "hash chain verification failed");
            LedgerError::IntegrityViolation(e)
        })?;

        Ok(ChainReport {
            account_id,
            kind: S::KIND,
            records: records.len(),
        })
    }

    // ========== Plumbing ==========

    async fn with_deadline<T>(
        &self,
        operation: &'static str,
        work: impl Future<Output = Result<T, LedgerError>>,
    ) -> Result<T, LedgerError> {
        let deadline = self.settings.transaction_timeout;
        if let Ok(result) = tokio::time::timeout(deadline, work).await {
            result
        } else {
            let millis = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
            warn!(operation, timeout_ms = millis, "storage transaction timed out and was rolled back");
            Err(LedgerError::Timeout(millis))
        }
    }

    async fn project_account(&self, account: &LedgerAccount) {
        if let Err(e) = self.caches.accounts.set(account).await {
            warn!(account_id = %account.id, error = %e, "read model projection failed");
        }
    }
}

/// Builds, hashes, and stages a new pending record with its audit entry.
async fn draft_in<S: Lane>(
    tx: &mut dyn LedgerTx,
    account_id: AccountId,
    gross: i64,
    vendor_record_id: &str,
) -> Result<LedgerRecord<S>, LedgerError> {
    let account = tx
        .lock_account(account_id)
        .await?
        .ok_or(LedgerError::AccountNotFound(account_id))?;
    account.ensure_active()?;

    let organization = tx
        .find_organization(account.organization_id)
        .await?
        .ok_or_else(|| LedgerError::OrganizationNotFound(account.organization_id.to_string()))?;

    let latest = S::latest(tx, account_id).await?;

    // Chain order is creation order, so creation times must be strictly increasing per account.
    let now = latest
        .as_ref()
        .map_or_else(timestamp, |previous| timestamp_after(previous.created_at));
    let previous_hash = latest.map(|r| r.hash).unwrap_or_default();

    let record = LedgerRecord::<S>::draft(
        &account,
        &organization.fee_policy,
        gross,
        vendor_record_id,
        previous_hash,
        now,
    )?;

    S::insert(tx, &record).await?;
    tx.append_audit(&AuditEntry::for_record(&record)).await?;
    Ok(record)
}

/// Transitions a record and, when it settles, moves the account balance.
async fn finalize_in<S: Lane>(
    tx: &mut dyn LedgerTx,
    account_id: AccountId,
    record_id: RecordId,
    status: S,
) -> Result<(LedgerRecord<S>, Option<LedgerAccount>), LedgerError> {
    let mut account = tx
        .lock_account(account_id)
        .await?
        .ok_or(LedgerError::AccountNotFound(account_id))?;

    let mut record = S::find(tx, record_id)
        .await?
        .ok_or_else(|| S::not_found(record_id))?;
    if record.account_id != account.id {
        return Err(LedgerError::UnmatchedAccount {
            record: record_id,
            account: account_id,
        });
    }

    let now = timestamp_after(record.updated_at.max(account.updated_at));
    record.transition(status, now)?;
    S::update(tx, &record).await?;

    if status.is_settled() {
        S::settle(&mut account, record.amount, now)?;
        tx.update_account(&account).await?;
        return Ok((record, Some(account)));
    }
    Ok((record, None))
}

/// Commits on success, rolls back on failure.
async fn settle<T>(
    tx: Box<dyn LedgerTx>,
    result: Result<T, LedgerError>,
) -> Result<T, LedgerError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            debug!(error = %err, "rolling back storage transaction");
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "rollback failed");
            }
            Err(err)
        }
    }
}

/// Runs CPU-heavy PIN work off the async runtime.
async fn blocking<T, F>(work: F) -> Result<T, LedgerError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| LedgerError::Internal(format!("pin task failed: {e}")))
}

/// Per-record-type dispatch onto the stores and caches.
#[async_trait]
trait Lane: RecordStatus {
    fn not_found(id: RecordId) -> LedgerError;

    fn cache(caches: &LedgerCaches) -> &Arc<dyn ReadModel<LedgerRecord<Self>>>;

    /// Applies a settled record's amount to the account.
    fn settle(account: &mut LedgerAccount, amount: i64, now: DateTime<Utc>)
    -> Result<(), LedgerError>;

    async fn latest(
        tx: &mut dyn LedgerTx,
        account_id: AccountId,
    ) -> Result<Option<LedgerRecord<Self>>, StoreError>;

    async fn find(tx: &mut dyn LedgerTx, id: RecordId) -> Result<Option<LedgerRecord<Self>>, StoreError>;

    async fn insert(tx: &mut dyn LedgerTx, record: &LedgerRecord<Self>) -> Result<(), StoreError>;

    async fn update(tx: &mut dyn LedgerTx, record: &LedgerRecord<Self>) -> Result<(), StoreError>;

    async fn fetch(
        records: &dyn RecordStore,
        id: RecordId,
    ) -> Result<Option<LedgerRecord<Self>>, StoreError>;

    async fn page(
        records: &dyn RecordStore,
        scope: &HistoryScope,
        cursor: Option<&str>,
        limit: u64,
    ) -> Result<Vec<LedgerRecord<Self>>, StoreError>;

    async fn chain(
        records: &dyn RecordStore,
        account_id: AccountId,
    ) -> Result<Vec<LedgerRecord<Self>>, StoreError>;
}

#[async_trait]
impl Lane for PaymentStatus {
    fn not_found(id: RecordId) -> LedgerError {
        LedgerError::PaymentNotFound(id)
    }

    fn cache(caches: &LedgerCaches) -> &Arc<dyn ReadModel<Payment>> {
        &caches.payments
    }

    fn settle(
        account: &mut LedgerAccount,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        account.credit(amount, now)
    }

    async fn latest(tx: &mut dyn LedgerTx, account_id: AccountId) -> Result<Option<Payment>, StoreError> {
        tx.latest_payment(account_id).await
    }

    async fn find(tx: &mut dyn LedgerTx, id: RecordId) -> Result<Option<Payment>, StoreError> {
        tx.find_payment(id).await
    }

    async fn insert(tx: &mut dyn LedgerTx, record: &Payment) -> Result<(), StoreError> {
        tx.insert_payment(record).await
    }

    async fn update(tx: &mut dyn LedgerTx, record: &Payment) -> Result<(), StoreError> {
        tx.update_payment(record).await
    }

    async fn fetch(records: &dyn RecordStore, id: RecordId) -> Result<Option<Payment>, StoreError> {
        records.find_payment(id).await
    }

    async fn page(
        records: &dyn RecordStore,
        scope: &HistoryScope,
        cursor: Option<&str>,
        limit: u64,
    ) -> Result<Vec<Payment>, StoreError> {
        records.payments_page(scope, cursor, limit).await
    }

    async fn chain(records: &dyn RecordStore, account_id: AccountId) -> Result<Vec<Payment>, StoreError> {
        records.payment_chain(account_id).await
    }
}

#[async_trait]
impl Lane for WithdrawalStatus {
    fn not_found(id: RecordId) -> LedgerError {
        LedgerError::WithdrawalNotFound(id)
    }

    fn cache(caches: &LedgerCaches) -> &Arc<dyn ReadModel<Withdrawal>> {
        &caches.withdrawals
    }

    fn settle(
        account: &mut LedgerAccount,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        account.debit(amount, now)
    }

    async fn latest(
        tx: &mut dyn LedgerTx,
        account_id: AccountId,
    ) -> Result<Option<Withdrawal>, StoreError> {
        tx.latest_withdrawal(account_id).await
    }

    async fn find(tx: &mut dyn LedgerTx, id: RecordId) -> Result<Option<Withdrawal>, StoreError> {
        tx.find_withdrawal(id).await
    }

    async fn insert(tx: &mut dyn LedgerTx, record: &Withdrawal) -> Result<(), StoreError> {
        tx.insert_withdrawal(record).await
    }

    async fn update(tx: &mut dyn LedgerTx, record: &Withdrawal) -> Result<(), StoreError> {
        tx.update_withdrawal(record).await
    }

    async fn fetch(records: &dyn RecordStore, id: RecordId) -> Result<Option<Withdrawal>, StoreError> {
        records.find_withdrawal(id).await
    }

    async fn page(
        records: &dyn RecordStore,
        scope: &HistoryScope,
        cursor: Option<&str>,
        limit: u64,
    ) -> Result<Vec<Withdrawal>, StoreError> {
        records.withdrawals_page(scope, cursor, limit).await
    }

    async fn chain(
        records: &dyn RecordStore,
        account_id: AccountId,
    ) -> Result<Vec<Withdrawal>, StoreError> {
        records.withdrawal_chain(account_id).await
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
