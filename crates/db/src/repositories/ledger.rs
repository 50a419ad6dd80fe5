//! Storage transactions for balance-mutating workflows.

use async_trait::async_trait;
use paystore_core::ledger::{
    AuditEntry, LedgerAccount, LedgerStore, LedgerTx, Organization, Payment, StoreError,
    Withdrawal,
};
use paystore_shared::types::{AccountId, OrganizationId, RecordId};
use sea_orm::{
    ActiveModelTrait, DatabaseTransaction, EntityTrait, QuerySelect, TransactionTrait,
};
use tracing::debug;

use super::mapping::{account_model, audit_model};
use super::record::{payment_rows, withdrawal_rows};
use super::{SeaStore, store_error};
use crate::entities::{accounts, organizations, transactions};

/// One `PostgreSQL` transaction. Dropping it without commit rolls it back.
pub struct SeaLedgerTx {
    txn: DatabaseTransaction,
}

#[async_trait]
impl LedgerStore for SeaStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        let txn = self.db.begin().await.map_err(store_error)?;
        Ok(Box::new(SeaLedgerTx { txn }))
    }
}

#[async_trait]
impl LedgerTx for SeaLedgerTx {
    async fn find_organization(&mut self, id: OrganizationId) -> Result<Option<Organization>, StoreError> {
        let model = organizations::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(model.map(Organization::from))
    }

    async fn lock_account(&mut self, id: AccountId) -> Result<Option<LedgerAccount>, StoreError> {
        debug!(account_id = %id, "locking account row");
        let model = accounts::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(model.map(LedgerAccount::from))
    }

    async fn update_account(&mut self, account: &LedgerAccount) -> Result<(), StoreError> {
        account_model(account)
            .update(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn latest_payment(&mut self, account_id: AccountId) -> Result<Option<Payment>, StoreError> {
        payment_rows::latest(&self.txn, account_id).await
    }

    async fn find_payment(&mut self, id: RecordId) -> Result<Option<Payment>, StoreError> {
        payment_rows::find(&self.txn, id).await
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), StoreError> {
        payment_rows::insert(&self.txn, payment).await
    }

    async fn update_payment(&mut self, payment: &Payment) -> Result<(), StoreError> {
        payment_rows::update(&self.txn, payment).await
    }

    async fn latest_withdrawal(&mut self, account_id: AccountId) -> Result<Option<Withdrawal>, StoreError> {
        withdrawal_rows::latest(&self.txn, account_id).await
    }

    async fn find_withdrawal(&mut self, id: RecordId) -> Result<Option<Withdrawal>, StoreError> {
        withdrawal_rows::find(&self.txn, id).await
    }

    async fn insert_withdrawal(&mut self, withdrawal: &Withdrawal) -> Result<(), StoreError> {
        withdrawal_rows::insert(&self.txn, withdrawal).await
    }

    async fn update_withdrawal(&mut self, withdrawal: &Withdrawal) -> Result<(), StoreError> {
        withdrawal_rows::update(&self.txn, withdrawal).await
    }

    async fn append_audit(&mut self, entry: &AuditEntry) -> Result<(), StoreError> {
        transactions::Entity::insert(audit_model(entry))
            .exec_without_returning(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.commit().await.map_err(store_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.rollback().await.map_err(store_error)
    }
}
