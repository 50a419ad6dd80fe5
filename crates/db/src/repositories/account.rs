//! Account repository (non-locking access).

use async_trait::async_trait;
use paystore_core::ledger::{AccountStore, LedgerAccount, StoreError};
use paystore_shared::types::{AccountId, OrganizationId};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use super::mapping::account_model;
use super::{SeaStore, store_error};
use crate::entities::accounts;

#[async_trait]
impl AccountStore for SeaStore {
    async fn find_account(&self, id: AccountId) -> Result<Option<LedgerAccount>, StoreError> {
        let model = accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(LedgerAccount::from))
    }

    async fn find_account_by_external_id(
        &self,
        organization_id: OrganizationId,
        external_id: &str,
    ) -> Result<Option<LedgerAccount>, StoreError> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::OrganizationId.eq(organization_id.into_inner()))
            .filter(accounts::Column::ExternalId.eq(external_id))
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(LedgerAccount::from))
    }

    async fn insert_account(&self, account: &LedgerAccount) -> Result<(), StoreError> {
        accounts::Entity::insert(account_model(account))
            .exec_without_returning(&self.db)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}
