//! PIN repository.

use async_trait::async_trait;
use paystore_core::auth::AccountPin;
use paystore_core::ledger::{PinStore, StoreError};
use paystore_shared::types::AccountId;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use super::mapping::pin_model;
use super::{SeaStore, store_error};
use crate::entities::pins;

#[async_trait]
impl PinStore for SeaStore {
    async fn find_pin(&self, account_id: AccountId) -> Result<Option<AccountPin>, StoreError> {
        let model = pins::Entity::find()
            .filter(pins::Column::AccountId.eq(account_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(AccountPin::from))
    }

    async fn upsert_pin(&self, pin: &AccountPin) -> Result<(), StoreError> {
        pins::Entity::insert(pin_model(pin))
            .on_conflict(
                OnConflict::column(pins::Column::AccountId)
                    .update_columns([pins::Column::Hash, pins::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}
