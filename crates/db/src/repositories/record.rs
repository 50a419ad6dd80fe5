//! Payment and withdrawal rows.
//!
//! Both tables have the same shape, so their queries are generated once per
//! table. Every query takes a generic connection so it runs both on the pool
//! and inside a [`SeaLedgerTx`](super::SeaLedgerTx).

use async_trait::async_trait;
use paystore_core::ledger::{HistoryScope, Payment, RecordStore, StoreError, Withdrawal};
use paystore_shared::types::{AccountId, RecordId};

use super::SeaStore;

macro_rules! record_rows {
    ($rows:ident, $table:ident, $record:ty) => {
        pub(crate) mod $rows {
            use paystore_core::ledger::{HistoryScope, LedgerRecord, StoreError};
            use paystore_shared::types::{AccountId, OrganizationId, RecordId};
            use sea_orm::ActiveValue::Set;
            use sea_orm::{
                ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
                QueryFilter, QueryOrder, QuerySelect,
            };

            use crate::entities::$table;
            use crate::repositories::mapping::{fixed, utc};
            use crate::repositories::store_error;

            fn to_domain(model: $table::Model) -> $record {
                LedgerRecord {
                    id: RecordId::from_uuid(model.id),
                    rand_id: model.rand_id,
                    account_id: AccountId::from_uuid(model.account_id),
                    organization_id: OrganizationId::from_uuid(model.organization_id),
                    amount: model.amount,
                    fees: model.fees,
                    balance_before: model.balance_before,
                    balance_after: model.balance_after,
                    vendor_record_id: model.vendor_record_id,
                    status: model.status.into(),
                    previous_hash: model.previous_hash,
                    hash: model.hash,
                    created_at: utc(model.created_at),
                    updated_at: utc(model.updated_at),
                }
            }

            fn to_active(record: &$record) -> $table::ActiveModel {
                $table::ActiveModel {
                    id: Set(record.id.into_inner()),
                    rand_id: Set(record.rand_id.clone()),
                    account_id: Set(record.account_id.into_inner()),
                    organization_id: Set(record.organization_id.into_inner()),
                    amount: Set(record.amount),
                    fees: Set(record.fees),
                    balance_before: Set(record.balance_before),
                    balance_after: Set(record.balance_after),
                    vendor_record_id: Set(record.vendor_record_id.clone()),
                    status: Set(record.status.into()),
                    previous_hash: Set(record.previous_hash.clone()),
                    hash: Set(record.hash.clone()),
                    created_at: Set(fixed(record.created_at)),
                    updated_at: Set(fixed(record.updated_at)),
                }
            }

            pub(crate) async fn find<C: ConnectionTrait>(
                db: &C,
                id: RecordId,
            ) -> Result<Option<$record>, StoreError> {
                let model = $table::Entity::find_by_id(id.into_inner())
                    .one(db)
                    .await
                    .map_err(store_error)?;
                Ok(model.map(to_domain))
            }

            /// Newest record of an account.
            pub(crate) async fn latest<C: ConnectionTrait>(
                db: &C,
                account_id: AccountId,
            ) -> Result<Option<$record>, StoreError> {
                let model = $table::Entity::find()
                    .filter($table::Column::AccountId.eq(account_id.into_inner()))
                    .order_by_desc($table::Column::CreatedAt)
                    .order_by_desc($table::Column::Id)
                    .one(db)
                    .await
                    .map_err(store_error)?;
                Ok(model.map(to_domain))
            }

            /// Newest-first page strictly older than the `cursor` record.
            pub(crate) async fn page<C: ConnectionTrait>(
                db: &C,
                scope: &HistoryScope,
                cursor: Option<&str>,
                limit: u64,
            ) -> Result<Vec<$record>, StoreError> {
                let mut query = match *scope {
                    HistoryScope::Organization { organization_id } => $table::Entity::find()
                        .filter($table::Column::OrganizationId.eq(organization_id.into_inner())),
                    HistoryScope::Account {
                        organization_id,
                        account_id,
                    } => $table::Entity::find()
                        .filter($table::Column::OrganizationId.eq(organization_id.into_inner()))
                        .filter($table::Column::AccountId.eq(account_id.into_inner())),
                };

                if let Some(cursor) = cursor {
                    let anchor = query
                        .clone()
                        .filter($table::Column::RandId.eq(cursor))
                        .one(db)
                        .await
                        .map_err(store_error)?;
                    let Some(anchor) = anchor else {
                        return Ok(Vec::new());
                    };
                    query = query.filter(
                        Condition::any()
                            .add($table::Column::CreatedAt.lt(anchor.created_at))
                            .add(
                                Condition::all()
                                    .add($table::Column::CreatedAt.eq(anchor.created_at))
                                    .add($table::Column::Id.lt(anchor.id)),
                            ),
                    );
                }

                let models = query
                    .order_by_desc($table::Column::CreatedAt)
                    .order_by_desc($table::Column::Id)
                    .limit(limit)
                    .all(db)
                    .await
                    .map_err(store_error)?;
                Ok(models.into_iter().map(to_domain).collect())
            }

            /// Every record of an account, oldest first.
            pub(crate) async fn chain<C: ConnectionTrait>(
                db: &C,
                account_id: AccountId,
            ) -> Result<Vec<$record>, StoreError> {
                let models = $table::Entity::find()
                    .filter($table::Column::AccountId.eq(account_id.into_inner()))
                    .order_by_asc($table::Column::CreatedAt)
                    .order_by_asc($table::Column::Id)
                    .all(db)
                    .await
                    .map_err(store_error)?;
                Ok(models.into_iter().map(to_domain).collect())
            }

            pub(crate) async fn insert<C: ConnectionTrait>(
                db: &C,
                record: &$record,
            ) -> Result<(), StoreError> {
                $table::Entity::insert(to_active(record))
                    .exec_without_returning(db)
                    .await
                    .map_err(store_error)?;
                Ok(())
            }

            /// Persists the terminal transition: status, hash, and update time.
            pub(crate) async fn update<C: ConnectionTrait>(
                db: &C,
                record: &$record,
            ) -> Result<(), StoreError> {
                $table::ActiveModel {
                    id: Set(record.id.into_inner()),
                    status: Set(record.status.into()),
                    hash: Set(record.hash.clone()),
                    updated_at: Set(fixed(record.updated_at)),
                    ..Default::default()
                }
                .update(db)
                .await
                .map_err(store_error)?;
                Ok(())
            }
        }
    };
}

record_rows!(payment_rows, payments, paystore_core::ledger::Payment);
record_rows!(withdrawal_rows, withdrawals, paystore_core::ledger::Withdrawal);

#[async_trait]
impl RecordStore for SeaStore {
    async fn find_payment(&self, id: RecordId) -> Result<Option<Payment>, StoreError> {
        payment_rows::find(&self.db, id).await
    }

    async fn find_withdrawal(&self, id: RecordId) -> Result<Option<Withdrawal>, StoreError> {
        withdrawal_rows::find(&self.db, id).await
    }

    async fn payments_page(
        &self,
        scope: &HistoryScope,
        cursor: Option<&str>,
        limit: u64,
    ) -> Result<Vec<Payment>, StoreError> {
        payment_rows::page(&self.db, scope, cursor, limit).await
    }

    async fn withdrawals_page(
        &self,
        scope: &HistoryScope,
        cursor: Option<&str>,
        limit: u64,
    ) -> Result<Vec<Withdrawal>, StoreError> {
        withdrawal_rows::page(&self.db, scope, cursor, limit).await
    }

    async fn payment_chain(&self, account_id: AccountId) -> Result<Vec<Payment>, StoreError> {
        payment_rows::chain(&self.db, account_id).await
    }

    async fn withdrawal_chain(&self, account_id: AccountId) -> Result<Vec<Withdrawal>, StoreError> {
        withdrawal_rows::chain(&self.db, account_id).await
    }
}
