//! Organization repository.

use async_trait::async_trait;
use paystore_core::ledger::{Organization, OrganizationStore, StoreError};
use paystore_shared::types::OrganizationId;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter};

use super::mapping::organization_model;
use super::{SeaStore, store_error};
use crate::entities::organizations;

#[async_trait]
impl OrganizationStore for SeaStore {
    async fn find_organization(&self, id: OrganizationId) -> Result<Option<Organization>, StoreError> {
        let model = organizations::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(Organization::from))
    }

    async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Organization>, StoreError> {
        let model = organizations::Entity::find()
            .filter(organizations::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(Organization::from))
    }

    async fn find_organization_by_name(&self, name: &str) -> Result<Option<Organization>, StoreError> {
        let model = organizations::Entity::find()
            .filter(organizations::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(Organization::from))
    }

    async fn insert_organization(&self, organization: &Organization) -> Result<(), StoreError> {
        organizations::Entity::insert(organization_model(organization))
            .exec_without_returning(&self.db)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn update_organization(&self, organization: &Organization) -> Result<(), StoreError> {
        organization_model(organization)
            .update(&self.db)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}
