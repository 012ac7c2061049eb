/// Custom property definitions and values
///
/// Definitions belong to an organization and target one entity type. A
/// value is keyed by `(entity_id, property)` and inherits its entity type
/// from the definition; there is no foreign key on `entity_id`, so every
/// write resolves the target entity and checks it belongs to the property's
/// organization before anything is stored.

use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use super::validate_name;
use crate::auth::authorization::{authorize, RoleSet};
use crate::auth::chain::{entity_organization, resolve_organization, resolve_property};
use crate::db::transaction::UnitOfWork;
use crate::error::{ServiceError, ServiceResult};
use crate::models::custom_property::{
    CreateCustomProperty, CustomProperty, PropertyEntityType, PropertyType, UpdateCustomProperty,
};
use crate::models::membership::Membership;
use crate::models::property_value::{EntityPropertyValue, PropertyValue};
use crate::properties::{validate_value, PropertyOptions};
use crate::query::sort::CustomPropertySortField;
use crate::query::{Paginated, Pagination, Sort};

pub const MAX_PROPERTY_NAME_LEN: usize = 100;

/// Fields supplied when defining a property
#[derive(Debug, Clone)]
pub struct NewCustomProperty {
    pub name: String,
    pub entity_type: PropertyEntityType,
    pub property_type: PropertyType,
    pub options: PropertyOptions,
}

#[derive(Clone)]
pub struct CustomPropertyService {
    pool: PgPool,
}

impl CustomPropertyService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, data))]
    pub async fn define(
        &self,
        actor: Uuid,
        organization_id: Uuid,
        data: NewCustomProperty,
    ) -> ServiceResult<CustomProperty> {
        resolve_organization(&self.pool, organization_id).await?;
        authorize(&self.pool, actor, organization_id, RoleSet::MANAGERS).await?;
        validate_name("Property name", &data.name, MAX_PROPERTY_NAME_LEN)?;
        let options = data.options.validated_for(data.property_type)?;

        let property = CustomProperty::create(
            &self.pool,
            CreateCustomProperty {
                organization_id,
                name: data.name,
                entity_type: data.entity_type,
                property_type: data.property_type,
                options,
            },
        )
        .await?;

        tracing::debug!(
            property_id = %property.id,
            property_type = %property.property_type,
            "Custom property defined"
        );
        Ok(property)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, actor: Uuid, property_id: Uuid) -> ServiceResult<CustomProperty> {
        let property = resolve_property(&self.pool, property_id).await?;
        authorize(&self.pool, actor, property.organization_id, RoleSet::ANY).await?;
        Ok(property)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        actor: Uuid,
        organization_id: Uuid,
        entity_type: Option<PropertyEntityType>,
        sort: Sort<CustomPropertySortField>,
        pagination: Pagination,
    ) -> ServiceResult<Paginated<CustomProperty>> {
        resolve_organization(&self.pool, organization_id).await?;
        authorize(&self.pool, actor, organization_id, RoleSet::ANY).await?;

        Ok(CustomProperty::list_by_organization(
            &self.pool,
            organization_id,
            entity_type,
            sort,
            pagination,
        )
        .await?)
    }

    /// Renames a property or replaces its options; type and entity type are
    /// fixed at definition
    #[tracing::instrument(skip(self, data))]
    pub async fn update(
        &self,
        actor: Uuid,
        property_id: Uuid,
        data: UpdateCustomProperty,
    ) -> ServiceResult<CustomProperty> {
        let property = resolve_property(&self.pool, property_id).await?;
        authorize(&self.pool, actor, property.organization_id, RoleSet::MANAGERS).await?;

        if let Some(name) = &data.name {
            validate_name("Property name", name, MAX_PROPERTY_NAME_LEN)?;
        }
        let options = data
            .options
            .map(|options| options.validated_for(property.property_type))
            .transpose()?;

        let property = CustomProperty::update(
            &self.pool,
            property_id,
            UpdateCustomProperty {
                name: data.name,
                options,
            },
        )
        .await?
        .ok_or_else(|| ServiceError::not_found("Custom property"))?;

        tracing::debug!(property_id = %property.id, "Custom property updated");
        Ok(property)
    }

    /// Deletes a definition and every value stored for it
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, actor: Uuid, property_id: Uuid) -> ServiceResult<()> {
        let property = resolve_property(&self.pool, property_id).await?;
        authorize(&self.pool, actor, property.organization_id, RoleSet::MANAGERS).await?;

        if !CustomProperty::delete(&self.pool, property_id).await? {
            return Err(ServiceError::not_found("Custom property"));
        }

        tracing::debug!(property_id = %property_id, "Custom property deleted");
        Ok(())
    }

    /// Sets the value of a property on a task or project
    #[tracing::instrument(skip(self, value))]
    pub async fn set_value(
        &self,
        actor: Uuid,
        property_id: Uuid,
        entity_id: Uuid,
        value: JsonValue,
    ) -> ServiceResult<PropertyValue> {
        let property = resolve_property(&self.pool, property_id).await?;
        let entity_org = entity_organization(&self.pool, property.entity_type, entity_id).await?;
        authorize(&self.pool, actor, property.organization_id, RoleSet::WRITERS).await?;

        if entity_org != property.organization_id {
            return Err(ServiceError::invalid(format!(
                "{} does not belong to the property's organization",
                property.entity_type
            )));
        }

        let validated = validate_value(property.property_type, &property.options, value)?;

        let mut uow = UnitOfWork::begin(&self.pool, "set_property_value").await?;
        uow.lock_entity(property.entity_type, entity_id).await?;

        if let Some(user_id) = validated.user_id {
            if !Membership::is_member(uow.conn(), property.organization_id, user_id).await? {
                return Err(ServiceError::invalid(
                    "USER values must reference a member of the organization",
                ));
            }
        }

        let stored = PropertyValue::upsert(
            uow.conn(),
            property.id,
            entity_id,
            property.entity_type,
            validated.value,
        )
        .await?;
        uow.commit().await?;

        tracing::debug!(property_id = %property.id, entity_id = %entity_id, "Property value set");
        Ok(stored)
    }

    /// Removes a value if one is set
    ///
    /// # Returns
    ///
    /// `true` if a value was removed
    #[tracing::instrument(skip(self))]
    pub async fn clear_value(&self, actor: Uuid, property_id: Uuid, entity_id: Uuid) -> ServiceResult<bool> {
        let property = resolve_property(&self.pool, property_id).await?;
        authorize(&self.pool, actor, property.organization_id, RoleSet::WRITERS).await?;

        let removed = PropertyValue::delete(&self.pool, property_id, entity_id).await?;
        tracing::debug!(property_id = %property_id, entity_id = %entity_id, removed, "Property value cleared");
        Ok(removed)
    }

    /// Every value set on one task or project, with its definition
    #[tracing::instrument(skip(self))]
    pub async fn entity_values(
        &self,
        actor: Uuid,
        entity_type: PropertyEntityType,
        entity_id: Uuid,
    ) -> ServiceResult<Vec<EntityPropertyValue>> {
        let organization_id = entity_organization(&self.pool, entity_type, entity_id).await?;
        authorize(&self.pool, actor, organization_id, RoleSet::ANY).await?;

        Ok(PropertyValue::list_for_entity(&self.pool, entity_id, entity_type).await?)
    }
}
