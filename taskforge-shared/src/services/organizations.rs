/// Organization operations
///
/// Creating an organization makes its creator the sole OWNER in the same
/// transaction. Deleting one removes everything it owns, children first:
///
/// ```text
/// property values → tasks → projects → custom properties → memberships → organization
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use super::validate_name;
use crate::auth::authorization::{authorize, RoleSet};
use crate::auth::chain::resolve_organization;
use crate::db::transaction::UnitOfWork;
use crate::error::{ServiceError, ServiceResult};
use crate::models::custom_property::CustomProperty;
use crate::models::membership::{MemberRole, Membership};
use crate::models::organization::{slugify, CreateOrganization, Organization, UpdateOrganization};
use crate::models::project::Project;
use crate::models::property_value::PropertyValue;
use crate::models::task::Task;
use crate::query::filter::OrganizationFilter;
use crate::query::sort::OrganizationSortField;
use crate::query::{Paginated, Pagination, Sort};

pub const MAX_ORGANIZATION_NAME_LEN: usize = 100;

#[derive(Clone)]
pub struct OrganizationService {
    pool: PgPool,
}

/// Validates a proposed organization name, which must also yield a slug
fn validate_organization_name(name: &str) -> ServiceResult<()> {
    validate_name("Organization name", name, MAX_ORGANIZATION_NAME_LEN)?;
    if slugify(name).is_empty() {
        return Err(ServiceError::invalid(
            "Organization name must contain at least one letter or digit",
        ));
    }
    Ok(())
}

impl OrganizationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates an organization owned by `actor`
    #[tracing::instrument(skip(self, data))]
    pub async fn create(&self, actor: Uuid, data: CreateOrganization) -> ServiceResult<Organization> {
        validate_organization_name(&data.name)?;

        let mut uow = UnitOfWork::begin(&self.pool, "create_organization").await?;
        let organization = Organization::create(uow.conn(), data).await?;
        Membership::create(uow.conn(), organization.id, actor, MemberRole::Owner).await?;
        uow.commit().await?;

        tracing::debug!(organization_id = %organization.id, slug = %organization.slug, "Organization created");
        Ok(organization)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, actor: Uuid, organization_id: Uuid) -> ServiceResult<Organization> {
        let organization = resolve_organization(&self.pool, organization_id).await?;
        authorize(&self.pool, actor, organization_id, RoleSet::ANY).await?;
        Ok(organization)
    }

    /// Organizations `actor` belongs to
    #[tracing::instrument(skip(self, filter))]
    pub async fn list(
        &self,
        actor: Uuid,
        filter: &OrganizationFilter,
        sort: Sort<OrganizationSortField>,
        pagination: Pagination,
    ) -> ServiceResult<Paginated<Organization>> {
        Ok(Organization::list_for_user(&self.pool, actor, filter, sort, pagination).await?)
    }

    #[tracing::instrument(skip(self, data))]
    pub async fn update(
        &self,
        actor: Uuid,
        organization_id: Uuid,
        data: UpdateOrganization,
    ) -> ServiceResult<Organization> {
        resolve_organization(&self.pool, organization_id).await?;
        authorize(&self.pool, actor, organization_id, RoleSet::MANAGERS).await?;

        if let Some(name) = &data.name {
            validate_organization_name(name)?;
        }

        let organization = Organization::update(&self.pool, organization_id, data)
            .await?
            .ok_or_else(|| ServiceError::not_found("Organization"))?;

        tracing::debug!(organization_id = %organization.id, "Organization updated");
        Ok(organization)
    }

    /// Deletes the organization and everything it owns
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, actor: Uuid, organization_id: Uuid) -> ServiceResult<()> {
        let mut uow = UnitOfWork::begin(&self.pool, "delete_organization").await?;
        uow.lock_organization(organization_id).await?;
        authorize(uow.conn(), actor, organization_id, RoleSet::OWNERS).await?;

        let values = PropertyValue::delete_for_organization(uow.conn(), organization_id).await?;
        let tasks = Task::delete_by_organization(uow.conn(), organization_id).await?;
        let projects = Project::delete_by_organization(uow.conn(), organization_id).await?;
        let properties = CustomProperty::delete_by_organization(uow.conn(), organization_id).await?;
        let members = Membership::delete_by_organization(uow.conn(), organization_id).await?;
        Organization::delete(uow.conn(), organization_id).await?;
        uow.commit().await?;

        tracing::debug!(
            organization_id = %organization_id,
            values,
            tasks,
            projects,
            properties,
            members,
            "Organization deleted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organization_name_rules() {
        assert!(validate_organization_name("Acme").is_ok());
        assert!(validate_organization_name("  ").is_err());
        assert!(validate_organization_name("!!!").is_err());
        assert!(validate_organization_name(&"a".repeat(MAX_ORGANIZATION_NAME_LEN + 1)).is_err());
    }
}
