/// Project operations
///
/// Projects hang off one organization. Deleting one locks it together with
/// its tasks before clearing their property values, since values carry no
/// foreign key to the rows they describe.

use sqlx::PgPool;
use uuid::Uuid;

use super::validate_name;
use crate::auth::authorization::{authorize, can_delete_created, RoleSet};
use crate::auth::chain::{resolve_organization, resolve_project};
use crate::db::transaction::UnitOfWork;
use crate::error::{ServiceError, ServiceResult};
use crate::models::custom_property::PropertyEntityType;
use crate::models::project::{CreateProject, Project, UpdateProject};
use crate::models::property_value::PropertyValue;
use crate::query::filter::ProjectFilter;
use crate::query::sort::ProjectSortField;
use crate::query::{Paginated, Pagination, Sort};

pub const MAX_PROJECT_NAME_LEN: usize = 255;

/// Fields supplied when creating a project
#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct ProjectService {
    pool: PgPool,
}

impl ProjectService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, data))]
    pub async fn create(
        &self,
        actor: Uuid,
        organization_id: Uuid,
        data: NewProject,
    ) -> ServiceResult<Project> {
        resolve_organization(&self.pool, organization_id).await?;
        authorize(&self.pool, actor, organization_id, RoleSet::WRITERS).await?;
        validate_name("Project name", &data.name, MAX_PROJECT_NAME_LEN)?;

        let project = Project::create(
            &self.pool,
            CreateProject {
                organization_id,
                name: data.name,
                description: data.description,
                created_by: actor,
            },
        )
        .await?;

        tracing::debug!(project_id = %project.id, "Project created");
        Ok(project)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, actor: Uuid, project_id: Uuid) -> ServiceResult<Project> {
        let project = resolve_project(&self.pool, project_id).await?;
        authorize(&self.pool, actor, project.organization_id, RoleSet::ANY).await?;
        Ok(project)
    }

    #[tracing::instrument(skip(self, filter))]
    pub async fn list(
        &self,
        actor: Uuid,
        organization_id: Uuid,
        filter: &ProjectFilter,
        sort: Sort<ProjectSortField>,
        pagination: Pagination,
    ) -> ServiceResult<Paginated<Project>> {
        resolve_organization(&self.pool, organization_id).await?;
        authorize(&self.pool, actor, organization_id, RoleSet::ANY).await?;

        Ok(Project::list_by_organization(&self.pool, organization_id, filter, sort, pagination).await?)
    }

    #[tracing::instrument(skip(self, data))]
    pub async fn update(
        &self,
        actor: Uuid,
        project_id: Uuid,
        data: UpdateProject,
    ) -> ServiceResult<Project> {
        let project = resolve_project(&self.pool, project_id).await?;
        authorize(&self.pool, actor, project.organization_id, RoleSet::WRITERS).await?;

        if let Some(name) = &data.name {
            validate_name("Project name", name, MAX_PROJECT_NAME_LEN)?;
        }

        let project = Project::update(&self.pool, project_id, data)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))?;

        tracing::debug!(project_id = %project.id, "Project updated");
        Ok(project)
    }

    /// Deletes a project with its tasks, their comments, and every property
    /// value attached to the project or its tasks
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, actor: Uuid, project_id: Uuid) -> ServiceResult<()> {
        let project = resolve_project(&self.pool, project_id).await?;
        let membership = authorize(&self.pool, actor, project.organization_id, RoleSet::ANY).await?;

        if !can_delete_created(&membership, project.created_by) {
            tracing::warn!(actor = %actor, project_id = %project_id, "Denied: project delete");
            return Err(ServiceError::forbidden(
                "Only managers or the project's creator can delete it",
            ));
        }

        let mut uow = UnitOfWork::begin(&self.pool, "delete_project").await?;
        uow.lock_project_tree(project_id).await?;
        let task_values = PropertyValue::delete_for_project_tasks(uow.conn(), project_id).await?;
        let project_values =
            PropertyValue::delete_for_entity(uow.conn(), project_id, PropertyEntityType::Project)
                .await?;
        if !Project::delete(uow.conn(), project_id).await? {
            return Err(ServiceError::not_found("Project"));
        }
        uow.commit().await?;

        tracing::debug!(project_id = %project_id, task_values, project_values, "Project deleted");
        Ok(())
    }
}
