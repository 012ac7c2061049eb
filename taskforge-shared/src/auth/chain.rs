/// Ownership chain resolution
///
/// Maps a target entity to the organization that owns it by walking its
/// parents one lookup at a time:
///
/// ```text
/// comment → task → project → organization
/// custom property → organization
/// property value target (task | project) → … → organization
/// ```
///
/// Each hop fails closed: a missing link is `NotFound` naming that link, and
/// resolution stops there. Membership is checked only after the chain
/// resolves, so a non-member learns that an id exists but nothing else.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::models::comment::Comment;
use crate::models::custom_property::{CustomProperty, PropertyEntityType};
use crate::models::organization::Organization;
use crate::models::project::Project;
use crate::models::task::Task;

/// Loads an organization, the end of every chain
pub async fn resolve_organization(pool: &PgPool, organization_id: Uuid) -> ServiceResult<Organization> {
    Organization::find_by_id(pool, organization_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Organization"))
}

/// Organization of a project
pub async fn project_organization(pool: &PgPool, project_id: Uuid) -> ServiceResult<Uuid> {
    Project::organization_id(pool, project_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Project"))
}

/// Loads a project, whose `organization_id` ends the chain
pub async fn resolve_project(pool: &PgPool, project_id: Uuid) -> ServiceResult<Project> {
    Project::find_by_id(pool, project_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Project"))
}

/// Loads a task and resolves its organization through the project
pub async fn resolve_task(pool: &PgPool, task_id: Uuid) -> ServiceResult<(Task, Uuid)> {
    let task = Task::find_by_id(pool, task_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Task"))?;
    let organization_id = project_organization(pool, task.project_id).await?;

    Ok((task, organization_id))
}

/// Loads a comment and resolves its organization through task and project
pub async fn resolve_comment(pool: &PgPool, comment_id: Uuid) -> ServiceResult<(Comment, Uuid)> {
    let comment = Comment::find_by_id(pool, comment_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Comment"))?;
    let (_, organization_id) = resolve_task(pool, comment.task_id).await?;

    Ok((comment, organization_id))
}

pub async fn resolve_property(pool: &PgPool, property_id: Uuid) -> ServiceResult<CustomProperty> {
    CustomProperty::find_by_id(pool, property_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Custom property"))
}

/// Organization of a task or project referenced by a property value
pub async fn entity_organization(
    pool: &PgPool,
    entity_type: PropertyEntityType,
    entity_id: Uuid,
) -> ServiceResult<Uuid> {
    match entity_type {
        PropertyEntityType::Task => resolve_task(pool, entity_id).await.map(|(_, org)| org),
        PropertyEntityType::Project => project_organization(pool, entity_id).await,
    }
}
