/// Project endpoints
///
/// - `POST /v1/organizations/:org_id/projects` - writers
/// - `GET /v1/organizations/:org_id/projects` - `?name=&created_by=&page=&limit=&sort=&order=`
/// - `GET /v1/projects/:project_id`
/// - `PATCH /v1/projects/:project_id` - writers
/// - `DELETE /v1/projects/:project_id` - managers or the creator

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskforge_shared::auth::middleware::AuthContext;
use taskforge_shared::models::project::{Project, UpdateProject};
use taskforge_shared::query::filter::ProjectFilter;
use taskforge_shared::query::sort::ProjectSortField;
use taskforge_shared::query::Paginated;
use taskforge_shared::services::projects::NewProject;
use uuid::Uuid;
use validator::Validate;

use super::{double_option, list_window, AppJson, AppQuery};
use crate::app::AppState;
use crate::error::ApiResult;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListProjectsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub name: Option<String>,
    pub created_by: Option<Uuid>,
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
    AppJson(req): AppJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    req.validate()?;

    let project = state
        .services
        .projects
        .create(
            auth.user_id,
            org_id,
            NewProject {
                name: req.name,
                description: req.description,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
    AppQuery(query): AppQuery<ListProjectsQuery>,
) -> ApiResult<Json<Paginated<Project>>> {
    let (sort, pagination) = list_window::<ProjectSortField>(
        query.page,
        query.limit,
        query.sort.as_deref(),
        query.order.as_deref(),
    )?;
    let filter = ProjectFilter {
        name: query.name,
        created_by: query.created_by,
    };

    let page = state
        .services
        .projects
        .list(auth.user_id, org_id, &filter, sort, pagination)
        .await?;
    Ok(Json(page))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.services.projects.get(auth.user_id, project_id).await?))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    AppJson(req): AppJson<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    req.validate()?;

    let project = state
        .services
        .projects
        .update(
            auth.user_id,
            project_id,
            UpdateProject {
                name: req.name,
                description: req.description,
            },
        )
        .await?;
    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.projects.delete(auth.user_id, project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
