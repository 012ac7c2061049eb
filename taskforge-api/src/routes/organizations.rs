/// Organization endpoints
///
/// - `POST /v1/organizations` - Create; the caller becomes OWNER
/// - `GET /v1/organizations` - Organizations the caller belongs to
/// - `GET /v1/organizations/:org_id`
/// - `PATCH /v1/organizations/:org_id` - OWNER or ADMIN
/// - `DELETE /v1/organizations/:org_id` - OWNER only, cascades

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskforge_shared::auth::middleware::AuthContext;
use taskforge_shared::models::organization::{CreateOrganization, Organization, UpdateOrganization};
use taskforge_shared::query::filter::OrganizationFilter;
use taskforge_shared::query::sort::OrganizationSortField;
use taskforge_shared::query::Paginated;
use uuid::Uuid;
use validator::Validate;

use super::{double_option, list_window, AppJson, AppQuery};
use crate::app::AppState;
use crate::error::ApiResult;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrganizationRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrganizationRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrganizationsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,

    /// Case-insensitive name substring
    pub name: Option<String>,
}

pub async fn create_organization(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<CreateOrganizationRequest>,
) -> ApiResult<(StatusCode, Json<Organization>)> {
    req.validate()?;

    let organization = state
        .services
        .organizations
        .create(
            auth.user_id,
            CreateOrganization {
                name: req.name,
                description: req.description,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(organization)))
}

pub async fn list_organizations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<ListOrganizationsQuery>,
) -> ApiResult<Json<Paginated<Organization>>> {
    let (sort, pagination) = list_window::<OrganizationSortField>(
        query.page,
        query.limit,
        query.sort.as_deref(),
        query.order.as_deref(),
    )?;
    let filter = OrganizationFilter { name: query.name };

    let page = state
        .services
        .organizations
        .list(auth.user_id, &filter, sort, pagination)
        .await?;
    Ok(Json(page))
}

pub async fn get_organization(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
) -> ApiResult<Json<Organization>> {
    Ok(Json(state.services.organizations.get(auth.user_id, org_id).await?))
}

pub async fn update_organization(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
    AppJson(req): AppJson<UpdateOrganizationRequest>,
) -> ApiResult<Json<Organization>> {
    req.validate()?;

    let organization = state
        .services
        .organizations
        .update(
            auth.user_id,
            org_id,
            UpdateOrganization {
                name: req.name,
                description: req.description,
            },
        )
        .await?;
    Ok(Json(organization))
}

pub async fn delete_organization(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.organizations.delete(auth.user_id, org_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
