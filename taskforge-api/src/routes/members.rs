/// Membership endpoints
///
/// - `GET /v1/organizations/:org_id/members`
/// - `POST /v1/organizations/:org_id/members` - `{ "user_id", "role" }`
/// - `PATCH /v1/organizations/:org_id/members/:user_id` - `{ "role" }`
/// - `DELETE /v1/organizations/:org_id/members/:user_id` - remove or leave
///
/// Granting, changing or revoking OWNER requires OWNER; the last OWNER can
/// neither be demoted nor removed (409).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskforge_shared::auth::middleware::AuthContext;
use taskforge_shared::models::membership::{MemberRole, MemberWithUser, Membership};
use taskforge_shared::query::sort::MemberSortField;
use taskforge_shared::query::Paginated;
use uuid::Uuid;

use super::{AppJson, AppQuery, ListParams};
use crate::app::AppState;
use crate::error::ApiResult;

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,

    #[serde(default = "default_role")]
    pub role: MemberRole,
}

fn default_role() -> MemberRole {
    MemberRole::Member
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: MemberRole,
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
    AppQuery(params): AppQuery<ListParams>,
) -> ApiResult<Json<Paginated<MemberWithUser>>> {
    let (sort, pagination) = params.window::<MemberSortField>()?;
    let page = state
        .services
        .members
        .list(auth.user_id, org_id, sort, pagination)
        .await?;
    Ok(Json(page))
}

pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
    AppJson(req): AppJson<AddMemberRequest>,
) -> ApiResult<(StatusCode, Json<Membership>)> {
    let membership = state
        .services
        .members
        .add(auth.user_id, org_id, req.user_id, req.role)
        .await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

pub async fn change_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
    AppJson(req): AppJson<ChangeRoleRequest>,
) -> ApiResult<Json<Membership>> {
    let membership = state
        .services
        .members
        .change_role(auth.user_id, org_id, user_id, req.role)
        .await?;
    Ok(Json(membership))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state
        .services
        .members
        .remove(auth.user_id, org_id, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
