/// Comment endpoints
///
/// - `POST /v1/tasks/:task_id/comments` - writers; `@[username]` mentions
///   members of the task's organization
/// - `GET /v1/tasks/:task_id/comments`
/// - `PATCH /v1/comments/:comment_id` - author only, regenerates mentions
/// - `DELETE /v1/comments/:comment_id` - author or managers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskforge_shared::auth::middleware::AuthContext;
use taskforge_shared::models::comment::CommentWithMentions;
use taskforge_shared::query::sort::CommentSortField;
use taskforge_shared::query::Paginated;
use uuid::Uuid;
use validator::Validate;

use super::{AppJson, AppQuery, ListParams};
use crate::app::AppState;
use crate::error::ApiResult;

#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 10000, message = "Content must be 1-10000 characters"))]
    pub content: String,
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    AppJson(req): AppJson<CommentRequest>,
) -> ApiResult<(StatusCode, Json<CommentWithMentions>)> {
    req.validate()?;

    let comment = state
        .services
        .comments
        .create(auth.user_id, task_id, &req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    AppQuery(params): AppQuery<ListParams>,
) -> ApiResult<Json<Paginated<CommentWithMentions>>> {
    let (sort, pagination) = params.window::<CommentSortField>()?;
    let page = state
        .services
        .comments
        .list(auth.user_id, task_id, sort, pagination)
        .await?;
    Ok(Json(page))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(comment_id): Path<Uuid>,
    AppJson(req): AppJson<CommentRequest>,
) -> ApiResult<Json<CommentWithMentions>> {
    req.validate()?;

    let comment = state
        .services
        .comments
        .update(auth.user_id, comment_id, &req.content)
        .await?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(comment_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.comments.delete(auth.user_id, comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
