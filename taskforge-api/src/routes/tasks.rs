/// Task endpoints
///
/// - `POST /v1/projects/:project_id/tasks` - writers
/// - `GET /v1/projects/:project_id/tasks` - filters: `status`, `priority`,
///   `assignee` (comma-separated), `due_from`, `due_to` (RFC 3339), `search`
/// - `GET /v1/projects/:project_id/tasks/stats`
/// - `GET|PATCH|DELETE /v1/tasks/:task_id`
/// - `PATCH /v1/tasks/:task_id/status` - `{ "status": "DONE" }`
/// - `PATCH /v1/tasks/:task_id/assignee` - `{ "assignee_id": null }` unassigns

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use taskforge_shared::auth::middleware::AuthContext;
use taskforge_shared::models::task::{Task, TaskPriority, TaskStats, TaskStatus};
use taskforge_shared::query::filter::TaskFilter;
use taskforge_shared::query::sort::TaskSortField;
use taskforge_shared::query::Paginated;
use taskforge_shared::services::tasks::{NewTask, TaskChanges};
use uuid::Uuid;
use validator::Validate;

use super::{double_option, list_window, parse_csv, AppJson, AppQuery};
use crate::app::AppState;
use crate::error::ApiResult;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    pub description: Option<String>,

    /// Defaults to TODO
    pub status: Option<TaskStatus>,

    /// Defaults to MEDIUM
    pub priority: Option<TaskPriority>,

    pub assignee_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,

    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<Uuid>>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl From<UpdateTaskRequest> for TaskChanges {
    fn from(req: UpdateTaskRequest) -> Self {
        TaskChanges {
            title: req.title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            assignee_id: req.assignee_id,
            due_date: req.due_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Deserialize)]
pub struct SetAssigneeRequest {
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_to: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

impl ListTasksQuery {
    fn filter(&self) -> ApiResult<TaskFilter> {
        Ok(TaskFilter {
            statuses: parse_csv("status", self.status.as_deref())?,
            priorities: parse_csv("priority", self.priority.as_deref())?,
            assignee_ids: parse_csv("assignee", self.assignee.as_deref())?,
            due_from: self.due_from,
            due_to: self.due_to,
            search: self.search.clone(),
        })
    }
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    AppJson(req): AppJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let task = state
        .services
        .tasks
        .create(
            auth.user_id,
            project_id,
            NewTask {
                title: req.title,
                description: req.description,
                status: req.status.unwrap_or_default(),
                priority: req.priority.unwrap_or_default(),
                assignee_id: req.assignee_id,
                due_date: req.due_date,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    AppQuery(query): AppQuery<ListTasksQuery>,
) -> ApiResult<Json<Paginated<Task>>> {
    let (sort, pagination) = list_window::<TaskSortField>(
        query.page,
        query.limit,
        query.sort.as_deref(),
        query.order.as_deref(),
    )?;
    let filter = query.filter()?;

    let page = state
        .services
        .tasks
        .list(auth.user_id, project_id, &filter, sort, pagination)
        .await?;
    Ok(Json(page))
}

pub async fn task_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<TaskStats>> {
    Ok(Json(state.services.tasks.stats(auth.user_id, project_id).await?))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.services.tasks.get(auth.user_id, task_id).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    AppJson(req): AppJson<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    let task = state
        .services
        .tasks
        .update(auth.user_id, task_id, req.into())
        .await?;
    Ok(Json(task))
}

pub async fn set_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    AppJson(req): AppJson<SetStatusRequest>,
) -> ApiResult<Json<Task>> {
    let task = state
        .services
        .tasks
        .set_status(auth.user_id, task_id, req.status)
        .await?;
    Ok(Json(task))
}

pub async fn set_assignee(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    AppJson(req): AppJson<SetAssigneeRequest>,
) -> ApiResult<Json<Task>> {
    let task = state
        .services
        .tasks
        .set_assignee(auth.user_id, task_id, req.assignee_id)
        .await?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.tasks.delete(auth.user_id, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builds_filter() {
        let assignee = Uuid::new_v4();
        let query = ListTasksQuery {
            status: Some("todo,in_progress".to_string()),
            priority: Some("URGENT".to_string()),
            assignee: Some(assignee.to_string()),
            search: Some("bug".to_string()),
            ..ListTasksQuery::default()
        };

        let filter = query.filter().unwrap();
        assert_eq!(filter.statuses, vec![TaskStatus::Todo, TaskStatus::InProgress]);
        assert_eq!(filter.priorities, vec![TaskPriority::Urgent]);
        assert_eq!(filter.assignee_ids, vec![assignee]);
        assert_eq!(filter.search.as_deref(), Some("bug"));
    }

    #[test]
    fn test_unknown_status_rejected() {
        let query = ListTasksQuery {
            status: Some("someday".to_string()),
            ..ListTasksQuery::default()
        };
        assert!(query.filter().is_err());
    }

    #[test]
    fn test_patch_body_distinguishes_null() {
        let req: UpdateTaskRequest =
            serde_json::from_str(r#"{"assignee_id": null, "priority": "HIGH"}"#).unwrap();
        let changes: TaskChanges = req.into();
        assert_eq!(changes.assignee_id, Some(None));
        assert_eq!(changes.priority, Some(TaskPriority::High));
        assert_eq!(changes.due_date, None);
        assert_eq!(changes.title, None);
    }
}
