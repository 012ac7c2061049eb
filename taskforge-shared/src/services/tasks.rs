/// Task operations
///
/// Every write that can touch `status` goes through [`TaskChanges::apply`]
/// on a row locked with `SELECT ... FOR UPDATE`, so the completion
/// timestamp is always recomputed from the status actually stored.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::validate_name;
use crate::auth::authorization::{authorize, can_delete_created, RoleSet};
use crate::auth::chain::{project_organization, resolve_task};
use crate::db::transaction::UnitOfWork;
use crate::error::{ServiceError, ServiceResult};
use crate::models::custom_property::PropertyEntityType;
use crate::models::membership::Membership;
use crate::models::property_value::PropertyValue;
use crate::models::task::{CreateTask, Task, TaskPriority, TaskStats, TaskStatus};
use crate::query::filter::TaskFilter;
use crate::query::sort::TaskSortField;
use crate::query::{Paginated, Pagination, Sort};

pub const MAX_TITLE_LEN: usize = 255;

/// Fields supplied when creating a task
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial task update; `Some(None)` clears a nullable field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Option<Uuid>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl TaskChanges {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn assignee(assignee_id: Option<Uuid>) -> Self {
        Self {
            assignee_id: Some(assignee_id),
            ..Self::default()
        }
    }

    /// Assignee being set, if this change sets one
    fn new_assignee(&self) -> Option<Uuid> {
        self.assignee_id.flatten()
    }

    /// Applies the changes to `task`, recomputing `completed_at`
    pub fn apply(self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(assignee_id) = self.assignee_id {
            task.assignee_id = assignee_id;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(status) = self.status {
            task.completed_at =
                TaskStatus::completed_at_after(task.status, status, task.completed_at, now);
            task.status = status;
        }
    }
}

#[derive(Clone)]
pub struct TaskService {
    pool: PgPool,
}

/// Rejects assignees outside the task's organization
async fn ensure_assignable<'e, E>(
    executor: E,
    organization_id: Uuid,
    assignee_id: Uuid,
) -> ServiceResult<()>
where
    E: PgExecutor<'e>,
{
    if Membership::is_member(executor, organization_id, assignee_id).await? {
        Ok(())
    } else {
        Err(ServiceError::invalid(
            "Assignee must be a member of the task's organization",
        ))
    }
}

impl TaskService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, data))]
    pub async fn create(&self, actor: Uuid, project_id: Uuid, data: NewTask) -> ServiceResult<Task> {
        let organization_id = project_organization(&self.pool, project_id).await?;
        authorize(&self.pool, actor, organization_id, RoleSet::WRITERS).await?;
        validate_name("Task title", &data.title, MAX_TITLE_LEN)?;

        if let Some(assignee_id) = data.assignee_id {
            ensure_assignable(&self.pool, organization_id, assignee_id).await?;
        }

        let task = Task::create(
            &self.pool,
            CreateTask {
                project_id,
                title: data.title,
                description: data.description,
                status: data.status,
                priority: data.priority,
                assignee_id: data.assignee_id,
                due_date: data.due_date,
                created_by: actor,
            },
        )
        .await?;

        tracing::debug!(task_id = %task.id, status = %task.status, "Task created");
        Ok(task)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, actor: Uuid, task_id: Uuid) -> ServiceResult<Task> {
        let (task, organization_id) = resolve_task(&self.pool, task_id).await?;
        authorize(&self.pool, actor, organization_id, RoleSet::ANY).await?;
        Ok(task)
    }

    #[tracing::instrument(skip(self, filter))]
    pub async fn list(
        &self,
        actor: Uuid,
        project_id: Uuid,
        filter: &TaskFilter,
        sort: Sort<TaskSortField>,
        pagination: Pagination,
    ) -> ServiceResult<Paginated<Task>> {
        let organization_id = project_organization(&self.pool, project_id).await?;
        authorize(&self.pool, actor, organization_id, RoleSet::ANY).await?;
        filter.validate()?;

        Ok(Task::list_by_project(&self.pool, project_id, filter, sort, pagination).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn stats(&self, actor: Uuid, project_id: Uuid) -> ServiceResult<TaskStats> {
        let organization_id = project_organization(&self.pool, project_id).await?;
        authorize(&self.pool, actor, organization_id, RoleSet::ANY).await?;

        Ok(Task::stats_for_project(&self.pool, project_id).await?)
    }

    /// Applies a partial update under a row lock
    #[tracing::instrument(skip(self, changes))]
    pub async fn update(&self, actor: Uuid, task_id: Uuid, changes: TaskChanges) -> ServiceResult<Task> {
        let (_, organization_id) = resolve_task(&self.pool, task_id).await?;
        authorize(&self.pool, actor, organization_id, RoleSet::WRITERS).await?;

        if let Some(title) = &changes.title {
            validate_name("Task title", title, MAX_TITLE_LEN)?;
        }

        let mut uow = UnitOfWork::begin(&self.pool, "update_task").await?;
        let mut task = Task::find_for_update(uow.conn(), task_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Task"))?;

        if let Some(assignee_id) = changes.new_assignee() {
            ensure_assignable(uow.conn(), organization_id, assignee_id).await?;
        }

        let previous = task.status;
        changes.apply(&mut task, Utc::now());
        let task = Task::save(uow.conn(), &task).await?;
        uow.commit().await?;

        tracing::debug!(task_id = %task.id, from = %previous, to = %task.status, "Task updated");
        Ok(task)
    }

    /// Moves a task to `status`
    pub async fn set_status(&self, actor: Uuid, task_id: Uuid, status: TaskStatus) -> ServiceResult<Task> {
        self.update(actor, task_id, TaskChanges::status(status)).await
    }

    /// Assigns the task, or unassigns it with `None`
    pub async fn set_assignee(
        &self,
        actor: Uuid,
        task_id: Uuid,
        assignee_id: Option<Uuid>,
    ) -> ServiceResult<Task> {
        self.update(actor, task_id, TaskChanges::assignee(assignee_id)).await
    }

    /// Deletes a task, its comments and its property values
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, actor: Uuid, task_id: Uuid) -> ServiceResult<()> {
        let (task, organization_id) = resolve_task(&self.pool, task_id).await?;
        let membership = authorize(&self.pool, actor, organization_id, RoleSet::ANY).await?;

        if !can_delete_created(&membership, task.created_by) {
            tracing::warn!(actor = %actor, task_id = %task_id, "Denied: task delete");
            return Err(ServiceError::forbidden(
                "Only managers or the task's creator can delete it",
            ));
        }

        let mut uow = UnitOfWork::begin(&self.pool, "delete_task").await?;
        // Row first: waits out value writes holding a share lock on it
        if !Task::delete(uow.conn(), task_id).await? {
            return Err(ServiceError::not_found("Task"));
        }
        PropertyValue::delete_for_entity(uow.conn(), task_id, PropertyEntityType::Task).await?;
        uow.commit().await?;

        tracing::debug!(task_id = %task_id, "Task deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task(status: TaskStatus) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Fix bug".to_string(),
            description: None,
            status,
            priority: TaskPriority::Medium,
            assignee_id: None,
            created_by: None,
            due_date: None,
            completed_at: (status == TaskStatus::Done).then_some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_round_trip_keeps_completed_at_consistent() {
        let mut t = task(TaskStatus::Todo);
        let t0 = Utc::now();

        TaskChanges::status(TaskStatus::Done).apply(&mut t, t0);
        assert_eq!(t.completed_at, Some(t0));

        TaskChanges::status(TaskStatus::Done).apply(&mut t, t0 + Duration::minutes(5));
        assert_eq!(t.completed_at, Some(t0));

        TaskChanges::status(TaskStatus::InProgress).apply(&mut t, t0);
        assert_eq!(t.completed_at, None);

        let t1 = t0 + Duration::hours(1);
        TaskChanges::status(TaskStatus::Done).apply(&mut t, t1);
        assert_eq!(t.status, TaskStatus::Done);
        assert_eq!(t.completed_at, Some(t1));
    }

    #[test]
    fn test_non_status_changes_leave_completion_alone() {
        let mut t = task(TaskStatus::Done);
        let completed = t.completed_at;

        TaskChanges {
            title: Some("  Ship it  ".to_string()),
            priority: Some(TaskPriority::Urgent),
            ..TaskChanges::default()
        }
        .apply(&mut t, Utc::now());

        assert_eq!(t.title, "Ship it");
        assert_eq!(t.priority, TaskPriority::Urgent);
        assert_eq!(t.completed_at, completed);
    }

    #[test]
    fn test_clearing_nullable_fields() {
        let mut t = task(TaskStatus::Todo);
        t.assignee_id = Some(Uuid::new_v4());
        t.description = Some("details".to_string());

        TaskChanges {
            description: Some(None),
            ..TaskChanges::assignee(None)
        }
        .apply(&mut t, Utc::now());

        assert_eq!(t.assignee_id, None);
        assert_eq!(t.description, None);
    }

    #[test]
    fn test_new_assignee() {
        let id = Uuid::new_v4();
        assert_eq!(TaskChanges::assignee(Some(id)).new_assignee(), Some(id));
        assert_eq!(TaskChanges::assignee(None).new_assignee(), None);
        assert_eq!(TaskChanges::default().new_assignee(), None);
    }
}
