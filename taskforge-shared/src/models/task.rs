/// Task model and database operations
///
/// Tasks belong to a project (and through it to an organization). Status
/// moves freely between any two values; the only rule attached to status is
/// the completion timestamp:
///
/// ```text
/// non-DONE → DONE      completed_at = now
/// DONE     → DONE      completed_at unchanged
/// DONE     → non-DONE  completed_at = NULL
/// ```
///
/// [`TaskStatus::completed_at_after`] is the single implementation of that
/// rule; the `tasks_completed_at_check` constraint rejects any write that
/// bypasses it.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in_progress', 'review', 'done', 'archived');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high', 'urgent');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'todo',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     due_date TIMESTAMPTZ,
///     completed_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT tasks_completed_at_check
///         CHECK ((status = 'done') = (completed_at IS NOT NULL))
/// );
/// ```
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use taskforge_shared::models::task::TaskStatus;
///
/// let now = Utc::now();
/// let done = TaskStatus::completed_at_after(TaskStatus::Todo, TaskStatus::Done, None, now);
/// assert_eq!(done, Some(now));
///
/// let reopened = TaskStatus::completed_at_after(TaskStatus::Done, TaskStatus::InProgress, done, now);
/// assert_eq!(reopened, None);
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor, PgPool, Postgres, QueryBuilder};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::query::filter::TaskFilter;
use crate::query::sort::TaskSortField;
use crate::query::{fetch_page, Paginated, Pagination, Sort};

/// Workflow status
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
    Archived,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
        TaskStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Review => "REVIEW",
            TaskStatus::Done => "DONE",
            TaskStatus::Archived => "ARCHIVED",
        }
    }

    /// Statuses that still count towards "overdue"
    pub fn is_open(&self) -> bool {
        !matches!(self, TaskStatus::Done | TaskStatus::Archived)
    }

    /// Completion timestamp after moving from `previous` to `next`
    pub fn completed_at_after(
        previous: TaskStatus,
        next: TaskStatus,
        previous_completed_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        match (previous, next) {
            (_, status) if status != TaskStatus::Done => None,
            (TaskStatus::Done, TaskStatus::Done) => previous_completed_at.or(Some(now)),
            _ => Some(now),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TODO" => Ok(TaskStatus::Todo),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "REVIEW" => Ok(TaskStatus::Review),
            "DONE" => Ok(TaskStatus::Done),
            "ARCHIVED" => Ok(TaskStatus::Archived),
            other => Err(format!("Unknown task status '{}'", other)),
        }
    }
}

/// Urgency, ordered LOW < MEDIUM < HIGH < URGENT
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 4] = [
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
            TaskPriority::Urgent => "URGENT",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(TaskPriority::Low),
            "MEDIUM" => Ok(TaskPriority::Medium),
            "HIGH" => Ok(TaskPriority::High),
            "URGENT" => Ok(TaskPriority::Urgent),
            other => Err(format!("Unknown task priority '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,

    /// Set iff `status == Done`
    pub completed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_by: Uuid,
}

/// Task counts for one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: i64,
    pub by_status: BTreeMap<TaskStatus, i64>,
    pub by_priority: BTreeMap<TaskPriority, i64>,

    /// Open tasks whose due date has passed
    pub overdue: i64,
}

impl TaskStats {
    /// Builds stats from grouped counts, reporting zero for absent groups
    pub fn from_counts(
        status_counts: Vec<(TaskStatus, i64)>,
        priority_counts: Vec<(TaskPriority, i64)>,
        overdue: i64,
    ) -> Self {
        let mut by_status: BTreeMap<TaskStatus, i64> =
            TaskStatus::ALL.iter().map(|s| (*s, 0)).collect();
        let mut by_priority: BTreeMap<TaskPriority, i64> =
            TaskPriority::ALL.iter().map(|p| (*p, 0)).collect();

        for (status, count) in status_counts {
            by_status.insert(status, count);
        }
        for (priority, count) in priority_counts {
            by_priority.insert(priority, count);
        }

        Self {
            total: by_status.values().sum(),
            by_status,
            by_priority,
            overdue,
        }
    }
}

const TASK_COLUMNS: &str = "id, project_id, title, description, status, priority, assignee_id, \
     created_by, due_date, completed_at, created_at, updated_at";

impl Task {
    /// Inserts a task; `completed_at` follows the initial status
    pub async fn create<'e, E>(executor: E, data: CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let completed_at =
            TaskStatus::completed_at_after(TaskStatus::Todo, data.status, None, Utc::now());

        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (
                project_id, title, description, status, priority,
                assignee_id, due_date, created_by, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, project_id, title, description, status, priority, assignee_id,
                      created_by, due_date, completed_at, created_at, updated_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.title.trim())
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.assignee_id)
        .bind(data.due_date)
        .bind(data.created_by)
        .bind(completed_at)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, project_id, title, description, status, priority, assignee_id,
                   created_by, due_date, completed_at, created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Loads the task and locks its row until the transaction ends
    pub async fn find_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, project_id, title, description, status, priority, assignee_id,
                   created_by, due_date, completed_at, created_at, updated_at
            FROM tasks
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Writes every mutable column of `task` back to its row
    pub async fn save<'e, E>(executor: E, task: &Task) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("UPDATE tasks SET ");
        qb.push("title = ")
            .push_bind(task.title.clone())
            .push(", description = ")
            .push_bind(task.description.clone())
            .push(", status = ")
            .push_bind(task.status)
            .push(", priority = ")
            .push_bind(task.priority)
            .push(", assignee_id = ")
            .push_bind(task.assignee_id)
            .push(", due_date = ")
            .push_bind(task.due_date)
            .push(", completed_at = ")
            .push_bind(task.completed_at)
            .push(", updated_at = NOW() WHERE id = ")
            .push_bind(task.id)
            .push(" RETURNING ")
            .push(TASK_COLUMNS);

        qb.build_query_as::<Task>().fetch_one(executor).await
    }

    pub async fn list_by_project(
        pool: &PgPool,
        project_id: Uuid,
        filter: &TaskFilter,
        sort: Sort<TaskSortField>,
        pagination: Pagination,
    ) -> Result<Paginated<Self>, sqlx::Error> {
        fetch_page(
            pool,
            "t.id, t.project_id, t.title, t.description, t.status, t.priority, t.assignee_id, \
             t.created_by, t.due_date, t.completed_at, t.created_at, t.updated_at",
            |qb: &mut QueryBuilder<'_, Postgres>| {
                qb.push("FROM tasks t WHERE t.project_id = ").push_bind(project_id);
                filter.push_conditions(qb);
            },
            sort,
            pagination,
        )
        .await
    }

    /// Grouped counts for [`TaskStats`]
    pub async fn stats_for_project(pool: &PgPool, project_id: Uuid) -> Result<TaskStats, sqlx::Error> {
        let status_counts: Vec<(TaskStatus, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM tasks WHERE project_id = $1 GROUP BY status",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        let priority_counts: Vec<(TaskPriority, i64)> = sqlx::query_as(
            "SELECT priority, COUNT(*) FROM tasks WHERE project_id = $1 GROUP BY priority",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        let overdue: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM tasks
            WHERE project_id = $1
              AND due_date < NOW()
              AND status NOT IN ('done', 'archived')
            "#,
        )
        .bind(project_id)
        .fetch_one(pool)
        .await?;

        Ok(TaskStats::from_counts(status_counts, priority_counts, overdue))
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every task of every project of an organization
    pub async fn delete_by_organization<'e, E>(
        executor: E,
        organization_id: Uuid,
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            DELETE FROM tasks
            WHERE project_id IN (SELECT id FROM projects WHERE organization_id = $1)
            "#,
        )
        .bind(organization_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
