/// Project model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::query::filter::ProjectFilter;
use crate::query::sort::ProjectSortField;
use crate::query::{fetch_page, Paginated, Pagination, Sort};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,

    /// None once the creating user has been deleted
    pub created_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateProject {
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

const PROJECT_COLUMNS: &str =
    "id, organization_id, name, description, created_by, created_at, updated_at";

impl Project {
    pub async fn create<'e, E>(executor: E, data: CreateProject) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (organization_id, name, description, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, organization_id, name, description, created_by, created_at, updated_at
            "#,
        )
        .bind(data.organization_id)
        .bind(data.name.trim())
        .bind(data.description)
        .bind(data.created_by)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT id, organization_id, name, description, created_by, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Returns the owning organization id, the first hop of every chain
    /// that passes through a project
    pub async fn organization_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Uuid>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, Uuid>("SELECT organization_id FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn list_by_organization(
        pool: &PgPool,
        organization_id: Uuid,
        filter: &ProjectFilter,
        sort: Sort<ProjectSortField>,
        pagination: Pagination,
    ) -> Result<Paginated<Self>, sqlx::Error> {
        fetch_page(
            pool,
            "p.id, p.organization_id, p.name, p.description, p.created_by, p.created_at, p.updated_at",
            |qb: &mut QueryBuilder<'_, Postgres>| {
                qb.push("FROM projects p WHERE p.organization_id = ")
                    .push_bind(organization_id);
                filter.push_conditions(qb);
            },
            sort,
            pagination,
        )
        .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE projects SET updated_at = NOW()");

        if let Some(name) = data.name {
            qb.push(", name = ").push_bind(name.trim().to_string());
        }
        if let Some(description) = data.description {
            qb.push(", description = ").push_bind(description);
        }

        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(PROJECT_COLUMNS);

        qb.build_query_as::<Project>().fetch_optional(executor).await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_organization<'e, E>(
        executor: E,
        organization_id: Uuid,
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM projects WHERE organization_id = $1")
            .bind(organization_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
