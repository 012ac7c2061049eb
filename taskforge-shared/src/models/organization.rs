/// Organization model and database operations
///
/// Organizations are the tenant boundary: every project, task, comment and
/// custom property hangs off exactly one of them. Name and slug are both
/// globally unique; the slug is derived from the name on create and rename.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE organizations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     slug VARCHAR(255) NOT NULL,
///     description TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT organizations_name_key UNIQUE (name),
///     CONSTRAINT organizations_slug_key UNIQUE (slug)
/// );
/// ```
///
/// # Example
///
/// ```
/// use taskforge_shared::models::organization::slugify;
///
/// assert_eq!(slugify("Acme Corp"), "acme-corp");
/// assert_eq!(slugify("  R&D -- Labs!  "), "r-d-labs");
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::query::filter::OrganizationFilter;
use crate::query::sort::OrganizationSortField;
use crate::query::{fetch_page, Paginated, Pagination, Sort};

/// Tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an organization
#[derive(Debug, Clone)]
pub struct CreateOrganization {
    pub name: String,
    pub description: Option<String>,
}

/// Partial update; a new name also regenerates the slug
#[derive(Debug, Clone, Default)]
pub struct UpdateOrganization {
    pub name: Option<String>,

    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
}

/// Derives a URL slug from a name
///
/// Lowercases ASCII letters, keeps ASCII digits, and collapses every run of
/// other characters into a single `-`. Leading and trailing dashes are
/// trimmed, so a name without alphanumerics yields an empty slug.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

const ORGANIZATION_COLUMNS: &str = "id, name, slug, description, created_at, updated_at";

impl Organization {
    /// Inserts an organization with a slug derived from its name
    ///
    /// # Errors
    ///
    /// Returns a unique violation if the name or slug is taken
    pub async fn create<'e, E>(executor: E, data: CreateOrganization) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let name = data.name.trim().to_string();
        let slug = slugify(&name);

        sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (name, slug, description)
            VALUES ($1, $2, $3)
            RETURNING id, name, slug, description, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(data.description)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, name, slug, description, created_at, updated_at
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Lists the organizations `user_id` belongs to
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        filter: &OrganizationFilter,
        sort: Sort<OrganizationSortField>,
        pagination: Pagination,
    ) -> Result<Paginated<Self>, sqlx::Error> {
        fetch_page(
            pool,
            "o.id, o.name, o.slug, o.description, o.created_at, o.updated_at",
            |qb: &mut QueryBuilder<'_, Postgres>| {
                qb.push("FROM organizations o JOIN organization_members m ON m.organization_id = o.id WHERE m.user_id = ")
                    .push_bind(user_id);
                filter.push_conditions(qb);
            },
            sort,
            pagination,
        )
        .await
    }

    /// Applies a partial update
    ///
    /// # Returns
    ///
    /// The updated organization, or None if it doesn't exist
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateOrganization,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE organizations SET updated_at = NOW()");

        if let Some(name) = data.name {
            let name = name.trim().to_string();
            let slug = slugify(&name);
            qb.push(", name = ").push_bind(name);
            qb.push(", slug = ").push_bind(slug);
        }
        if let Some(description) = data.description {
            qb.push(", description = ").push_bind(description);
        }

        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(ORGANIZATION_COLUMNS);

        qb.build_query_as::<Organization>()
            .fetch_optional(executor)
            .await
    }

    /// Deletes the organization row
    ///
    /// Dependent rows are removed explicitly by the caller's transaction
    /// before this runs; the FK cascades only catch stragglers.
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Acme"), "acme");
        assert_eq!(slugify("Acme Corp"), "acme-corp");
        assert_eq!(slugify("Team 42"), "team-42");
    }

    #[test]
    fn test_slugify_collapses_and_trims() {
        assert_eq!(slugify("--Hello,   World!!--"), "hello-world");
        assert_eq!(slugify("a__b..c"), "a-b-c");
    }

    #[test]
    fn test_slugify_non_ascii() {
        assert_eq!(slugify("Café Società"), "caf-societ");
        assert_eq!(slugify("日本"), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_update_default_changes_nothing() {
        let update = UpdateOrganization::default();
        assert!(update.name.is_none());
        assert!(update.description.is_none());
    }
}
