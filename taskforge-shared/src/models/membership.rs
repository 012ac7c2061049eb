/// Organization membership model and database operations
///
/// A membership row is the edge (organization × user → role) that every
/// access decision reads. Roles are ordered OWNER > ADMIN > MEMBER > VIEWER.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE member_role AS ENUM ('owner', 'admin', 'member', 'viewer');
///
/// CREATE TABLE organization_members (
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role member_role NOT NULL DEFAULT 'member',
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (organization_id, user_id)
/// );
/// ```
///
/// Write functions are generic over [`sqlx::PgExecutor`] so they run either
/// on the pool or inside a [`UnitOfWork`](crate::db::transaction::UnitOfWork).
///
/// # Example
///
/// ```no_run
/// use taskforge_shared::models::membership::{Membership, MemberRole};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, org_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// Membership::create(&pool, org_id, user_id, MemberRole::Admin).await?;
///
/// let membership = Membership::find(&pool, org_id, user_id).await?;
/// assert_eq!(membership.map(|m| m.role), Some(MemberRole::Admin));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::query::sort::MemberSortField;
use crate::query::{fetch_page, Paginated, Pagination, Sort};

/// Role held by a user within one organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "member_role", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberRole {
    /// Full control, including deleting the organization
    Owner,

    /// Manages members, projects and custom properties
    Admin,

    /// Creates and edits projects, tasks and comments
    Member,

    /// Read-only access
    Viewer,
}

impl MemberRole {
    pub const ALL: [MemberRole; 4] = [
        MemberRole::Owner,
        MemberRole::Admin,
        MemberRole::Member,
        MemberRole::Viewer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "OWNER",
            MemberRole::Admin => "ADMIN",
            MemberRole::Member => "MEMBER",
            MemberRole::Viewer => "VIEWER",
        }
    }

    /// Checks if this role ranks at least as high as `required`
    ///
    /// Hierarchy: Owner > Admin > Member > Viewer
    pub fn has_permission(&self, required: &MemberRole) -> bool {
        self.permission_level() >= required.permission_level()
    }

    /// Numeric rank used for ordering comparisons
    pub fn permission_level(&self) -> u8 {
        match self {
            MemberRole::Owner => 4,
            MemberRole::Admin => 3,
            MemberRole::Member => 2,
            MemberRole::Viewer => 1,
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OWNER" => Ok(MemberRole::Owner),
            "ADMIN" => Ok(MemberRole::Admin),
            "MEMBER" => Ok(MemberRole::Member),
            "VIEWER" => Ok(MemberRole::Viewer),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}

/// Membership edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

/// Membership joined with the member's public profile, for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MemberWithUser {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

const MEMBERSHIP_COLUMNS: &str = "organization_id, user_id, role, joined_at";

impl Membership {
    /// Adds a user to an organization
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The user is already a member (primary key violation)
    /// - The organization or user doesn't exist (foreign key violation)
    pub async fn create<'e, E>(
        executor: E,
        organization_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Membership>(&format!(
            r#"
            INSERT INTO organization_members (organization_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            MEMBERSHIP_COLUMNS
        ))
        .bind(organization_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(executor)
        .await
    }

    /// Finds the membership of `user_id` in `organization_id`
    pub async fn find<'e, E>(
        executor: E,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Membership>(&format!(
            r#"
            SELECT {}
            FROM organization_members
            WHERE organization_id = $1 AND user_id = $2
            "#,
            MEMBERSHIP_COLUMNS
        ))
        .bind(organization_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Checks whether the user belongs to the organization
    pub async fn is_member<'e, E>(
        executor: E,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM organization_members
                WHERE organization_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_one(executor)
        .await
    }

    /// Changes a member's role
    ///
    /// # Returns
    ///
    /// The updated membership, or None if the user is not a member
    pub async fn update_role<'e, E>(
        executor: E,
        organization_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Membership>(&format!(
            r#"
            UPDATE organization_members
            SET role = $3
            WHERE organization_id = $1 AND user_id = $2
            RETURNING {}
            "#,
            MEMBERSHIP_COLUMNS
        ))
        .bind(organization_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(executor)
        .await
    }

    /// Removes a user from an organization
    ///
    /// # Returns
    ///
    /// `true` if a row was deleted
    pub async fn delete<'e, E>(
        executor: E,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "DELETE FROM organization_members WHERE organization_id = $1 AND user_id = $2",
        )
        .bind(organization_id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes every membership of an organization
    pub async fn delete_by_organization<'e, E>(
        executor: E,
        organization_id: Uuid,
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM organization_members WHERE organization_id = $1")
            .bind(organization_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Counts OWNER memberships of an organization
    pub async fn count_owners<'e, E>(executor: E, organization_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM organization_members
            WHERE organization_id = $1 AND role = 'owner'
            "#,
        )
        .bind(organization_id)
        .fetch_one(executor)
        .await
    }

    /// Lists the members of an organization with their profiles
    pub async fn list_by_organization(
        pool: &PgPool,
        organization_id: Uuid,
        sort: Sort<MemberSortField>,
        pagination: Pagination,
    ) -> Result<Paginated<MemberWithUser>, sqlx::Error> {
        fetch_page(
            pool,
            "m.user_id, u.username, u.email, u.full_name, m.role, m.joined_at",
            |qb: &mut QueryBuilder<'_, Postgres>| {
                qb.push("FROM organization_members m JOIN users u ON u.id = m.user_id WHERE m.organization_id = ")
                    .push_bind(organization_id);
            },
            sort,
            pagination,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy() {
        assert!(MemberRole::Owner.has_permission(&MemberRole::Admin));
        assert!(MemberRole::Admin.has_permission(&MemberRole::Member));
        assert!(MemberRole::Member.has_permission(&MemberRole::Viewer));
        assert!(!MemberRole::Viewer.has_permission(&MemberRole::Member));
        assert!(!MemberRole::Admin.has_permission(&MemberRole::Owner));
        assert!(MemberRole::Member.has_permission(&MemberRole::Member));
    }

    #[test]
    fn test_role_serde_is_uppercase() {
        assert_eq!(serde_json::to_string(&MemberRole::Owner).unwrap(), "\"OWNER\"");
        let role: MemberRole = serde_json::from_str("\"VIEWER\"").unwrap();
        assert_eq!(role, MemberRole::Viewer);
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("admin".parse::<MemberRole>().unwrap(), MemberRole::Admin);
        assert_eq!("OWNER".parse::<MemberRole>().unwrap(), MemberRole::Owner);
        assert!("superuser".parse::<MemberRole>().is_err());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(MemberRole::Member.to_string(), "MEMBER");
    }
}
