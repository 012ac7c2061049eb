/// User model and database operations
///
/// Users are global; they join organizations through memberships.
/// Email and username are unique case-insensitively (functional unique
/// indexes on `LOWER(...)`).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL,
///     username VARCHAR(64) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     full_name VARCHAR(255),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// CREATE UNIQUE INDEX users_email_key ON users (LOWER(email));
/// CREATE UNIQUE INDEX users_username_key ON users (LOWER(username));
/// ```
///
/// [`User`] carries the password hash and is never serialized;
/// [`UserProfile`] is the public projection returned by services.
///
/// # Example
///
/// ```no_run
/// use taskforge_shared::models::user::{User, CreateUser};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "ada@example.com".to_string(),
///     username: "ada".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     full_name: Some("Ada Lovelace".to_string()),
/// }).await?;
///
/// let found = User::find_by_email(&pool, "ADA@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Stored user account
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,

    /// Argon2id PHC string
    pub password_hash: String,

    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            full_name: user.full_name,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub username: String,

    /// Argon2id hash, never the plaintext password
    pub password_hash: String,

    pub full_name: Option<String>,
}

/// Input for updating a user; only `Some` fields are written
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub password_hash: Option<String>,

    /// `Some(None)` clears the name
    pub full_name: Option<Option<String>>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.password_hash.is_none() && self.full_name.is_none()
    }
}

const USER_COLUMNS: &str =
    "id, email, username, password_hash, full_name, created_at, updated_at";

impl User {
    /// Creates a user
    ///
    /// # Errors
    ///
    /// Returns an error if the email or username is already taken (unique
    /// violation on `users_email_key` / `users_username_key`)
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, username, password_hash, full_name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, username, password_hash, full_name, created_at, updated_at
            "#,
        )
        .bind(data.email.trim())
        .bind(data.username.trim())
        .bind(data.password_hash)
        .bind(data.full_name)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, password_hash, full_name, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Finds a user by email, ignoring case
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, password_hash, full_name, created_at, updated_at
            FROM users
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email.trim())
        .fetch_optional(pool)
        .await
    }

    /// Finds a user by username, ignoring case
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, password_hash, full_name, created_at, updated_at
            FROM users
            WHERE LOWER(username) = LOWER($1)
            "#,
        )
        .bind(username.trim())
        .fetch_optional(pool)
        .await
    }

    /// Resolves usernames (case-insensitive) to ids of users who belong to
    /// `organization_id`; names that match nobody there are absent from the
    /// result
    pub async fn resolve_member_usernames<'e, E>(
        executor: E,
        organization_id: Uuid,
        usernames: &[String],
    ) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        if usernames.is_empty() {
            return Ok(Vec::new());
        }

        let lowered: Vec<String> = usernames.iter().map(|u| u.to_lowercase()).collect();

        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT u.id
            FROM users u
            JOIN organization_members m ON m.user_id = u.id
            WHERE m.organization_id = $1 AND LOWER(u.username) = ANY($2)
            ORDER BY u.id
            "#,
        )
        .bind(organization_id)
        .bind(lowered)
        .fetch_all(executor)
        .await
    }

    /// Applies a partial update
    ///
    /// # Returns
    ///
    /// The updated user, or None if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE users SET updated_at = NOW()");

        if let Some(password_hash) = data.password_hash {
            qb.push(", password_hash = ").push_bind(password_hash);
        }
        if let Some(full_name) = data.full_name {
            qb.push(", full_name = ").push_bind(full_name);
        }

        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(USER_COLUMNS);

        qb.build_query_as::<User>().fetch_optional(pool).await
    }

    /// Deletes a user
    ///
    /// Memberships, comments and mentions cascade; projects and tasks keep
    /// their rows with `created_by` / `assignee_id` set to NULL.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            username: "ada".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            full_name: Some("Ada Lovelace".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_profile_drops_password_hash() {
        let user = sample();
        let profile = UserProfile::from(user.clone());
        assert_eq!(profile.id, user.id);

        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn test_update_user_default_is_empty() {
        assert!(UpdateUser::default().is_empty());
        let update = UpdateUser {
            full_name: Some(None),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
