/// Mention rows (comment × mentioned user)
///
/// A comment's mention set is always regenerated wholesale: delete every
/// row for the comment, then insert the freshly resolved set. Both steps run
/// on the comment write's transaction.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE mentions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     comment_id UUID NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT mentions_comment_user_key UNIQUE (comment_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Mention {
    pub id: Uuid,
    pub comment_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Mention {
    /// Inserts one row per user; duplicates within `user_ids` are skipped
    pub async fn insert_many<'e, E>(
        executor: E,
        comment_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("INSERT INTO mentions (comment_id, user_id) ");
        qb.push_values(user_ids, |mut row, user_id| {
            row.push_bind(comment_id).push_bind(*user_id);
        });
        qb.push(" ON CONFLICT (comment_id, user_id) DO NOTHING");

        let result = qb.build().execute(executor).await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_comment<'e, E>(executor: E, comment_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM mentions WHERE comment_id = $1")
            .bind(comment_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Mentioned user ids for a batch of comments
    pub async fn user_ids_for_comments<'e, E>(
        executor: E,
        comment_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, Uuid)>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        if comment_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, (Uuid, Uuid)>(
            r#"
            SELECT comment_id, user_id
            FROM mentions
            WHERE comment_id = ANY($1)
            ORDER BY comment_id, user_id
            "#,
        )
        .bind(comment_ids)
        .fetch_all(executor)
        .await
    }
}
