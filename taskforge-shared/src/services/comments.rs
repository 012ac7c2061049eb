/// Comment operations and the mention pipeline
///
/// Content is tokenized with [`crate::mentions::extract_mentions`]; the
/// identifiers are resolved to users who are members of the comment's
/// organization and written as mention rows in the same transaction as the
/// comment. Unresolved identifiers are dropped. An edit replaces the whole
/// mention set, so `{A, B}` edited to mention `{B, C}` leaves exactly `{B, C}`.

use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::authorization::{authorize, can_delete_comment, RoleSet};
use crate::auth::chain::{resolve_comment, resolve_task};
use crate::db::transaction::UnitOfWork;
use crate::error::{ServiceError, ServiceResult};
use crate::mentions::extract_mentions;
use crate::models::comment::{Comment, CommentWithMentions};
use crate::models::mention::Mention;
use crate::models::user::User;
use crate::query::sort::CommentSortField;
use crate::query::{Paginated, Pagination, Sort};

pub const MAX_COMMENT_LEN: usize = 10_000;

#[derive(Clone)]
pub struct CommentService {
    pool: PgPool,
}

fn validate_content(content: &str) -> ServiceResult<&str> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ServiceError::invalid("Comment content cannot be empty"));
    }
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(ServiceError::invalid(format!(
            "Comment content must be at most {} characters",
            MAX_COMMENT_LEN
        )));
    }
    Ok(content)
}

/// Replaces the mentions of `comment_id` with those found in `content`
async fn replace_mentions(
    conn: &mut PgConnection,
    organization_id: Uuid,
    comment_id: Uuid,
    content: &str,
) -> ServiceResult<Vec<Uuid>> {
    let usernames = extract_mentions(content);
    let user_ids = User::resolve_member_usernames(&mut *conn, organization_id, &usernames).await?;

    Mention::delete_by_comment(&mut *conn, comment_id).await?;
    Mention::insert_many(&mut *conn, comment_id, &user_ids).await?;

    tracing::trace!(
        comment_id = %comment_id,
        tokens = usernames.len(),
        resolved = user_ids.len(),
        "Mentions written"
    );
    Ok(user_ids)
}

impl CommentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, content))]
    pub async fn create(
        &self,
        actor: Uuid,
        task_id: Uuid,
        content: &str,
    ) -> ServiceResult<CommentWithMentions> {
        let (_, organization_id) = resolve_task(&self.pool, task_id).await?;
        authorize(&self.pool, actor, organization_id, RoleSet::WRITERS).await?;
        let content = validate_content(content)?;

        let mut uow = UnitOfWork::begin(&self.pool, "create_comment").await?;
        let comment = Comment::create(uow.conn(), task_id, actor, content).await?;
        let mentions = replace_mentions(uow.conn(), organization_id, comment.id, content).await?;
        uow.commit().await?;

        tracing::debug!(comment_id = %comment.id, mentions = mentions.len(), "Comment created");
        Ok(CommentWithMentions { comment, mentions })
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        actor: Uuid,
        task_id: Uuid,
        sort: Sort<CommentSortField>,
        pagination: Pagination,
    ) -> ServiceResult<Paginated<CommentWithMentions>> {
        let (_, organization_id) = resolve_task(&self.pool, task_id).await?;
        authorize(&self.pool, actor, organization_id, RoleSet::ANY).await?;

        let page = Comment::list_by_task(&self.pool, task_id, sort, pagination).await?;
        let ids: Vec<Uuid> = page.data.iter().map(|c| c.id).collect();

        let mut by_comment: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (comment_id, user_id) in Mention::user_ids_for_comments(&self.pool, &ids).await? {
            by_comment.entry(comment_id).or_default().push(user_id);
        }

        Ok(page.map(|comment| {
            let mentions = by_comment.remove(&comment.id).unwrap_or_default();
            CommentWithMentions { comment, mentions }
        }))
    }

    /// Rewrites a comment's content; only its author may do this
    #[tracing::instrument(skip(self, content))]
    pub async fn update(
        &self,
        actor: Uuid,
        comment_id: Uuid,
        content: &str,
    ) -> ServiceResult<CommentWithMentions> {
        let (comment, organization_id) = resolve_comment(&self.pool, comment_id).await?;
        authorize(&self.pool, actor, organization_id, RoleSet::ANY).await?;

        if comment.author_id != actor {
            tracing::warn!(actor = %actor, comment_id = %comment_id, "Denied: comment edit by non-author");
            return Err(ServiceError::forbidden("Only the author can edit a comment"));
        }
        let content = validate_content(content)?;

        let mut uow = UnitOfWork::begin(&self.pool, "update_comment").await?;
        let comment = Comment::update_content(uow.conn(), comment_id, content)
            .await?
            .ok_or_else(|| ServiceError::not_found("Comment"))?;
        let mentions = replace_mentions(uow.conn(), organization_id, comment_id, content).await?;
        uow.commit().await?;

        tracing::debug!(comment_id = %comment_id, mentions = mentions.len(), "Comment updated");
        Ok(CommentWithMentions { comment, mentions })
    }

    /// Deletes a comment; allowed for its author and for managers
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, actor: Uuid, comment_id: Uuid) -> ServiceResult<()> {
        let (comment, organization_id) = resolve_comment(&self.pool, comment_id).await?;
        let membership = authorize(&self.pool, actor, organization_id, RoleSet::ANY).await?;

        if !can_delete_comment(&membership, comment.author_id) {
            tracing::warn!(actor = %actor, comment_id = %comment_id, "Denied: comment delete");
            return Err(ServiceError::forbidden(
                "Only the author or a manager can delete a comment",
            ));
        }

        if !Comment::delete(&self.pool, comment_id).await? {
            return Err(ServiceError::not_found("Comment"));
        }

        tracing::debug!(comment_id = %comment_id, "Comment deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_content() {
        assert_eq!(validate_content("  hi @[ann]  ").unwrap(), "hi @[ann]");
        assert!(validate_content("   ").is_err());
        assert!(validate_content(&"x".repeat(MAX_COMMENT_LEN + 1)).is_err());
    }
}
