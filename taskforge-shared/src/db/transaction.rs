/// Transaction coordinator
///
/// [`UnitOfWork`] wraps a Postgres transaction for every write that touches
/// more than one row or entity type: organization + owner membership,
/// comment + mentions, cascade deletes, owner-count-protected membership
/// changes. Model functions borrow the connection through
/// [`UnitOfWork::conn`]; nothing is visible to other sessions until
/// [`UnitOfWork::commit`] succeeds. Dropping an uncommitted unit rolls it
/// back, so an early `?` return never leaves partial rows behind.
///
/// # Example
///
/// ```no_run
/// use taskforge_shared::db::transaction::UnitOfWork;
/// use taskforge_shared::error::ServiceResult;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, org_id: Uuid) -> ServiceResult<()> {
/// let mut uow = UnitOfWork::begin(&pool, "rename_org").await?;
/// sqlx::query("UPDATE organizations SET name = 'Acme 2' WHERE id = $1")
///     .bind(org_id)
///     .execute(uow.conn())
///     .await?;
/// uow.commit().await?;
/// # Ok(())
/// # }
/// ```

use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::time::Instant;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::models::custom_property::PropertyEntityType;

/// A single all-or-nothing write sequence
pub struct UnitOfWork {
    tx: Transaction<'static, Postgres>,
    label: &'static str,
    started: Instant,
}

impl UnitOfWork {
    /// Opens a transaction on `pool`; `label` names the operation in logs
    pub async fn begin(pool: &PgPool, label: &'static str) -> ServiceResult<Self> {
        let tx = pool.begin().await?;
        tracing::trace!(unit = label, "Transaction started");

        Ok(Self {
            tx,
            label,
            started: Instant::now(),
        })
    }

    /// Connection bound to this transaction
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    /// Takes a row lock on the organization for the rest of the transaction
    ///
    /// Membership mutations that read the owner count lock the organization
    /// first, so concurrent demotions/removals serialize and each one counts
    /// owners after the previous one committed.
    pub async fn lock_organization(&mut self, organization_id: Uuid) -> ServiceResult<()> {
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM organizations WHERE id = $1 FOR UPDATE")
                .bind(organization_id)
                .fetch_optional(self.conn())
                .await?;

        locked
            .map(|_| ())
            .ok_or_else(|| ServiceError::not_found("Organization"))
    }

    /// Share-locks the task or project a property value is written to
    ///
    /// A delete of that row waits for this unit, and a row deleted before
    /// the lock was taken is `NotFound`.
    pub async fn lock_entity(
        &mut self,
        entity_type: PropertyEntityType,
        entity_id: Uuid,
    ) -> ServiceResult<()> {
        let (sql, what) = match entity_type {
            PropertyEntityType::Task => ("SELECT id FROM tasks WHERE id = $1 FOR SHARE", "Task"),
            PropertyEntityType::Project => {
                ("SELECT id FROM projects WHERE id = $1 FOR SHARE", "Project")
            }
        };

        let locked: Option<Uuid> = sqlx::query_scalar(sql)
            .bind(entity_id)
            .fetch_optional(self.conn())
            .await?;

        locked.map(|_| ()).ok_or_else(|| ServiceError::not_found(what))
    }

    /// Locks a project and all of its tasks for deletion
    pub async fn lock_project_tree(&mut self, project_id: Uuid) -> ServiceResult<()> {
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM projects WHERE id = $1 FOR UPDATE")
                .bind(project_id)
                .fetch_optional(self.conn())
                .await?;
        if locked.is_none() {
            return Err(ServiceError::not_found("Project"));
        }

        sqlx::query("SELECT id FROM tasks WHERE project_id = $1 FOR UPDATE")
            .bind(project_id)
            .execute(self.conn())
            .await?;
        Ok(())
    }

    /// Commits every write made through this unit
    pub async fn commit(self) -> ServiceResult<()> {
        let label = self.label;
        let elapsed = self.started.elapsed();

        self.tx.commit().await.map_err(|err| {
            tracing::warn!(unit = label, error = %err, "Transaction commit failed");
            ServiceError::from(err)
        })?;

        tracing::debug!(
            unit = label,
            elapsed_ms = elapsed.as_millis() as u64,
            "Transaction committed"
        );
        Ok(())
    }
}
