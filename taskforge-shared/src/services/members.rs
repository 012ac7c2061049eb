/// Membership management
///
/// Every mutation locks the organization row before reading roles or
/// counting owners, so concurrent demotions and removals serialize and an
/// organization never ends up without an OWNER.
///
/// Granting or revoking OWNER takes an OWNER; other changes take a manager.
/// Any member may leave, subject to the same last-owner rule.

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::authorization::{authorize, check_role, RoleSet};
use crate::auth::chain::resolve_organization;
use crate::db::transaction::UnitOfWork;
use crate::error::{ServiceError, ServiceResult};
use crate::models::membership::{MemberRole, MemberWithUser, Membership};
use crate::models::user::User;
use crate::query::sort::MemberSortField;
use crate::query::{Paginated, Pagination, Sort};

#[derive(Clone)]
pub struct MemberService {
    pool: PgPool,
}

/// Whether the change touches the OWNER role on either side
fn involves_owner(current: Option<MemberRole>, next: Option<MemberRole>) -> bool {
    current == Some(MemberRole::Owner) || next == Some(MemberRole::Owner)
}

/// Rejects demoting or removing the only remaining owner
fn ensure_owner_remains(
    current: MemberRole,
    next: Option<MemberRole>,
    owner_count: i64,
) -> ServiceResult<()> {
    let loses_owner = current == MemberRole::Owner && next != Some(MemberRole::Owner);
    if loses_owner && owner_count <= 1 {
        return Err(ServiceError::conflict(
            "An organization must keep at least one owner",
        ));
    }
    Ok(())
}

impl MemberService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        actor: Uuid,
        organization_id: Uuid,
        sort: Sort<MemberSortField>,
        pagination: Pagination,
    ) -> ServiceResult<Paginated<MemberWithUser>> {
        resolve_organization(&self.pool, organization_id).await?;
        authorize(&self.pool, actor, organization_id, RoleSet::ANY).await?;

        Ok(Membership::list_by_organization(&self.pool, organization_id, sort, pagination).await?)
    }

    /// Adds an existing user to the organization
    #[tracing::instrument(skip(self))]
    pub async fn add(
        &self,
        actor: Uuid,
        organization_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> ServiceResult<Membership> {
        let mut uow = UnitOfWork::begin(&self.pool, "add_member").await?;
        uow.lock_organization(organization_id).await?;

        let acting = authorize(uow.conn(), actor, organization_id, RoleSet::MANAGERS).await?;
        if involves_owner(None, Some(role)) {
            check_role(&acting, RoleSet::OWNERS)?;
        }

        User::find_by_id(uow.conn(), user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;

        if Membership::is_member(uow.conn(), organization_id, user_id).await? {
            return Err(ServiceError::conflict("User is already a member"));
        }

        let membership = Membership::create(uow.conn(), organization_id, user_id, role).await?;
        uow.commit().await?;

        tracing::debug!(user_id = %user_id, role = %role, "Member added");
        Ok(membership)
    }

    /// Changes a member's role
    #[tracing::instrument(skip(self))]
    pub async fn change_role(
        &self,
        actor: Uuid,
        organization_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> ServiceResult<Membership> {
        let mut uow = UnitOfWork::begin(&self.pool, "change_member_role").await?;
        uow.lock_organization(organization_id).await?;

        let acting = authorize(uow.conn(), actor, organization_id, RoleSet::MANAGERS).await?;
        let target = Membership::find(uow.conn(), organization_id, user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Member"))?;

        if target.role == role {
            return Ok(target);
        }
        if involves_owner(Some(target.role), Some(role)) {
            check_role(&acting, RoleSet::OWNERS)?;
        }

        let owners = Membership::count_owners(uow.conn(), organization_id).await?;
        ensure_owner_remains(target.role, Some(role), owners)?;

        let updated = Membership::update_role(uow.conn(), organization_id, user_id, role)
            .await?
            .ok_or_else(|| ServiceError::not_found("Member"))?;
        uow.commit().await?;

        tracing::debug!(user_id = %user_id, from = %target.role, to = %role, "Member role changed");
        Ok(updated)
    }

    /// Removes a member; members may always remove themselves
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, actor: Uuid, organization_id: Uuid, user_id: Uuid) -> ServiceResult<()> {
        let mut uow = UnitOfWork::begin(&self.pool, "remove_member").await?;
        uow.lock_organization(organization_id).await?;

        let allowed = if actor == user_id {
            RoleSet::ANY
        } else {
            RoleSet::MANAGERS
        };
        let acting = authorize(uow.conn(), actor, organization_id, allowed).await?;

        let target = Membership::find(uow.conn(), organization_id, user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Member"))?;

        if actor != user_id && involves_owner(Some(target.role), None) {
            check_role(&acting, RoleSet::OWNERS)?;
        }

        let owners = Membership::count_owners(uow.conn(), organization_id).await?;
        ensure_owner_remains(target.role, None, owners)?;

        Membership::delete(uow.conn(), organization_id, user_id).await?;
        uow.commit().await?;

        tracing::debug!(user_id = %user_id, "Member removed");
        Ok(())
    }
}
