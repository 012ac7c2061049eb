/// Membership-based access decisions
///
/// Every operation on organization-owned data ends in one call to
/// [`authorize`]: the caller has already resolved which organization the
/// target belongs to (see [`super::chain`]), and the evaluator decides from
/// the membership edge alone.
///
/// # Permission model
///
/// 1. **Membership**: no membership row means Forbidden, never NotFound
/// 2. **Role set**: the member's role must be in the operation's [`RoleSet`]
/// 3. **Resource rules**: authorship/creator checks layered on top by the
///    services, using the returned [`Membership`]
///
/// # Example
///
/// ```no_run
/// use taskforge_shared::auth::authorization::{authorize, RoleSet};
/// use taskforge_shared::error::ServiceResult;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, actor: Uuid, org_id: Uuid) -> ServiceResult<()> {
/// let membership = authorize(&pool, actor, org_id, RoleSet::MANAGERS).await?;
/// println!("acting as {}", membership.role);
/// # Ok(())
/// # }
/// ```

use sqlx::PgExecutor;
use std::fmt;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::models::membership::{MemberRole, Membership};

/// Set of roles allowed to perform an operation
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoleSet(u8);

impl RoleSet {
    const fn bit(role: MemberRole) -> u8 {
        match role {
            MemberRole::Owner => 0b1000,
            MemberRole::Admin => 0b0100,
            MemberRole::Member => 0b0010,
            MemberRole::Viewer => 0b0001,
        }
    }

    /// Every member, including viewers
    pub const ANY: RoleSet = RoleSet(0b1111);

    /// Roles that create and edit content
    pub const WRITERS: RoleSet = RoleSet(0b1110);

    /// Roles that administer the organization
    pub const MANAGERS: RoleSet = RoleSet(0b1100);

    pub const OWNERS: RoleSet = RoleSet(0b1000);

    pub const fn of(roles: &[MemberRole]) -> RoleSet {
        let mut bits = 0;
        let mut i = 0;
        while i < roles.len() {
            bits |= Self::bit(roles[i]);
            i += 1;
        }
        RoleSet(bits)
    }

    pub const fn contains(&self, role: MemberRole) -> bool {
        self.0 & Self::bit(role) != 0
    }

    pub fn roles(&self) -> impl Iterator<Item = MemberRole> + '_ {
        MemberRole::ALL.into_iter().filter(|role| self.contains(*role))
    }
}

impl fmt::Debug for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.roles()).finish()
    }
}

/// Grants the action if `actor` is a member of `organization_id` whose role
/// is in `allowed`
///
/// # Returns
///
/// The actor's membership, for follow-up rules that depend on the role
///
/// # Errors
///
/// - `Forbidden` if the actor is not a member, or their role is not allowed
/// - `Internal` on store failure
pub async fn authorize<'e, E>(
    executor: E,
    actor: Uuid,
    organization_id: Uuid,
    allowed: RoleSet,
) -> ServiceResult<Membership>
where
    E: PgExecutor<'e>,
{
    let membership = Membership::find(executor, organization_id, actor)
        .await?
        .ok_or_else(|| {
            tracing::warn!(
                actor = %actor,
                organization_id = %organization_id,
                "Denied: not a member"
            );
            ServiceError::forbidden("You are not a member of this organization")
        })?;

    check_role(&membership, allowed)?;
    Ok(membership)
}

/// Role half of [`authorize`], for callers that already hold the membership
pub fn check_role(membership: &Membership, allowed: RoleSet) -> ServiceResult<()> {
    if allowed.contains(membership.role) {
        return Ok(());
    }

    tracing::warn!(
        actor = %membership.user_id,
        organization_id = %membership.organization_id,
        role = %membership.role,
        allowed = ?allowed,
        "Denied: insufficient role"
    );
    Err(ServiceError::forbidden(format!(
        "Role {} is not allowed to perform this action",
        membership.role
    )))
}

/// Rule for deleting projects and tasks: managers always, writers only for
/// what they created
pub fn can_delete_created(membership: &Membership, created_by: Option<Uuid>) -> bool {
    RoleSet::MANAGERS.contains(membership.role)
        || (RoleSet::WRITERS.contains(membership.role) && created_by == Some(membership.user_id))
}

/// Rule for deleting a comment: its author, or a manager
pub fn can_delete_comment(membership: &Membership, author_id: Uuid) -> bool {
    author_id == membership.user_id || RoleSet::MANAGERS.contains(membership.role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn membership(role: MemberRole) -> Membership {
        Membership {
            organization_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role,
            joined_at: Utc::now(),
        }
    }

    #[test]
    fn test_named_sets() {
        assert!(MemberRole::ALL.iter().all(|r| RoleSet::ANY.contains(*r)));
        assert!(!RoleSet::WRITERS.contains(MemberRole::Viewer));
        assert!(RoleSet::WRITERS.contains(MemberRole::Member));
        assert!(RoleSet::MANAGERS.contains(MemberRole::Admin));
        assert!(!RoleSet::MANAGERS.contains(MemberRole::Member));
        assert_eq!(RoleSet::OWNERS.roles().collect::<Vec<_>>(), vec![MemberRole::Owner]);
    }

    #[test]
    fn test_of_matches_constants() {
        assert_eq!(RoleSet::of(&[MemberRole::Owner, MemberRole::Admin]), RoleSet::MANAGERS);
        assert_eq!(RoleSet::of(&MemberRole::ALL), RoleSet::ANY);
    }

    #[test]
    fn test_check_role() {
        assert!(check_role(&membership(MemberRole::Admin), RoleSet::MANAGERS).is_ok());
        let err = check_role(&membership(MemberRole::Viewer), RoleSet::WRITERS).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Forbidden);
    }

    #[test]
    fn test_delete_rules() {
        let writer = membership(MemberRole::Member);
        assert!(can_delete_created(&writer, Some(writer.user_id)));
        assert!(!can_delete_created(&writer, Some(Uuid::new_v4())));
        assert!(!can_delete_created(&writer, None));
        assert!(can_delete_created(&membership(MemberRole::Admin), None));

        let viewer = membership(MemberRole::Viewer);
        assert!(!can_delete_created(&viewer, Some(viewer.user_id)));

        assert!(can_delete_comment(&viewer, viewer.user_id));
        assert!(!can_delete_comment(&writer, Uuid::new_v4()));
        assert!(can_delete_comment(&membership(MemberRole::Owner), Uuid::new_v4()));
    }

    #[test]
    fn test_debug_lists_roles() {
        assert_eq!(format!("{:?}", RoleSet::MANAGERS), "{Owner, Admin}");
    }
}
