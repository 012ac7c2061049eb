/// Authorized operations
///
/// Every operation takes the acting user's id first and follows the same
/// sequence:
///
/// 1. Resolve the target's ownership chain (`NotFound` on a missing link)
/// 2. Authorize the actor against the owning organization (`Forbidden`)
/// 3. Validate the payload (`InvalidInput`)
/// 4. Read or write, inside a [`crate::db::transaction::UnitOfWork`] when
///    more than one row changes
///
/// # Example
///
/// ```no_run
/// use taskforge_shared::models::organization::CreateOrganization;
/// use taskforge_shared::services::Services;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, actor: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let services = Services::new(pool);
/// let org = services
///     .organizations
///     .create(actor, CreateOrganization { name: "Acme".into(), description: None })
///     .await?;
/// assert_eq!(org.slug, "acme");
/// # Ok(())
/// # }
/// ```

pub mod comments;
pub mod custom_properties;
pub mod members;
pub mod organizations;
pub mod projects;
pub mod tasks;
pub mod users;

use sqlx::PgPool;

use crate::error::{ServiceError, ServiceResult};

pub use comments::CommentService;
pub use custom_properties::CustomPropertyService;
pub use members::MemberService;
pub use organizations::OrganizationService;
pub use projects::ProjectService;
pub use tasks::TaskService;
pub use users::UserService;

/// All services over one pool; cheap to clone
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub organizations: OrganizationService,
    pub members: MemberService,
    pub projects: ProjectService,
    pub tasks: TaskService,
    pub comments: CommentService,
    pub custom_properties: CustomPropertyService,
}

impl Services {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserService::new(pool.clone()),
            organizations: OrganizationService::new(pool.clone()),
            members: MemberService::new(pool.clone()),
            projects: ProjectService::new(pool.clone()),
            tasks: TaskService::new(pool.clone()),
            comments: CommentService::new(pool.clone()),
            custom_properties: CustomPropertyService::new(pool),
        }
    }
}

/// Non-blank after trimming, at most `max` characters
pub(crate) fn validate_name(label: &str, value: &str, max: usize) -> ServiceResult<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::invalid(format!("{} cannot be empty", label)));
    }
    if trimmed.chars().count() > max {
        return Err(ServiceError::invalid(format!(
            "{} must be at most {} characters",
            label, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Name", " Website ", 10).is_ok());
        assert_eq!(
            validate_name("Name", "   ", 10).unwrap_err().message(),
            "Name cannot be empty"
        );
        assert!(validate_name("Name", "ééééé", 5).is_ok());
        assert!(validate_name("Name", "abcdef", 5).is_err());
    }
}
