/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the strength policy
/// - [`jwt`]: HS256 access/refresh tokens carrying the user id
/// - [`middleware`]: Axum bearer-token layer producing [`middleware::AuthContext`]
/// - [`chain`]: resolves the organization that owns a target entity
/// - [`authorization`]: membership/role decisions over that organization
///
/// # Example
///
/// ```no_run
/// use taskforge_shared::auth::password::{hash_password, verify_password};
/// use taskforge_shared::auth::jwt::{JwtKeys, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password1")?;
/// assert!(verify_password("user_password1", &hash)?);
///
/// let keys = JwtKeys::new("a-secret-of-at-least-thirty-two-bytes!!");
/// let pair = keys.issue_pair(Uuid::new_v4())?;
/// keys.validate(&pair.access_token, TokenType::Access)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod chain;
pub mod jwt;
pub mod middleware;
pub mod password;
