/// Account registration, credential checks and profiles
///
/// Argon2 runs on the blocking pool so hashing never stalls the async
/// workers. Results are always [`UserProfile`]s; the stored hash does not
/// leave this module.

use sqlx::PgPool;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::auth::password::{check_strength, hash_password, verify_password, PasswordError};
use crate::error::{ServiceError, ServiceResult};
use crate::mentions::{is_mentionable, MAX_IDENTIFIER_LEN};
use crate::models::user::{CreateUser, UpdateUser, User, UserProfile};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_EMAIL_LEN: usize = 255;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Weak(reason) => ServiceError::invalid(format!("Password {}", reason)),
            other => {
                tracing::error!(error = %other, "Password hashing failed");
                ServiceError::Internal("Failed to process credentials".to_string())
            }
        }
    }
}

/// Usernames double as mention handles, so they follow the mention grammar
fn validate_username(username: &str) -> ServiceResult<()> {
    if username.len() < MIN_USERNAME_LEN || !is_mentionable(username) {
        return Err(ServiceError::invalid(format!(
            "Username must be {}-{} characters of letters, digits, '_', '.' or '-'",
            MIN_USERNAME_LEN, MAX_IDENTIFIER_LEN
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> ServiceResult<()> {
    if email.len() > MAX_EMAIL_LEN || !email.validate_email() {
        return Err(ServiceError::invalid("Invalid email address"));
    }
    Ok(())
}

async fn hash_blocking(password: String) -> ServiceResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ServiceError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(ServiceError::from)
}

async fn verify_blocking(password: String, hash: String) -> ServiceResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ServiceError::Internal(format!("Verification task failed: {}", e)))?
        .map_err(ServiceError::from)
}

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates an account
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a malformed email/username or a weak password
    /// - `Conflict` if the email or username is taken (case-insensitively)
    #[tracing::instrument(skip_all, fields(username = %data.username))]
    pub async fn register(&self, data: NewUser) -> ServiceResult<UserProfile> {
        let email = data.email.trim().to_string();
        let username = data.username.trim().to_string();
        validate_email(&email)?;
        validate_username(&username)?;
        check_strength(&data.password)?;

        let password_hash = hash_blocking(data.password).await?;
        let user = User::create(
            &self.pool,
            CreateUser {
                email,
                username,
                password_hash,
                full_name: data.full_name,
            },
        )
        .await?;

        tracing::debug!(user_id = %user.id, "User registered");
        Ok(user.into())
    }

    /// Checks credentials; `login` is an email or a username
    ///
    /// # Returns
    ///
    /// The profile on success, None for unknown users or a wrong password
    #[tracing::instrument(skip_all)]
    pub async fn authenticate(&self, login: &str, password: &str) -> ServiceResult<Option<UserProfile>> {
        let login = login.trim();
        let user = if login.contains('@') {
            User::find_by_email(&self.pool, login).await?
        } else {
            User::find_by_username(&self.pool, login).await?
        };

        let Some(user) = user else {
            tracing::debug!("Login for unknown user");
            return Ok(None);
        };

        if verify_blocking(password.to_string(), user.password_hash.clone()).await? {
            Ok(Some(user.into()))
        } else {
            tracing::debug!(user_id = %user.id, "Login with wrong password");
            Ok(None)
        }
    }

    pub async fn profile(&self, user_id: Uuid) -> ServiceResult<UserProfile> {
        User::find_by_id(&self.pool, user_id)
            .await?
            .map(UserProfile::from)
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    /// Sets or clears the display name
    #[tracing::instrument(skip(self))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        full_name: Option<String>,
    ) -> ServiceResult<UserProfile> {
        let full_name = full_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        let user = User::update(
            &self.pool,
            user_id,
            UpdateUser {
                full_name: Some(full_name),
                ..UpdateUser::default()
            },
        )
        .await?
        .ok_or_else(|| ServiceError::not_found("User"))?;

        Ok(user.into())
    }

    /// Replaces the password after checking the current one
    #[tracing::instrument(skip(self, current, new_password))]
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current: &str,
        new_password: &str,
    ) -> ServiceResult<()> {
        let user = User::find_by_id(&self.pool, user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;

        if !verify_blocking(current.to_string(), user.password_hash).await? {
            return Err(ServiceError::invalid("Current password is incorrect"));
        }
        check_strength(new_password)?;

        let password_hash = hash_blocking(new_password.to_string()).await?;
        User::update(
            &self.pool,
            user_id,
            UpdateUser {
                password_hash: Some(password_hash),
                ..UpdateUser::default()
            },
        )
        .await?;

        tracing::debug!(user_id = %user_id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("ada").is_ok());
        assert!(validate_username("ada.lovelace-1_").is_ok());
        assert!(validate_username("ad").is_err());
        assert!(validate_username("ada lovelace").is_err());
        assert!(validate_username(&"a".repeat(MAX_IDENTIFIER_LEN + 1)).is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("no-at-sign").is_err());

        for malformed in [
            "a b@example.com",
            "ada@@example.com",
            "ada@exa mple.com",
            "ada@.",
            "ada@example.",
        ] {
            assert!(validate_email(malformed).is_err(), "{}", malformed);
        }

        let long = format!("{}@example.com", "a".repeat(MAX_EMAIL_LEN));
        assert!(validate_email(&long).is_err());
    }

    #[test]
    fn test_password_error_mapping() {
        let weak: ServiceError = PasswordError::Weak("must contain a digit".to_string()).into();
        assert_eq!(weak.kind(), ErrorKind::InvalidInput);
        assert_eq!(weak.message(), "Password must contain a digit");

        let broken: ServiceError = PasswordError::HashError("params".to_string()).into();
        assert_eq!(broken.kind(), ErrorKind::Internal);
        assert!(!broken.message().contains("params"));
    }

    #[tokio::test]
    async fn test_hash_blocking_round_trip() {
        let hash = hash_blocking("abcdefg1".to_string()).await.unwrap();
        assert!(verify_blocking("abcdefg1".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_blocking("abcdefg2".to_string(), hash).await.unwrap());
    }
}
