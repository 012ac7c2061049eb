/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register and get tokens
/// - `POST /v1/auth/login` - Login with email or username
/// - `POST /v1/auth/refresh` - Exchange a refresh token for a new pair
/// - `GET /v1/auth/me` - Caller's profile
/// - `PATCH /v1/auth/me` - Update the display name
/// - `PUT /v1/auth/me/password` - Change password

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use taskforge_shared::auth::jwt::TokenPair;
use taskforge_shared::auth::middleware::AuthContext;
use taskforge_shared::error::ErrorKind;
use taskforge_shared::models::user::UserProfile;
use taskforge_shared::services::users::NewUser;
use validator::Validate;

use super::{double_option, AppJson};
use crate::app::AppState;
use crate::error::{ApiError, ApiResult};

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 3, max = 64, message = "Username must be 3-64 characters"))]
    pub username: String,

    /// Strength is checked by the user service
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be 8-128 characters"
    ))]
    pub password: String,

    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub full_name: Option<String>,
}

/// Login request; `login` is an email address or a username
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Login is required"))]
    pub login: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    /// `null` clears the name
    #[serde(default, deserialize_with = "double_option")]
    pub full_name: Option<Option<String>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: String,

    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be 8-128 characters"
    ))]
    pub new_password: String,
}

/// Profile plus a fresh token pair
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserProfile,

    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Register a new user
///
/// ```text
/// POST /v1/auth/register
/// { "email": "ada@example.com", "username": "ada", "password": "correct-horse-9" }
/// ```
///
/// # Errors
///
/// - `422`: Validation failed or weak password
/// - `409`: Email or username already taken
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;

    let user = state
        .services
        .users
        .register(NewUser {
            email: req.email,
            username: req.username,
            password: req.password,
            full_name: req.full_name,
        })
        .await?;

    let tokens = state.jwt.issue_pair(user.id)?;
    tracing::info!(user_id = %user.id, "User registered");

    Ok((StatusCode::CREATED, Json(AuthResponse { user, tokens })))
}

/// Login endpoint
///
/// # Errors
///
/// - `401`: Unknown user or wrong password (indistinguishable)
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let user = state
        .services
        .users
        .authenticate(&req.login, &req.password)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid login or password".to_string()))?;

    let tokens = state.jwt.issue_pair(user.id)?;
    Ok(Json(AuthResponse { user, tokens }))
}

/// Token refresh endpoint
///
/// # Errors
///
/// - `401`: Invalid or expired refresh token, or the account no longer exists
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(req): AppJson<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let (user_id, tokens) = state.jwt.refresh(&req.refresh_token)?;

    let user = state.services.users.profile(user_id).await.map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            ApiError::Unauthorized("Account no longer exists".to_string())
        } else {
            e.into()
        }
    })?;

    Ok(Json(AuthResponse { user, tokens }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.services.users.profile(auth.user_id).await?))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<UpdateProfileRequest>,
) -> ApiResult<Json<UserProfile>> {
    let profile = match req.full_name {
        Some(full_name) => {
            state
                .services
                .users
                .update_profile(auth.user_id, full_name)
                .await?
        }
        None => state.services.users.profile(auth.user_id).await?,
    };
    Ok(Json(profile))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(req): AppJson<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    req.validate()?;

    state
        .services
        .users
        .change_password(auth.user_id, &req.current_password, &req.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_validation() {
        let ok = RegisterRequest {
            email: "ada@example.com".to_string(),
            username: "ada".to_string(),
            password: "correct-horse-9".to_string(),
            full_name: None,
        };
        assert!(ok.validate().is_ok());

        let bad = RegisterRequest {
            email: "not-an-email".to_string(),
            username: "a".to_string(),
            password: "short".to_string(),
            full_name: None,
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_login_requires_both_fields() {
        let req = LoginRequest {
            login: String::new(),
            password: String::new(),
        };
        assert_eq!(req.validate().unwrap_err().field_errors().len(), 2);
    }
}
