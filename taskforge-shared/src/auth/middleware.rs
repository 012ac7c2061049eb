/// Bearer-token authentication middleware for Axum
///
/// Validates `Authorization: Bearer <access token>` and inserts an
/// [`AuthContext`] into the request extensions. The context carries only the
/// user id: which organization a request touches is decided per operation
/// from the target entity, never from the token.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use taskforge_shared::auth::jwt::JwtKeys;
/// use taskforge_shared::auth::middleware::{create_jwt_middleware, AuthContext};
///
/// async fn me(Extension(auth): Extension<AuthContext>) -> String {
///     auth.user_id.to_string()
/// }
///
/// let keys = JwtKeys::new("a-secret-of-at-least-thirty-two-bytes!!");
/// let app: Router = Router::new()
///     .route("/me", get(me))
///     .layer(middleware::from_fn(create_jwt_middleware(keys)));
/// ```

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

use super::jwt::{JwtError, JwtKeys, TokenType};

/// Authenticated caller, available to handlers via `Extension<AuthContext>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
}

#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    MissingCredentials,
    InvalidFormat,
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingCredentials => "Missing bearer token".to_string(),
            AuthError::InvalidFormat => "Expected 'Authorization: Bearer <token>'".to_string(),
            AuthError::InvalidToken(msg) => msg,
        };

        let body = Json(json!({
            "error": "unauthorized",
            "message": message,
        }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// Extracts the token from an `Authorization` header value
fn bearer_token(value: &str) -> Result<&str, AuthError> {
    let (scheme, token) = value.split_once(' ').ok_or(AuthError::InvalidFormat)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidFormat);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidFormat);
    }
    Ok(token)
}

/// Validates the access token and adds [`AuthContext`] to the request
pub async fn jwt_auth_middleware(
    keys: JwtKeys,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = bearer_token(header_value)?;

    let claims = keys.validate(token, TokenType::Access).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        match e {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::WrongType { .. } => {
                AuthError::InvalidToken("An access token is required".to_string())
            }
            _ => AuthError::InvalidToken("Invalid token".to_string()),
        }
    })?;

    req.extensions_mut().insert(AuthContext {
        user_id: claims.sub,
    });

    Ok(next.run(req).await)
}

type MiddlewareFuture = Pin<Box<dyn Future<Output = Result<Response, AuthError>> + Send>>;

/// Captures the keys and returns a closure for `axum::middleware::from_fn`
pub fn create_jwt_middleware(keys: JwtKeys) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone {
    move |req, next| {
        let keys = keys.clone();
        Box::pin(jwt_auth_middleware(keys, req, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Ok("abc.def.ghi"));
        assert_eq!(bearer_token("bearer  abc"), Ok("abc"));
        assert_eq!(bearer_token("Basic abc"), Err(AuthError::InvalidFormat));
        assert_eq!(bearer_token("Bearer"), Err(AuthError::InvalidFormat));
        assert_eq!(bearer_token("Bearer   "), Err(AuthError::InvalidFormat));
    }

    #[test]
    fn test_auth_error_is_unauthorized() {
        for err in [
            AuthError::MissingCredentials,
            AuthError::InvalidFormat,
            AuthError::InvalidToken("Token expired".to_string()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }
}
