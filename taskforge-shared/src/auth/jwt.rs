/// JWT issuance and validation
///
/// Tokens are HS256-signed and carry only the user's identity: organization
/// context is never baked into a token, since every operation resolves the
/// organization from the target entity and checks membership live.
///
/// - **Access token**: 1 hour, presented as `Authorization: Bearer ...`
/// - **Refresh token**: 30 days, exchanged for a new pair
///
/// [`JwtKeys`] derives the encoding/decoding keys once from the secret so
/// request handling doesn't rebuild them.
///
/// # Example
///
/// ```
/// use taskforge_shared::auth::jwt::{JwtKeys, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let keys = JwtKeys::new("a-secret-of-at-least-thirty-two-bytes!!");
/// let user_id = Uuid::new_v4();
///
/// let pair = keys.issue_pair(user_id)?;
/// let claims = keys.validate(&pair.access_token, TokenType::Access)?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const ISSUER: &str = "taskforge";

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Invalid token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Expected {expected} token, got {actual}")]
    WrongType {
        expected: TokenType,
        actual: TokenType,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(1),
            TokenType::Refresh => Duration::days(30),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registered claims plus the token type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub token_type: TokenType,
}

impl Claims {
    pub fn new(user_id: Uuid, token_type: TokenType) -> Self {
        Self::with_expiration(user_id, token_type, token_type.default_expiration())
    }

    pub fn with_expiration(user_id: Uuid, token_type: TokenType, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            token_type,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Access + refresh tokens returned by login, register and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Signing and verification keys derived from one secret
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JwtKeys(..)")
    }
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Signs `claims` with HS256
    pub fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| JwtError::CreateError(e.to_string()))
    }

    /// Verifies signature, expiry, not-before, issuer and token type
    pub fn validate(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::ValidationError(e.to_string()),
            })?
            .claims;

        if claims.token_type != expected {
            return Err(JwtError::WrongType {
                expected,
                actual: claims.token_type,
            });
        }

        Ok(claims)
    }

    /// Issues a fresh access/refresh pair for `user_id`
    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, JwtError> {
        let access = Claims::new(user_id, TokenType::Access);
        let refresh = Claims::new(user_id, TokenType::Refresh);

        Ok(TokenPair {
            access_token: self.sign(&access)?,
            refresh_token: self.sign(&refresh)?,
            token_type: "Bearer".to_string(),
            expires_in: TokenType::Access.default_expiration().num_seconds(),
        })
    }

    /// Exchanges a valid refresh token for a new pair
    pub fn refresh(&self, refresh_token: &str) -> Result<(Uuid, TokenPair), JwtError> {
        let claims = self.validate(refresh_token, TokenType::Refresh)?;
        let pair = self.issue_pair(claims.sub)?;
        Ok((claims.sub, pair))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_claims_defaults() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, TokenType::Access);
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_issue_and_validate_pair() {
        let keys = JwtKeys::new(SECRET);
        let user_id = Uuid::new_v4();
        let pair = keys.issue_pair(user_id).unwrap();

        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 3600);
        assert_eq!(keys.validate(&pair.access_token, TokenType::Access).unwrap().sub, user_id);
        assert_eq!(keys.validate(&pair.refresh_token, TokenType::Refresh).unwrap().sub, user_id);
    }

    #[test]
    fn test_token_type_enforced() {
        let keys = JwtKeys::new(SECRET);
        let pair = keys.issue_pair(Uuid::new_v4()).unwrap();

        assert!(matches!(
            keys.validate(&pair.refresh_token, TokenType::Access),
            Err(JwtError::WrongType { .. })
        ));
        assert!(keys.refresh(&pair.access_token).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let pair = JwtKeys::new(SECRET).issue_pair(Uuid::new_v4()).unwrap();
        let other = JwtKeys::new("another-secret-key-at-least-32-bytes!!");
        assert!(matches!(
            other.validate(&pair.access_token, TokenType::Access),
            Err(JwtError::ValidationError(_))
        ));
    }

    #[test]
    fn test_expired_token() {
        let keys = JwtKeys::new(SECRET);
        let claims = Claims::with_expiration(Uuid::new_v4(), TokenType::Access, Duration::seconds(-3600));
        assert!(claims.is_expired());

        let token = keys.sign(&claims).unwrap();
        assert!(matches!(keys.validate(&token, TokenType::Access), Err(JwtError::Expired)));
    }

    #[test]
    fn test_refresh_issues_new_pair_for_same_user() {
        let keys = JwtKeys::new(SECRET);
        let user_id = Uuid::new_v4();
        let pair = keys.issue_pair(user_id).unwrap();

        let (refreshed_user, new_pair) = keys.refresh(&pair.refresh_token).unwrap();
        assert_eq!(refreshed_user, user_id);
        assert_eq!(keys.validate(&new_pair.access_token, TokenType::Access).unwrap().sub, user_id);
    }

    #[test]
    fn test_garbage_token() {
        let keys = JwtKeys::new(SECRET);
        assert!(keys.validate("not.a.jwt", TokenType::Access).is_err());
    }
}
