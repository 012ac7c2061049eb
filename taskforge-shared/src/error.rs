/// Service error taxonomy
///
/// Every service operation fails with exactly one [`ServiceError`] kind.
/// Raw store errors never escape this crate: `From<sqlx::Error>` classifies
/// them by Postgres SQLSTATE and anything unrecognised becomes
/// [`ServiceError::Internal`] with a generic message (the detail is logged).
///
/// # Kinds
///
/// | Kind | Meaning |
/// |------|---------|
/// | `NotFound` | Entity or a link of its ownership chain is absent |
/// | `Forbidden` | Actor resolved but lacks the required role or authorship |
/// | `Conflict` | Uniqueness violation or last-owner removal |
/// | `InvalidInput` | Value fails type-directed validation |
/// | `Internal` | Store failure outside the kinds above |
use std::borrow::Cow;

/// Result alias used by every service operation
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Classified failure returned by repositories and services
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Entity or any link in its ownership chain is absent
    #[error("{0} not found")]
    NotFound(String),

    /// Actor lacks the required role or authorship
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Uniqueness violation or invariant-protecting rejection
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Value failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Store failure that maps to none of the above
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Discriminant of a [`ServiceError`], useful for assertions and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Conflict,
    InvalidInput,
    Internal,
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict(reason.into())
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    /// Returns the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::Forbidden(_) => ErrorKind::Forbidden,
            ServiceError::Conflict(_) => ErrorKind::Conflict,
            ServiceError::InvalidInput(_) => ErrorKind::InvalidInput,
            ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Human-readable message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            ServiceError::NotFound(msg)
            | ServiceError::Forbidden(msg)
            | ServiceError::Conflict(msg)
            | ServiceError::InvalidInput(msg)
            | ServiceError::Internal(msg) => msg,
        }
    }
}

// Postgres SQLSTATE codes we classify
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

/// Maps a unique constraint name to a user-facing conflict message
fn conflict_message(constraint: Option<&str>) -> String {
    match constraint {
        Some("users_email_key") => "Email already registered".to_string(),
        Some("users_username_key") => "Username already taken".to_string(),
        Some("organizations_name_key") => "Organization name already exists".to_string(),
        Some("organizations_slug_key") => "Organization slug already exists".to_string(),
        Some("organization_members_pkey") => "User is already a member".to_string(),
        Some("custom_properties_name_key") => {
            "A custom property with this name already exists".to_string()
        }
        Some("mentions_comment_user_key") => "Duplicate mention".to_string(),
        _ => "Resource already exists".to_string(),
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ServiceError::NotFound("Resource".to_string()),
            sqlx::Error::Database(db_err) => {
                let code: Option<Cow<'_, str>> = db_err.code();
                match code.as_deref() {
                    Some(UNIQUE_VIOLATION) => {
                        ServiceError::Conflict(conflict_message(db_err.constraint()))
                    }
                    Some(FOREIGN_KEY_VIOLATION) => {
                        ServiceError::InvalidInput("Referenced entity does not exist".to_string())
                    }
                    Some(CHECK_VIOLATION) | Some(INVALID_TEXT_REPRESENTATION) => {
                        ServiceError::InvalidInput("Value violates a data constraint".to_string())
                    }
                    _ => {
                        tracing::error!(error = %db_err, "Unclassified database error");
                        ServiceError::Internal("A storage error occurred".to_string())
                    }
                }
            }
            other => {
                tracing::error!(error = %other, "Database failure");
                ServiceError::Internal("A storage error occurred".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(ServiceError::not_found("Task").to_string(), "Task not found");
        assert_eq!(
            ServiceError::forbidden("Not a member").to_string(),
            "Forbidden: Not a member"
        );
        assert_eq!(
            ServiceError::conflict("Duplicate").to_string(),
            "Conflict: Duplicate"
        );
    }

    #[test]
    fn test_kind_and_message() {
        let err = ServiceError::invalid("Assignee is not a member");
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.message(), "Assignee is not a member");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: ServiceError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_other_sqlx_errors_hide_detail() {
        let err: ServiceError = sqlx::Error::Protocol("secret detail".into()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!err.message().contains("secret"));
    }

    #[test]
    fn test_conflict_messages() {
        assert_eq!(conflict_message(Some("organizations_slug_key")), "Organization slug already exists");
        assert_eq!(conflict_message(None), "Resource already exists");
    }
}
