/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, token refresh and the caller's profile
/// - `organizations`, `members`: Tenants and their memberships
/// - `projects`, `tasks`, `comments`: The work hierarchy
/// - `custom_properties`: Property definitions and values
///
/// Every handler behind the JWT layer reads the caller from the
/// [`AuthContext`](taskforge_shared::auth::middleware::AuthContext)
/// extension and passes it as the actor to the service.

pub mod auth;
pub mod comments;
pub mod custom_properties;
pub mod health;
pub mod members;
pub mod organizations;
pub mod projects;
pub mod tasks;

use axum::extract::{FromRequest, FromRequestParts};
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use taskforge_shared::query::{Pagination, Sort, SortField};

use crate::error::{ApiError, ApiResult};

/// JSON body whose rejections render as [`ApiError`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// Query string whose rejections render as [`ApiError`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

/// `?page=&limit=&sort=&order=` shared by list endpoints without filters
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl ListParams {
    pub fn window<F: SortField>(&self) -> ApiResult<(Sort<F>, Pagination)> {
        list_window(self.page, self.limit, self.sort.as_deref(), self.order.as_deref())
    }
}

/// Parses the sort against the whitelist of `F` and normalizes the page
pub fn list_window<F: SortField>(
    page: Option<i64>,
    limit: Option<i64>,
    sort: Option<&str>,
    order: Option<&str>,
) -> ApiResult<(Sort<F>, Pagination)> {
    let sort = Sort::parse(sort, order)?;
    Ok((sort, Pagination::new(page, limit)))
}

/// Splits `"a,b,c"` and parses each item
pub fn parse_csv<T>(field: &str, raw: Option<&str>) -> ApiResult<Vec<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<T>()
                .map_err(|e| ApiError::InvalidInput(format!("{}: {}", field, e)))
        })
        .collect()
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in PATCH bodies
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskforge_shared::models::task::TaskStatus;
    use taskforge_shared::query::sort::TaskSortField;
    use uuid::Uuid;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        description: Option<Option<String>>,
    }

    #[test]
    fn test_double_option() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.description, None);

        let cleared: Patch = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));

        let set: Patch = serde_json::from_str(r#"{"description": "x"}"#).unwrap();
        assert_eq!(set.description, Some(Some("x".to_string())));
    }

    #[test]
    fn test_parse_csv() {
        let statuses: Vec<TaskStatus> = parse_csv("status", Some("todo, DONE,")).unwrap();
        assert_eq!(statuses, vec![TaskStatus::Todo, TaskStatus::Done]);

        assert!(parse_csv::<TaskStatus>("status", None).unwrap().is_empty());
        assert!(parse_csv::<TaskStatus>("status", Some("later")).is_err());
        assert!(parse_csv::<Uuid>("assignee", Some("not-a-uuid")).is_err());
    }

    #[test]
    fn test_list_window() {
        let params = ListParams {
            page: Some(0),
            limit: Some(500),
            sort: Some("title".to_string()),
            order: Some("asc".to_string()),
        };
        let (sort, pagination) = params.window::<TaskSortField>().unwrap();
        assert_eq!(sort.field, TaskSortField::Title);
        assert_eq!(pagination.page(), 1);
        assert_eq!(pagination.limit(), 100);

        let bad = ListParams {
            sort: Some("password_hash".to_string()),
            ..ListParams::default()
        };
        assert!(bad.window::<TaskSortField>().is_err());
    }
}
