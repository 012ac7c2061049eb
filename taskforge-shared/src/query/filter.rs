/// Typed filter descriptors and their SQL translation
///
/// Each descriptor appends ` AND ...` conditions to a [`QueryBuilder`] whose
/// WHERE clause is already open (the caller scopes the query to a parent
/// entity first). Values are always bound, never interpolated. Multi-value
/// fields OR within themselves through `IN (...)`; distinct fields AND.
///
/// Text search is a case-insensitive substring match. `%`, `_` and `\` in the
/// caller's term are escaped so they match literally (backslash is the
/// Postgres default LIKE escape character).

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::models::task::{TaskPriority, TaskStatus};

/// Escapes LIKE metacharacters so the term matches literally
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// `%term%` with the term escaped
pub fn contains_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term))
}

/// Trimmed search term, or None when blank
fn search_term(term: &Option<String>) -> Option<&str> {
    term.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

/// Appends ` AND column IN ($n, $n+1, ...)` when `values` is non-empty
pub fn push_in_list<'args, T>(qb: &mut QueryBuilder<'args, Postgres>, column: &str, values: &[T])
where
    T: 'args + Clone + Send + sqlx::Encode<'args, Postgres> + sqlx::Type<Postgres>,
{
    if values.is_empty() {
        return;
    }

    qb.push(" AND ").push(column).push(" IN (");
    let mut separated = qb.separated(", ");
    for value in values {
        separated.push_bind(value.clone());
    }
    separated.push_unseparated(")");
}

/// Task list filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub statuses: Vec<TaskStatus>,
    pub priorities: Vec<TaskPriority>,
    pub assignee_ids: Vec<Uuid>,
    /// Inclusive lower bound on `due_date`
    pub due_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `due_date`
    pub due_to: Option<DateTime<Utc>>,
    /// Substring of title or description
    pub search: Option<String>,
}

impl TaskFilter {
    /// Rejects an inverted due-date range
    pub fn validate(&self) -> ServiceResult<()> {
        if let (Some(from), Some(to)) = (self.due_from, self.due_to) {
            if from > to {
                return Err(ServiceError::invalid("due_from must not be after due_to"));
            }
        }
        Ok(())
    }

    pub fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        push_in_list(qb, "t.status", &self.statuses);
        push_in_list(qb, "t.priority", &self.priorities);
        push_in_list(qb, "t.assignee_id", &self.assignee_ids);

        if let Some(from) = self.due_from {
            qb.push(" AND t.due_date >= ").push_bind(from);
        }
        if let Some(to) = self.due_to {
            qb.push(" AND t.due_date <= ").push_bind(to);
        }

        if let Some(term) = search_term(&self.search) {
            let pattern = contains_pattern(term);
            qb.push(" AND (t.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR t.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

/// Project list filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    /// Substring of the project name
    pub name: Option<String>,
    pub created_by: Option<Uuid>,
}

impl ProjectFilter {
    pub fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(term) = search_term(&self.name) {
            qb.push(" AND p.name ILIKE ").push_bind(contains_pattern(term));
        }
        if let Some(creator) = self.created_by {
            qb.push(" AND p.created_by = ").push_bind(creator);
        }
    }
}

/// Organization list filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationFilter {
    /// Substring of the organization name
    pub name: Option<String>,
}

impl OrganizationFilter {
    pub fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(term) = search_term(&self.name) {
            qb.push(" AND o.name ILIKE ").push_bind(contains_pattern(term));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn base() -> QueryBuilder<'static, Postgres> {
        QueryBuilder::new("SELECT t.id FROM tasks t WHERE t.project_id = $1")
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_empty_filter_adds_nothing() {
        let mut qb = base();
        TaskFilter::default().push_conditions(&mut qb);
        assert_eq!(qb.sql(), "SELECT t.id FROM tasks t WHERE t.project_id = $1");
    }

    #[test]
    fn test_multi_value_fields_use_in_lists() {
        let mut qb: QueryBuilder<'static, Postgres> = QueryBuilder::new("SELECT t.id FROM tasks t WHERE TRUE");
        TaskFilter {
            statuses: vec![TaskStatus::Todo, TaskStatus::Review],
            priorities: vec![TaskPriority::Urgent],
            ..Default::default()
        }
        .push_conditions(&mut qb);

        assert_eq!(
            qb.sql(),
            "SELECT t.id FROM tasks t WHERE TRUE AND t.status IN ($1, $2) AND t.priority IN ($3)"
        );
    }

    #[test]
    fn test_due_range_and_search() {
        let mut qb: QueryBuilder<'static, Postgres> = QueryBuilder::new("SELECT t.id FROM tasks t WHERE TRUE");
        TaskFilter {
            due_from: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
            due_to: Some(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()),
            search: Some("  login ".to_string()),
            ..Default::default()
        }
        .push_conditions(&mut qb);

        assert_eq!(
            qb.sql(),
            "SELECT t.id FROM tasks t WHERE TRUE AND t.due_date >= $1 AND t.due_date <= $2 \
             AND (t.title ILIKE $3 OR t.description ILIKE $4)"
        );
    }

    #[test]
    fn test_blank_search_ignored() {
        let mut qb = base();
        TaskFilter {
            search: Some("   ".to_string()),
            ..Default::default()
        }
        .push_conditions(&mut qb);
        assert!(!qb.sql().contains("ILIKE"));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let filter = TaskFilter {
            due_from: Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()),
            due_to: Some(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!(filter.validate().is_err());
        assert!(TaskFilter::default().validate().is_ok());
    }

    #[test]
    fn test_project_filter() {
        let mut qb: QueryBuilder<'static, Postgres> = QueryBuilder::new("SELECT p.id FROM projects p WHERE TRUE");
        ProjectFilter {
            name: Some("web".to_string()),
            created_by: Some(Uuid::nil()),
        }
        .push_conditions(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT p.id FROM projects p WHERE TRUE AND p.name ILIKE $1 AND p.created_by = $2"
        );
    }

    proptest! {
        #[test]
        fn prop_escaped_term_has_no_bare_wildcards(term in ".*") {
            let escaped = escape_like(&term);
            let mut chars = escaped.chars();
            while let Some(ch) = chars.next() {
                if ch == '\\' {
                    let next = chars.next();
                    prop_assert!(matches!(next, Some('%') | Some('_') | Some('\\')));
                } else {
                    prop_assert!(ch != '%' && ch != '_');
                }
            }
        }
    }
}
