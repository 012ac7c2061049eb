/// Pagination contract shared by every list operation
///
/// Normalization rules:
///
/// - `page` defaults to 1 and is floored to 1 when ≤ 0
/// - `limit` defaults to 10, is floored to 1 when < 1 and clamped to 100
/// - `offset = (page - 1) * limit`
/// - `total_pages = ceil(total / limit)`, `has_next_page = page < total_pages`,
///   `has_previous_page = page > 1`
///
/// # Example
///
/// ```
/// use taskforge_shared::query::pagination::{Pagination, Paginated};
///
/// let pagination = Pagination::new(Some(0), Some(500));
/// assert_eq!(pagination.page(), 1);
/// assert_eq!(pagination.limit(), 100);
///
/// let page = Paginated::new(vec!["a", "b"], 102, pagination);
/// assert_eq!(page.total_pages, 2);
/// assert!(page.has_next_page);
/// ```

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Raw paging parameters as supplied by a caller
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Normalized page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: i64,
    limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl Pagination {
    /// Applies the normalization rules to raw parameters
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.unwrap_or(DEFAULT_PAGE).max(1);
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        Self { page, limit }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl From<PageParams> for Pagination {
    fn from(params: PageParams) -> Self {
        Self::new(params.page, params.limit)
    }
}

/// Number of pages needed for `total` rows at `limit` rows per page
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if total <= 0 || limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

/// Page of results plus navigation metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, pagination: Pagination) -> Self {
        let total_pages = total_pages(total, pagination.limit());

        Self {
            data,
            total,
            page: pagination.page(),
            limit: pagination.limit(),
            total_pages,
            has_next_page: pagination.page() < total_pages,
            has_previous_page: pagination.page() > 1,
        }
    }

    /// Converts every item, keeping the metadata
    pub fn map<U, F>(self, f: F) -> Paginated<U>
    where
        F: FnMut(T) -> U,
    {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
            has_next_page: self.has_next_page,
            has_previous_page: self.has_previous_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_defaults() {
        let p = Pagination::new(None, None);
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), 10);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_page_floor() {
        assert_eq!(Pagination::new(Some(0), None).page(), 1);
        assert_eq!(Pagination::new(Some(-7), None).page(), 1);
    }

    #[test]
    fn test_limit_clamp() {
        assert_eq!(Pagination::new(None, Some(0)).limit(), 1);
        assert_eq!(Pagination::new(None, Some(-3)).limit(), 1);
        assert_eq!(Pagination::new(None, Some(500)).limit(), 100);
        assert_eq!(Pagination::new(None, Some(100)).limit(), 100);
    }

    #[test]
    fn test_offset() {
        assert_eq!(Pagination::new(Some(3), Some(20)).offset(), 40);
    }

    #[test]
    fn test_metadata() {
        let page = Paginated::new(vec![1, 2, 3], 23, Pagination::new(Some(3), Some(10)));
        assert_eq!(page.total_pages, 3);
        assert!(!page.has_next_page);
        assert!(page.has_previous_page);

        let empty: Paginated<i32> = Paginated::new(vec![], 0, Pagination::default());
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
        assert!(!empty.has_previous_page);
    }

    #[test]
    fn test_serializes_camel_case() {
        let page = Paginated::new(vec!["x"], 1, Pagination::default());
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["totalPages"], 1);
        assert_eq!(json["hasNextPage"], false);
        assert_eq!(json["hasPreviousPage"], false);
    }

    proptest! {
        #[test]
        fn prop_pages_partition_dataset(n in 0usize..400, limit in -5i64..150) {
            let dataset: Vec<usize> = (0..n).collect();
            let first = Pagination::new(Some(1), Some(limit));
            let pages = total_pages(n as i64, first.limit());

            let mut seen = Vec::new();
            for page in 1..=pages.max(1) {
                let window = Pagination::new(Some(page), Some(limit));
                let start = (window.offset() as usize).min(n);
                let end = (start + window.limit() as usize).min(n);
                let meta = Paginated::new(dataset[start..end].to_vec(), n as i64, window);
                prop_assert_eq!(meta.has_next_page, page < pages);
                seen.extend(meta.data);
            }

            prop_assert_eq!(seen, dataset);
        }

        #[test]
        fn prop_normalized_values_in_range(page in any::<i64>(), limit in any::<i64>()) {
            let p = Pagination::new(Some(page), Some(limit));
            prop_assert!(p.page() >= 1);
            prop_assert!((1..=MAX_LIMIT).contains(&p.limit()));
            prop_assert!(p.offset() >= 0);
        }
    }
}
