/// Query and pagination engine
///
/// # Modules
///
/// - `pagination`: page/limit normalization and the [`Paginated`] envelope
/// - `sort`: per-entity sort whitelists
/// - `filter`: typed filter descriptors rendered to bound SQL conditions
///
/// [`fetch_page`] ties them together: the caller supplies the column list
/// and a closure that writes `FROM ... WHERE ...` (scope + filters); the
/// same closure feeds both the `COUNT(*)` query and the data query so the
/// total always matches the rows being paged.

pub mod filter;
pub mod pagination;
pub mod sort;

pub use pagination::{PageParams, Paginated, Pagination};
pub use sort::{Sort, SortDirection, SortField};

use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

/// Runs the count and page queries for one list call
///
/// # Arguments
///
/// * `pool` - Database connection pool
/// * `columns` - Select list, e.g. `"t.id, t.title"`
/// * `from_where` - Writes the FROM clause and every WHERE condition
/// * `sort` - Whitelisted sort field and direction
/// * `pagination` - Normalized page window
///
/// # Errors
///
/// Returns an error if either query fails
pub async fn fetch_page<T, F, W>(
    pool: &PgPool,
    columns: &str,
    from_where: W,
    sort: Sort<F>,
    pagination: Pagination,
) -> Result<Paginated<T>, sqlx::Error>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    F: SortField,
    W: Fn(&mut QueryBuilder<'_, Postgres>),
{
    let mut count_qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT COUNT(*) ");
    from_where(&mut count_qb);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut data_qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT ");
    data_qb.push(columns).push(" ");
    from_where(&mut data_qb);
    data_qb
        .push(" ")
        .push(sort.order_by_clause())
        .push(" LIMIT ")
        .push_bind(pagination.limit())
        .push(" OFFSET ")
        .push_bind(pagination.offset());

    let data = data_qb.build_query_as::<T>().fetch_all(pool).await?;

    tracing::trace!(
        total,
        returned = data.len(),
        page = pagination.page(),
        limit = pagination.limit(),
        "Fetched page"
    );

    Ok(Paginated::new(data, total, pagination))
}
