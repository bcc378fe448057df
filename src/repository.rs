use async_trait::async_trait;

use crate::error::Result;
use crate::mapping::Record;
use crate::page::{Page, Pageable, Sort};
use crate::query::{Criteria, SqlParam};

/// Read side of the repository contract.
#[async_trait]
pub trait QueryExecutor<T>
where
    T: Record,
{
    /// Exact row count; also refreshes the cached approximate count.
    async fn count(&self) -> Result<u64>;

    async fn exists(&self, id: SqlParam) -> Result<bool>;

    async fn find_all(&self) -> Result<Vec<T>>;

    /// An empty `ids` returns an empty result without touching the database.
    async fn find_all_by_ids(&self, ids: Vec<SqlParam>) -> Result<Vec<T>>;

    async fn find_all_sorted(&self, sort: Sort) -> Result<Vec<T>>;

    /// The page total comes from the cached approximate count.
    async fn find_page(&self, page: Pageable) -> Result<Page<T>>;

    async fn find_all_where(&self, criteria: Criteria) -> Result<Vec<T>>;

    async fn find_all_where_sorted(&self, criteria: Criteria, sort: Sort) -> Result<Vec<T>>;

    /// The page total is an exact count of the matching rows.
    async fn find_page_where(&self, criteria: Criteria, page: Pageable) -> Result<Page<T>>;

    async fn find_one(&self, id: SqlParam) -> Result<Option<T>>;

    /// Like [`QueryExecutor::find_one`] but a missing row is an error.
    async fn get_one(&self, id: SqlParam) -> Result<T>;
}

/// Write side of the repository contract.
#[async_trait]
pub trait Crud<T>
where
    T: Record,
{
    /// Returns the number of rows removed; a missing row is not an error.
    async fn delete(&self, id: SqlParam) -> Result<u64>;

    /// Inserts records without a key and updates the rest. A generated key is
    /// written back into the returned record.
    async fn save(&self, entity: T) -> Result<T>;

    /// Saves records one at a time. Not transactional: on failure the records
    /// saved before it stay committed and the error is returned.
    async fn save_all(&self, entities: Vec<T>) -> Result<Vec<T>>;

    /// Returns the record's key, generated by the engine when unassigned.
    async fn insert(&self, entity: &T) -> Result<SqlParam>;

    /// Updates exactly one row.
    async fn update(&self, entity: &T) -> Result<u64>;
}

pub trait Repository<T>: QueryExecutor<T> + Crud<T>
where
    T: Record,
{
}
