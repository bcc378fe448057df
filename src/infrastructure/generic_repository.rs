use std::sync::Arc;

use async_trait::async_trait;

use crate::config::RepositoryConfig;
use crate::db::DataSource;
use crate::error::{RepoError, Result};
use crate::infrastructure::counter::{ApproximateCounter, Clock};
use crate::mapping::{ReadOnlyRowMapper, Record, RecordMapper, RowMapper, TableDescription};
use crate::page::{Page, Pageable, Sort};
use crate::query::{Criteria, SqlParam};
use crate::repository::{Crud, QueryExecutor, Repository};
use crate::sql::{SqlGenerator, SqlGeneratorFactory};

/// Repository for one record type over one connection source.
///
/// Clones share the source, the generator and the cached row count.
pub struct GenericRepository<T>
where
    T: Record,
{
    source: Arc<dyn DataSource>,
    table: Arc<TableDescription>,
    mapper: Arc<dyn RowMapper<T>>,
    generator: Arc<dyn SqlGenerator>,
    counter: Arc<ApproximateCounter>,
    clock: Arc<dyn Clock>,
}

impl<T> GenericRepository<T>
where
    T: Record,
{
    pub async fn new(source: Arc<dyn DataSource>, factory: &SqlGeneratorFactory) -> Result<Self> {
        Self::with_mapper(source, factory, Arc::new(RecordMapper::<T>::new())).await
    }

    /// A repository whose writes fail with [`RepoError::UnsupportedWriteOnReadOnly`].
    pub async fn read_only(
        source: Arc<dyn DataSource>,
        factory: &SqlGeneratorFactory,
    ) -> Result<Self> {
        Self::with_mapper(source, factory, Arc::new(ReadOnlyRowMapper::<T>::new())).await
    }

    pub async fn with_mapper(
        source: Arc<dyn DataSource>,
        factory: &SqlGeneratorFactory,
        mapper: Arc<dyn RowMapper<T>>,
    ) -> Result<Self> {
        let table = TableDescription::for_record::<T>()?;
        Self::from_parts(source, factory, table, mapper, RepositoryConfig::default()).await
    }

    pub async fn from_parts(
        source: Arc<dyn DataSource>,
        factory: &SqlGeneratorFactory,
        table: TableDescription,
        mapper: Arc<dyn RowMapper<T>>,
        config: RepositoryConfig,
    ) -> Result<Self> {
        let generator = factory.get_generator(&source).await?;
        let counter = ApproximateCounter::new(config.count_staleness, config.clock.now());
        tracing::debug!(
            table = table.table_name(),
            generator = generator.name(),
            "repository ready"
        );
        Ok(Self {
            source,
            table: Arc::new(table),
            mapper,
            generator,
            counter: Arc::new(counter),
            clock: config.clock,
        })
    }

    pub fn table(&self) -> &TableDescription {
        &self.table
    }

    pub fn generator_name(&self) -> &'static str {
        self.generator.name()
    }

    /// Last known row count, however old; `None` before the first count.
    pub fn cached_count(&self) -> Option<u64> {
        self.counter.peek().map(|n| n as u64)
    }

    async fn query_mapped(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<T>> {
        let rows = self.source.query(sql, params).await?;
        rows.iter().map(|row| self.mapper.map_row(row)).collect()
    }

    async fn query_count(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        let rows = self.source.query(sql, params).await?;
        let row = rows
            .first()
            .ok_or_else(|| RepoError::Mapping(format!("`{}` returned no rows", sql)))?;
        let count: i64 = row.get_index(0)?;
        Ok(count.max(0) as u64)
    }

    async fn refresh_count(&self) -> Result<u64> {
        let sql = self.generator.count(&self.table);
        let count = self.query_count(&sql, &[]).await?;
        self.counter.reset(count as i64, self.clock.now());
        Ok(count)
    }

    async fn approximate_count(&self) -> Result<u64> {
        match self.counter.get(self.clock.now()) {
            Some(count) => Ok(count as u64),
            None => self.refresh_count().await,
        }
    }

    /// Applies a local change to the cached count, recounting when the cache
    /// is unknown or stale.
    async fn adjust_count(&self, delta: i64) -> Result<()> {
        if !self.counter.adjust_if_fresh(delta, self.clock.now()) {
            self.refresh_count().await?;
        }
        Ok(())
    }

    /// Sort properties are spliced into ORDER BY, so only known columns pass.
    fn check_sort(&self, sort: &Sort) -> Result<()> {
        match sort.orders.iter().find(|o| !self.table.has_column(&o.property)) {
            Some(order) => Err(RepoError::Mapping(format!(
                "unknown sort column `{}` for table {}",
                order.property,
                self.table.table_name()
            ))),
            None => Ok(()),
        }
    }

    fn write_values(&self, entity: &T) -> Result<Vec<SqlParam>> {
        self.mapper.columns_values(entity, self.table.columns())
    }
}

impl<T> Clone for GenericRepository<T>
where
    T: Record,
{
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            table: self.table.clone(),
            mapper: self.mapper.clone(),
            generator: self.generator.clone(),
            counter: self.counter.clone(),
            clock: self.clock.clone(),
        }
    }
}

#[async_trait]
impl<T> QueryExecutor<T> for GenericRepository<T>
where
    T: Record,
{
    async fn count(&self) -> Result<u64> {
        self.refresh_count().await
    }

    async fn exists(&self, id: SqlParam) -> Result<bool> {
        let sql = self.generator.exists_by_pk(&self.table);
        let rows = self.source.query(&sql, &[id]).await?;
        Ok(!rows.is_empty())
    }

    async fn find_all(&self) -> Result<Vec<T>> {
        let sql = self.generator.select_all(&self.table);
        self.query_mapped(&sql, &[]).await
    }

    async fn find_all_by_ids(&self, ids: Vec<SqlParam>) -> Result<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = self.generator.select_by_pks(&self.table, ids.len());
        self.query_mapped(&sql, &ids).await
    }

    async fn find_all_sorted(&self, sort: Sort) -> Result<Vec<T>> {
        self.check_sort(&sort)?;
        let sql = self.generator.select_all_sorted(&self.table, &sort);
        self.query_mapped(&sql, &[]).await
    }

    async fn find_page(&self, page: Pageable) -> Result<Page<T>> {
        self.check_sort(&page.sort)?;
        let total = self.approximate_count().await?;
        let sql = self.generator.select_page(&self.table, &page);
        let content = self.query_mapped(&sql, &[]).await?;
        Ok(Page::new(content, &page, total))
    }

    async fn find_all_where(&self, criteria: Criteria) -> Result<Vec<T>> {
        let sql = self.generator.select_all_where(&self.table, &criteria.clause);
        self.query_mapped(&sql, &criteria.params).await
    }

    async fn find_all_where_sorted(&self, criteria: Criteria, sort: Sort) -> Result<Vec<T>> {
        self.check_sort(&sort)?;
        let sql = self
            .generator
            .select_all_where_sorted(&self.table, &criteria.clause, &sort);
        self.query_mapped(&sql, &criteria.params).await
    }

    async fn find_page_where(&self, criteria: Criteria, page: Pageable) -> Result<Page<T>> {
        self.check_sort(&page.sort)?;
        let count_sql = self.generator.count_where(&self.table, &criteria.clause);
        let total = self.query_count(&count_sql, &criteria.params).await?;
        let sql = self
            .generator
            .select_page_where(&self.table, &criteria.clause, &page);
        let content = self.query_mapped(&sql, &criteria.params).await?;
        Ok(Page::new(content, &page, total))
    }

    async fn find_one(&self, id: SqlParam) -> Result<Option<T>> {
        let sql = self.generator.select_by_pk(&self.table);
        let rows = self.source.query(&sql, &[id]).await?;
        rows.first().map(|row| self.mapper.map_row(row)).transpose()
    }

    async fn get_one(&self, id: SqlParam) -> Result<T> {
        let key = id.to_string();
        self.find_one(id).await?.ok_or_else(|| RepoError::NotFound {
            table: self.table.table_name().to_string(),
            id: key,
        })
    }
}

#[async_trait]
impl<T> Crud<T> for GenericRepository<T>
where
    T: Record,
{
    async fn delete(&self, id: SqlParam) -> Result<u64> {
        let sql = self.generator.delete_by_pk(&self.table);
        let affected = self.source.execute(&sql, &[id]).await?;
        self.adjust_count(-(affected as i64)).await?;
        Ok(affected)
    }

    async fn save(&self, mut entity: T) -> Result<T> {
        if entity.id().is_unassigned() {
            let key = self.insert(&entity).await?;
            entity.set_id(key)?;
        } else {
            self.update(&entity).await?;
        }
        Ok(entity)
    }

    async fn save_all(&self, entities: Vec<T>) -> Result<Vec<T>> {
        let mut saved = Vec::with_capacity(entities.len());
        for entity in entities {
            saved.push(self.save(entity).await?);
        }
        Ok(saved)
    }

    async fn insert(&self, entity: &T) -> Result<SqlParam> {
        let values = self.write_values(entity)?;
        let id = entity.id();
        let key = if id.is_unassigned() {
            let sql = self.generator.insert(&self.table, true);
            self.source
                .insert_returning_key(&sql, &values, self.table.id_column())
                .await?
        } else {
            let sql = self.generator.insert(&self.table, false);
            let mut params = Vec::with_capacity(values.len() + 1);
            params.push(id.clone());
            params.extend(values);
            self.source.execute(&sql, &params).await?;
            id
        };
        self.adjust_count(1).await?;
        Ok(key)
    }

    async fn update(&self, entity: &T) -> Result<u64> {
        let mut params = self.write_values(entity)?;
        let id = entity.id();
        params.push(id.clone());
        let sql = self.generator.update(&self.table);
        match self.source.execute(&sql, &params).await? {
            1 => Ok(1),
            0 => Err(RepoError::NoRecordUpdated {
                table: self.table.table_name().to_string(),
                id: id.to_string(),
            }),
            actual => Err(RepoError::UnexpectedMultiRowUpdate {
                sql,
                expected: 1,
                actual,
            }),
        }
    }
}

impl<T> Repository<T> for GenericRepository<T> where T: Record {}
