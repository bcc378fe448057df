pub mod config;
pub mod db;
pub mod error;
pub mod infrastructure;
pub mod mapping;
pub mod naming;
pub mod page;
pub mod query;
pub mod repository;
pub mod sql;

pub use config::{DbConfig, RepositoryConfig};
pub use db::{
    connect, connect_mssql, connect_postgres, connect_sqlite, DataSource, DatabaseRef, DbKind,
    EngineMetadata,
};
pub use error::{RepoError, Result};
pub use infrastructure::counter::{Clock, ManualClock, SystemClock};
pub use infrastructure::generic_repository::GenericRepository;
pub use mapping::{
    FieldMeta, ReadOnlyRowMapper, Record, RecordMapper, RecordSchema, RowMapper, TableDescription,
};
pub use page::{Direction, Order, Page, Pageable, Sort};
pub use query::{Criteria, Expr, FromSqlParam, PlaceholderStyle, Row, SqlParam, ToParam};
pub use repository::{Crud, QueryExecutor, Repository};
pub use sql::{
    Compatibility, DefaultSqlGenerator, LimitOffsetSqlGenerator, Oracle9SqlGenerator,
    Sql2008SqlGenerator, SqlGenerator, SqlGeneratorFactory,
};

pub use rquery_repo_macros::Record; // derive macro
