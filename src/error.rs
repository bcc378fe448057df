use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the repository engine.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("failed to retrieve database metadata: {0}")]
    MetadataProbe(#[source] BoxError),

    #[error("no compatible SQL generator found")]
    NoCompatibleDialect,

    #[error("no record with id = {{{id}}} exists in table {table}")]
    NoRecordUpdated { table: String, id: String },

    #[error("update `{sql}` affected {actual} rows, expected {expected}")]
    UnexpectedMultiRowUpdate {
        sql: String,
        expected: u64,
        actual: u64,
    },

    #[error("this repository is read-only, it can't create or update entities")]
    UnsupportedWriteOnReadOnly,

    #[error("no record with id = {{{id}}} found in table {table}")]
    NotFound { table: String, id: String },

    #[error("invalid table metadata: {0}")]
    Construction(String),

    #[error("mapping error: {0}")]
    Mapping(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Mssql(#[from] tiberius::error::Error),

    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Tls(#[from] native_tls::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RepoError {
    pub fn metadata_probe(err: impl Into<BoxError>) -> Self {
        RepoError::MetadataProbe(err.into())
    }

    /// Whether the caller can reasonably carry on after this error.
    ///
    /// Missing rows are recoverable; broken metadata, integrity violations and
    /// misuse of read-only repositories are not.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RepoError::NoRecordUpdated { .. } | RepoError::NotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RepoError>;
