use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_postgres::NoTls;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::config::DbConfig;
use crate::error::{RepoError, Result};
use crate::query::{PlaceholderStyle, Row, SqlParam};

/// What a connection reports about its engine; the only input to dialect selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineMetadata {
    pub product_name: String,
    /// `None` when the engine answered but its version could not be read.
    pub major_version: Option<u32>,
}

impl EngineMetadata {
    pub fn new(product_name: impl Into<String>, major_version: Option<u32>) -> Self {
        Self {
            product_name: product_name.into(),
            major_version,
        }
    }
}

/// A relational connection source the repository executes against.
///
/// SQL handed to these methods uses `?` markers; implementations rewrite them
/// into their engine's placeholder style.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Human readable label for logs.
    fn description(&self) -> String;

    async fn metadata(&self) -> Result<EngineMetadata>;

    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>>;

    /// Runs a statement and returns the affected row count.
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64>;

    /// Runs an INSERT and returns the key the engine generated for `key_column`.
    async fn insert_returning_key(
        &self,
        sql: &str,
        params: &[SqlParam],
        key_column: &str,
    ) -> Result<SqlParam>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbKind {
    Mssql,
    Postgres,
    Sqlite,
}

impl DbKind {
    pub fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            DbKind::Mssql => PlaceholderStyle::AtP,
            DbKind::Postgres => PlaceholderStyle::Dollar,
            DbKind::Sqlite => PlaceholderStyle::Question,
        }
    }
}

pub enum DatabaseRef {
    Mssql(Arc<Mutex<tiberius::Client<Compat<TcpStream>>>>),
    Postgres(Arc<tokio_postgres::Client>),
    Sqlite(Arc<parking_lot::Mutex<rusqlite::Connection>>),
}

impl DatabaseRef {
    pub fn kind(&self) -> DbKind {
        match self {
            DatabaseRef::Mssql(_) => DbKind::Mssql,
            DatabaseRef::Postgres(_) => DbKind::Postgres,
            DatabaseRef::Sqlite(_) => DbKind::Sqlite,
        }
    }

    /// Shares this connection as a repository source.
    pub fn into_source(self) -> Arc<dyn DataSource> {
        Arc::new(self)
    }
}

pub async fn connect(config: &DbConfig) -> Result<DatabaseRef> {
    match config.kind {
        DbKind::Mssql => {
            connect_mssql(
                &config.host,
                config.port_or_default(),
                &config.database,
                &config.user,
                &config.password,
            )
            .await
        }
        DbKind::Postgres => {
            connect_postgres(
                &config.host,
                config.port_or_default(),
                &config.database,
                &config.user,
                &config.password,
            )
            .await
        }
        DbKind::Sqlite => connect_sqlite(config.path.as_deref().unwrap_or(":memory:")),
    }
}

pub async fn connect_mssql(
    host: &str,
    port: u16,
    db: &str,
    user: &str,
    pass: &str,
) -> Result<DatabaseRef> {
    let mut config = tiberius::Config::new();
    config.host(host);
    config.port(port);
    config.database(db);
    config.authentication(tiberius::AuthMethod::sql_server(user, pass));
    config.trust_cert();

    let tcp = TcpStream::connect((host, port)).await?;
    tcp.set_nodelay(true)?;
    let client = tiberius::Client::connect(config, tcp.compat_write()).await?;
    tracing::info!(host, port, db, "connected to SQL Server");
    Ok(DatabaseRef::Mssql(Arc::new(Mutex::new(client))))
}

pub async fn connect_postgres(
    host: &str,
    port: u16,
    db: &str,
    user: &str,
    pass: &str,
) -> Result<DatabaseRef> {
    let base = format!(
        "host={} port={} dbname={} user={} password={}",
        host, port, db, user, pass
    );

    let builder = TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()?;
    let connector = MakeTlsConnector::new(builder);
    let tls_config = format!("{} sslmode=require", base);

    let client = match tokio_postgres::connect(&tls_config, connector).await {
        Ok((client, connection)) => {
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::warn!(error = %e, "postgres connection error");
                }
            });
            client
        }
        Err(e) if e.to_string().contains("server does not support TLS") => {
            let plain_config = format!("{} sslmode=disable", base);
            let (client, connection) = tokio_postgres::connect(&plain_config, NoTls).await?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::warn!(error = %e, "postgres connection error");
                }
            });
            client
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!(host, port, db, "connected to PostgreSQL");
    Ok(DatabaseRef::Postgres(Arc::new(client)))
}

/// Opens an in-process SQLite database; `":memory:"` gives a private one.
pub fn connect_sqlite(path: &str) -> Result<DatabaseRef> {
    let conn = if path == ":memory:" {
        rusqlite::Connection::open_in_memory()?
    } else {
        rusqlite::Connection::open(path)?
    };
    conn.pragma_update(None, "foreign_keys", "ON")?;
    tracing::info!(path, "opened SQLite database");
    Ok(DatabaseRef::Sqlite(Arc::new(parking_lot::Mutex::new(conn))))
}

#[async_trait]
impl DataSource for DatabaseRef {
    fn description(&self) -> String {
        match self {
            DatabaseRef::Mssql(_) => "mssql".to_string(),
            DatabaseRef::Postgres(_) => "postgres".to_string(),
            DatabaseRef::Sqlite(_) => "sqlite".to_string(),
        }
    }

    async fn metadata(&self) -> Result<EngineMetadata> {
        match self {
            DatabaseRef::Mssql(_) => {
                let rows = self
                    .query(
                        "SELECT CAST(SERVERPROPERTY('ProductVersion') AS NVARCHAR(128)) AS version",
                        &[],
                    )
                    .await
                    .map_err(RepoError::metadata_probe)?;
                let major = rows
                    .first()
                    .and_then(|r| r.get::<String>("version").ok())
                    .and_then(|v| v.split('.').next().and_then(|m| m.parse().ok()));
                Ok(EngineMetadata::new("Microsoft SQL Server", major))
            }
            DatabaseRef::Postgres(_) => {
                let rows = self
                    .query(
                        "SELECT current_setting('server_version_num') AS version",
                        &[],
                    )
                    .await
                    .map_err(RepoError::metadata_probe)?;
                let major = rows
                    .first()
                    .and_then(|r| r.get::<String>("version").ok())
                    .and_then(|v| v.parse::<u32>().ok())
                    .map(|num| num / 10_000);
                Ok(EngineMetadata::new("PostgreSQL", major))
            }
            DatabaseRef::Sqlite(_) => Ok(EngineMetadata::new(
                "SQLite",
                u32::try_from(rusqlite::version_number() / 1_000_000).ok(),
            )),
        }
    }

    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>> {
        let sql = self.kind().placeholder_style().apply(sql);
        tracing::debug!(%sql, params = params.len(), "query");
        match self {
            DatabaseRef::Mssql(conn) => {
                let mut guard = conn.lock().await;
                let mut stream = mssql::bind(&sql, params).query(&mut *guard).await?;
                let mut out = Vec::new();
                while let Some(item) = stream.try_next().await? {
                    if let Some(row) = item.into_row() {
                        out.push(mssql::to_row(&row)?);
                    }
                }
                Ok(out)
            }
            DatabaseRef::Postgres(pg) => {
                let boxed = postgres::bind(params);
                let refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
                    boxed.iter().map(|b| &**b as _).collect();
                let rows = pg.query(sql.as_str(), &refs[..]).await?;
                rows.iter().map(postgres::to_row).collect()
            }
            DatabaseRef::Sqlite(conn) => {
                let conn = conn.lock();
                let mut stmt = conn.prepare(&sql)?;
                let columns: Arc<[String]> = stmt
                    .column_names()
                    .into_iter()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
                    .into();
                let mut rows = stmt.query(rusqlite::params_from_iter(sqlite::bind(params)))?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(sqlite::to_row(row, columns.clone())?);
                }
                Ok(out)
            }
        }
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        let sql = self.kind().placeholder_style().apply(sql);
        tracing::debug!(%sql, params = params.len(), "execute");
        match self {
            DatabaseRef::Mssql(conn) => {
                let mut guard = conn.lock().await;
                let res = mssql::bind(&sql, params).execute(&mut *guard).await?;
                Ok(res.total())
            }
            DatabaseRef::Postgres(pg) => {
                let boxed = postgres::bind(params);
                let refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
                    boxed.iter().map(|b| &**b as _).collect();
                Ok(pg.execute(sql.as_str(), &refs[..]).await?)
            }
            DatabaseRef::Sqlite(conn) => {
                let conn = conn.lock();
                let affected =
                    conn.execute(&sql, rusqlite::params_from_iter(sqlite::bind(params)))?;
                Ok(affected as u64)
            }
        }
    }

    async fn insert_returning_key(
        &self,
        sql: &str,
        params: &[SqlParam],
        key_column: &str,
    ) -> Result<SqlParam> {
        let missing_key = || RepoError::Mapping(format!("no generated key for `{}`", key_column));
        match self {
            DatabaseRef::Mssql(_) => {
                let batch = format!(
                    "{}; SELECT CAST(SCOPE_IDENTITY() AS BIGINT) AS {}",
                    sql, key_column
                );
                let rows = self.query(&batch, params).await?;
                let row = rows.first().ok_or_else(missing_key)?;
                row.get_index::<SqlParam>(0)
            }
            DatabaseRef::Postgres(_) => {
                let returning = format!("{} RETURNING {}", sql, key_column);
                let rows = self.query(&returning, params).await?;
                let row = rows.first().ok_or_else(missing_key)?;
                row.get_index::<SqlParam>(0)
            }
            DatabaseRef::Sqlite(conn) => {
                tracing::debug!(%sql, params = params.len(), "insert");
                let conn = conn.lock();
                conn.execute(sql, rusqlite::params_from_iter(sqlite::bind(params)))?;
                Ok(SqlParam::I64(conn.last_insert_rowid()))
            }
        }
    }
}

mod mssql {
    use std::sync::Arc;

    use tiberius::{ColumnData, FromSql, Query};

    use crate::error::{RepoError, Result};
    use crate::query::{Row, SqlParam};

    /// Builds an owned query so no borrowed `dyn ToSql` is held across awaits.
    pub(super) fn bind<'a>(sql: &'a str, params: &[SqlParam]) -> Query<'a> {
        let mut query = Query::new(sql);
        for p in params {
            match p {
                SqlParam::I32(v) => query.bind(*v),
                SqlParam::I64(v) => query.bind(*v),
                SqlParam::F64(v) => query.bind(*v),
                SqlParam::Bool(v) => query.bind(*v),
                SqlParam::Text(v) => query.bind(v.clone()),
                SqlParam::Uuid(v) => query.bind(*v),
                SqlParam::Decimal(v) => query.bind(v.to_string()),
                SqlParam::DateTime(v) => query.bind(*v),
                SqlParam::Bytes(v) => query.bind(v.clone()),
                SqlParam::Null => query.bind(Option::<i32>::None),
            }
        }
        query
    }

    pub(super) fn to_row(row: &tiberius::Row) -> Result<Row> {
        let columns: Arc<[String]> = row
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect::<Vec<_>>()
            .into();
        let mut values = Vec::with_capacity(columns.len());
        for (_, data) in row.cells() {
            values.push(to_param(data)?);
        }
        Ok(Row::new(columns, values))
    }

    pub(super) fn to_param(data: &ColumnData<'static>) -> Result<SqlParam> {
        let value = match data {
            ColumnData::U8(v) => v.map(|v| SqlParam::I32(v.into())),
            ColumnData::I16(v) => v.map(|v| SqlParam::I32(v.into())),
            ColumnData::I32(v) => v.map(SqlParam::I32),
            ColumnData::I64(v) => v.map(SqlParam::I64),
            ColumnData::F32(v) => v.map(|v| SqlParam::F64(v.into())),
            ColumnData::F64(v) => v.map(SqlParam::F64),
            ColumnData::Bit(v) => v.map(SqlParam::Bool),
            ColumnData::String(v) => v.as_ref().map(|s| SqlParam::Text(s.to_string())),
            ColumnData::Guid(v) => v.map(SqlParam::Uuid),
            ColumnData::Binary(v) => v.as_ref().map(|b| SqlParam::Bytes(b.to_vec())),
            ColumnData::Numeric(v) => v.as_ref().map(|n| {
                SqlParam::Decimal(rust_decimal::Decimal::from_i128_with_scale(
                    n.value(),
                    u32::from(n.scale()),
                ))
            }),
            ColumnData::DateTime(_)
            | ColumnData::SmallDateTime(_)
            | ColumnData::DateTime2(_) => {
                chrono::NaiveDateTime::from_sql(data)?.map(SqlParam::DateTime)
            }
            ColumnData::Date(_) => chrono::NaiveDate::from_sql(data)?
                .map(|d| SqlParam::DateTime(d.and_time(chrono::NaiveTime::MIN))),
            ColumnData::Time(_) => chrono::NaiveTime::from_sql(data)?
                .map(|t| SqlParam::Text(t.format("%H:%M:%S%.f").to_string())),
            ColumnData::DateTimeOffset(_) => chrono::DateTime::<chrono::Utc>::from_sql(data)?
                .map(|dt| SqlParam::DateTime(dt.naive_utc())),
            other => {
                return Err(RepoError::Mapping(format!(
                    "unsupported SQL Server column type `{:?}`",
                    other
                )))
            }
        };
        Ok(value.unwrap_or(SqlParam::Null))
    }
}

mod postgres {
    use std::sync::Arc;

    use bytes::BytesMut;
    use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};

    use crate::error::{RepoError, Result};
    use crate::query::{Row, SqlParam};

    /// NULL that binds to a parameter of any type.
    #[derive(Debug)]
    struct AnyNull;

    impl ToSql for AnyNull {
        fn to_sql(
            &self,
            _ty: &Type,
            _out: &mut BytesMut,
        ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
            Ok(IsNull::Yes)
        }

        fn accepts(_ty: &Type) -> bool {
            true
        }

        to_sql_checked!();
    }

    pub(super) fn bind(params: &[SqlParam]) -> Vec<Box<dyn ToSql + Send + Sync>> {
        params
            .iter()
            .map(|p| -> Box<dyn ToSql + Send + Sync> {
                match p {
                    SqlParam::I32(v) => Box::new(*v),
                    SqlParam::I64(v) => Box::new(*v),
                    SqlParam::F64(v) => Box::new(*v),
                    SqlParam::Bool(v) => Box::new(*v),
                    SqlParam::Text(v) => Box::new(v.clone()),
                    SqlParam::Uuid(v) => Box::new(*v),
                    SqlParam::Decimal(v) => Box::new(*v),
                    SqlParam::DateTime(v) => Box::new(*v),
                    SqlParam::Bytes(v) => Box::new(v.clone()),
                    SqlParam::Null => Box::new(AnyNull),
                }
            })
            .collect()
    }

    pub(super) fn to_row(row: &tokio_postgres::Row) -> Result<Row> {
        let columns: Arc<[String]> = row
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect::<Vec<_>>()
            .into();
        let mut values = Vec::with_capacity(columns.len());
        for (idx, column) in row.columns().iter().enumerate() {
            let ty = column.type_();
            let value = if *ty == Type::INT2 {
                row.try_get::<_, Option<i16>>(idx)?
                    .map(|v| SqlParam::I32(v.into()))
            } else if *ty == Type::INT4 {
                row.try_get::<_, Option<i32>>(idx)?.map(SqlParam::I32)
            } else if *ty == Type::INT8 {
                row.try_get::<_, Option<i64>>(idx)?.map(SqlParam::I64)
            } else if *ty == Type::FLOAT4 {
                row.try_get::<_, Option<f32>>(idx)?
                    .map(|v| SqlParam::F64(v.into()))
            } else if *ty == Type::FLOAT8 {
                row.try_get::<_, Option<f64>>(idx)?.map(SqlParam::F64)
            } else if *ty == Type::BOOL {
                row.try_get::<_, Option<bool>>(idx)?.map(SqlParam::Bool)
            } else if *ty == Type::TEXT
                || *ty == Type::VARCHAR
                || *ty == Type::BPCHAR
                || *ty == Type::NAME
            {
                row.try_get::<_, Option<String>>(idx)?.map(SqlParam::Text)
            } else if *ty == Type::UUID {
                row.try_get::<_, Option<uuid::Uuid>>(idx)?
                    .map(SqlParam::Uuid)
            } else if *ty == Type::NUMERIC {
                row.try_get::<_, Option<rust_decimal::Decimal>>(idx)?
                    .map(SqlParam::Decimal)
            } else if *ty == Type::TIMESTAMP {
                row.try_get::<_, Option<chrono::NaiveDateTime>>(idx)?
                    .map(SqlParam::DateTime)
            } else if *ty == Type::BYTEA {
                row.try_get::<_, Option<Vec<u8>>>(idx)?
                    .map(SqlParam::Bytes)
            } else {
                return Err(RepoError::Mapping(format!(
                    "unsupported PostgreSQL type `{}` for column `{}`",
                    ty,
                    column.name()
                )));
            };
            values.push(value.unwrap_or(SqlParam::Null));
        }
        Ok(Row::new(columns, values))
    }
}

mod sqlite {
    use std::sync::Arc;

    use rusqlite::types::{Value, ValueRef};

    use crate::error::Result;
    use crate::query::{Row, SqlParam};

    pub(super) fn bind(params: &[SqlParam]) -> Vec<Value> {
        params
            .iter()
            .map(|p| match p {
                SqlParam::I32(v) => Value::Integer((*v).into()),
                SqlParam::I64(v) => Value::Integer(*v),
                SqlParam::F64(v) => Value::Real(*v),
                SqlParam::Bool(v) => Value::Integer((*v).into()),
                SqlParam::Text(v) => Value::Text(v.clone()),
                SqlParam::Uuid(v) => Value::Text(v.to_string()),
                SqlParam::Decimal(v) => Value::Text(v.to_string()),
                SqlParam::DateTime(v) => Value::Text(v.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
                SqlParam::Bytes(v) => Value::Blob(v.clone()),
                SqlParam::Null => Value::Null,
            })
            .collect()
    }

    pub(super) fn to_row(row: &rusqlite::Row<'_>, columns: Arc<[String]>) -> Result<Row> {
        let mut values = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            let value = match row.get_ref(idx)? {
                ValueRef::Null => SqlParam::Null,
                ValueRef::Integer(v) => SqlParam::I64(v),
                ValueRef::Real(v) => SqlParam::F64(v),
                ValueRef::Text(v) => SqlParam::Text(String::from_utf8_lossy(v).into_owned()),
                ValueRef::Blob(v) => SqlParam::Bytes(v.to_vec()),
            };
            values.push(value);
        }
        Ok(Row::new(columns, values))
    }
}
