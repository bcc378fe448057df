use std::sync::Arc;

use serde::Deserialize;

use crate::db::DbKind;
use crate::error::{RepoError, Result};
use crate::infrastructure::counter::{Clock, SystemClock};

/// Connection settings, deserializable from the application's own config.
#[derive(Clone, Debug, Deserialize)]
pub struct DbConfig {
    pub kind: DbKind,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// SQLite file; `None` opens an in-memory database.
    #[serde(default)]
    pub path: Option<String>,
}

fn default_host() -> String {
    "localhost".to_string()
}

impl DbConfig {
    pub fn sqlite(path: Option<&str>) -> Self {
        Self {
            kind: DbKind::Sqlite,
            host: default_host(),
            port: None,
            database: String::new(),
            user: String::new(),
            password: String::new(),
            path: path.map(str::to_string),
        }
    }

    /// Reads `RQUERY_DB_*` variables, loading a `.env` file first when present.
    ///
    /// `RQUERY_DB_KIND` is one of `mssql`, `postgres`, `sqlite`; the rest are
    /// `HOST`, `PORT`, `NAME`, `USER`, `PASSWORD` and `PATH`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let var = |name: &str| std::env::var(format!("RQUERY_DB_{}", name)).ok();

        let kind = match var("KIND").as_deref() {
            Some("mssql") => DbKind::Mssql,
            Some("postgres") => DbKind::Postgres,
            Some("sqlite") | None => DbKind::Sqlite,
            Some(other) => {
                return Err(RepoError::Config(format!(
                    "unknown RQUERY_DB_KIND `{}`",
                    other
                )))
            }
        };
        let port = var("PORT")
            .map(|p| {
                p.parse::<u16>()
                    .map_err(|_| RepoError::Config(format!("invalid RQUERY_DB_PORT `{}`", p)))
            })
            .transpose()?;

        Ok(Self {
            kind,
            host: var("HOST").unwrap_or_else(default_host),
            port,
            database: var("NAME").unwrap_or_default(),
            user: var("USER").unwrap_or_default(),
            password: var("PASSWORD").unwrap_or_default(),
            path: var("PATH"),
        })
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(match self.kind {
            DbKind::Mssql => 1433,
            DbKind::Postgres => 5432,
            DbKind::Sqlite => 0,
        })
    }
}

/// Per-repository tuning.
#[derive(Clone)]
pub struct RepositoryConfig {
    /// How long a cached row count may be adjusted incrementally before a
    /// full recount is forced.
    pub count_staleness: chrono::Duration,
    pub clock: Arc<dyn Clock>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            count_staleness: chrono::Duration::minutes(3),
            clock: Arc::new(SystemClock),
        }
    }
}

impl RepositoryConfig {
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_count_staleness(mut self, staleness: chrono::Duration) -> Self {
        self.count_staleness = staleness;
        self
    }
}

impl std::fmt::Debug for RepositoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryConfig")
            .field("count_staleness", &self.count_staleness)
            .finish_non_exhaustive()
    }
}
