#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rquery_repo::{
    connect_sqlite, DataSource, DatabaseRef, EngineMetadata, RepoError, Result, Row, SqlParam,
};

/// In-process SQLite connection that records every statement it runs and can
/// report itself as a different engine.
pub struct RecordingSource {
    inner: DatabaseRef,
    metadata: Option<EngineMetadata>,
    rewrite: fn(&str) -> String,
    log: Mutex<Vec<String>>,
}

impl RecordingSource {
    pub fn sqlite() -> anyhow::Result<Self> {
        Ok(Self {
            inner: connect_sqlite(":memory:")?,
            metadata: None,
            rewrite: |sql| sql.to_string(),
            log: Mutex::new(Vec::new()),
        })
    }

    /// Poses as `metadata`, passing each statement through `rewrite` first.
    pub fn posing_as(mut self, metadata: EngineMetadata, rewrite: fn(&str) -> String) -> Self {
        self.metadata = Some(metadata);
        self.rewrite = rewrite;
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn clear_log(&self) {
        self.log.lock().clear();
    }

    pub fn count_statements(&self, needle: &str) -> usize {
        self.log.lock().iter().filter(|s| s.contains(needle)).count()
    }

    fn record(&self, sql: &str) -> String {
        self.log.lock().push(sql.to_string());
        (self.rewrite)(sql)
    }
}

#[async_trait]
impl DataSource for RecordingSource {
    fn description(&self) -> String {
        "recording sqlite".to_string()
    }

    async fn metadata(&self) -> Result<EngineMetadata> {
        match &self.metadata {
            Some(m) => Ok(m.clone()),
            None => self.inner.metadata().await,
        }
    }

    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>> {
        let sql = self.record(sql);
        self.inner.query(&sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        let sql = self.record(sql);
        self.inner.execute(&sql, params).await
    }

    async fn insert_returning_key(
        &self,
        sql: &str,
        params: &[SqlParam],
        key_column: &str,
    ) -> Result<SqlParam> {
        let sql = self.record(sql);
        self.inner.insert_returning_key(&sql, params, key_column).await
    }
}

/// A source that only answers metadata probes.
pub struct MetadataOnly {
    pub answer: std::result::Result<EngineMetadata, String>,
    pub probes: Mutex<usize>,
}

impl MetadataOnly {
    pub fn new(product: &str, major: Option<u32>) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(EngineMetadata::new(product, major)),
            probes: Mutex::new(0),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(message.to_string()),
            probes: Mutex::new(0),
        })
    }

    pub fn probe_count(&self) -> usize {
        *self.probes.lock()
    }
}

#[async_trait]
impl DataSource for MetadataOnly {
    fn description(&self) -> String {
        "metadata only".to_string()
    }

    async fn metadata(&self) -> Result<EngineMetadata> {
        *self.probes.lock() += 1;
        self.answer
            .clone()
            .map_err(|m| RepoError::metadata_probe(m))
    }

    async fn query(&self, _sql: &str, _params: &[SqlParam]) -> Result<Vec<Row>> {
        Ok(Vec::new())
    }

    async fn execute(&self, _sql: &str, _params: &[SqlParam]) -> Result<u64> {
        Ok(0)
    }

    async fn insert_returning_key(
        &self,
        _sql: &str,
        _params: &[SqlParam],
        _key_column: &str,
    ) -> Result<SqlParam> {
        Ok(SqlParam::Null)
    }
}

/// `ROWNUM` does not exist outside Oracle; number the already ordered rows
/// with a window function instead.
pub fn emulate_rownum(sql: &str) -> String {
    sql.replace("ROWNUM AS rn__", "row_number() OVER () AS rn__")
}

/// SQLite has no `OFFSET ... FETCH`; turn a trailing
/// `OFFSET o ROWS FETCH NEXT s ROWS ONLY` into `LIMIT s OFFSET o`.
pub fn emulate_offset_fetch(sql: &str) -> String {
    let Some(at) = sql.rfind(" OFFSET ") else {
        return sql.to_string();
    };
    let tail: Vec<&str> = sql[at..].split_whitespace().collect();
    match tail.as_slice() {
        ["OFFSET", offset, "ROWS", "FETCH", "NEXT", size, "ROWS", "ONLY"] => {
            format!("{} LIMIT {} OFFSET {}", &sql[..at], size, offset)
        }
        _ => sql.to_string(),
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
