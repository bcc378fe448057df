mod common;

use std::sync::Arc;

use common::MetadataOnly;
use rquery_repo::{
    Compatibility, DataSource, EngineMetadata, RepoError, SqlGenerator, SqlGeneratorFactory,
};

fn pick(product: &str, major: Option<u32>) -> &'static str {
    SqlGeneratorFactory::new()
        .select(&EngineMetadata::new(product, major))
        .unwrap()
        .name()
}

#[test]
fn registry_probes_specific_dialects_first() {
    assert_eq!(
        SqlGeneratorFactory::new().generator_names(),
        vec![
            "Sql2008SqlGenerator",
            "LimitOffsetSqlGenerator",
            "Oracle9SqlGenerator",
            "DefaultSqlGenerator",
        ]
    );
}

#[test]
fn selection_by_product_and_version() {
    assert_eq!(pick("PostgreSQL", Some(15)), "LimitOffsetSqlGenerator");
    assert_eq!(pick("MySQL", Some(8)), "LimitOffsetSqlGenerator");
    assert_eq!(pick("SQLite", Some(3)), "LimitOffsetSqlGenerator");
    assert_eq!(pick("Microsoft SQL Server", Some(16)), "Sql2008SqlGenerator");
    assert_eq!(pick("Microsoft SQL Server", Some(10)), "DefaultSqlGenerator");
    assert_eq!(pick("Apache Derby", None), "Sql2008SqlGenerator");
    assert_eq!(pick("Oracle", Some(19)), "Sql2008SqlGenerator");
    assert_eq!(pick("Oracle", Some(11)), "Oracle9SqlGenerator");
    assert_eq!(pick("Oracle", Some(9)), "Oracle9SqlGenerator");
    assert_eq!(pick("Informix", Some(14)), "DefaultSqlGenerator");
}

#[test]
fn selection_is_deterministic() {
    for _ in 0..3 {
        assert_eq!(pick("PostgreSQL", Some(12)), "LimitOffsetSqlGenerator");
        assert_eq!(pick("Oracle", Some(10)), "Oracle9SqlGenerator");
    }
}

#[test]
fn unknown_version_skips_version_gated_dialect() {
    // Sql2008 cannot decide without a version, so the probe fails and the
    // next candidate is tried.
    assert_eq!(
        rquery_repo::Sql2008SqlGenerator
            .is_compatible(&EngineMetadata::new("Microsoft SQL Server", None)),
        Compatibility::ProbeFailed("major version of Microsoft SQL Server is unavailable".into())
    );
    assert_eq!(pick("Microsoft SQL Server", None), "DefaultSqlGenerator");
    assert_eq!(pick("Oracle", None), "Oracle9SqlGenerator");
}

struct AcceptsAll(&'static str);

impl SqlGenerator for AcceptsAll {
    fn name(&self) -> &'static str {
        self.0
    }

    fn is_compatible(&self, _metadata: &EngineMetadata) -> Compatibility {
        Compatibility::Compatible
    }
}

#[test]
fn latest_registration_wins() {
    let factory = SqlGeneratorFactory::new();
    factory.register_generator(Arc::new(AcceptsAll("Custom")));
    assert_eq!(factory.generator_names()[0], "Custom");
    assert_eq!(
        factory
            .select(&EngineMetadata::new("PostgreSQL", Some(15)))
            .unwrap()
            .name(),
        "Custom"
    );
}

#[test]
fn empty_registry_has_no_dialect() {
    let factory = SqlGeneratorFactory::empty();
    let err = factory
        .select(&EngineMetadata::new("PostgreSQL", Some(15)))
        .err()
        .unwrap();
    assert!(matches!(err, RepoError::NoCompatibleDialect));
    assert!(err.is_fatal());

    let factory = SqlGeneratorFactory::new();
    factory.clear();
    assert!(factory.generator_names().is_empty());
}

#[tokio::test]
async fn generator_is_cached_per_source() {
    let factory = SqlGeneratorFactory::new();
    let pg = MetadataOnly::new("PostgreSQL", Some(16));
    let source: Arc<dyn DataSource> = pg.clone();

    let first = factory.get_generator(&source).await.unwrap();
    let second = factory.get_generator(&source).await.unwrap();
    assert_eq!(first.name(), "LimitOffsetSqlGenerator");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(pg.probe_count(), 1);

    let mssql = MetadataOnly::new("Microsoft SQL Server", Some(15));
    let other: Arc<dyn DataSource> = mssql.clone();
    assert_eq!(
        factory.get_generator(&other).await.unwrap().name(),
        "Sql2008SqlGenerator"
    );
    assert_eq!(factory.cached_sources(), 2);
}

#[tokio::test]
async fn cache_does_not_keep_sources_alive() {
    let factory = SqlGeneratorFactory::new();
    {
        let source: Arc<dyn DataSource> = MetadataOnly::new("PostgreSQL", Some(16));
        factory.get_generator(&source).await.unwrap();
        assert_eq!(factory.cached_sources(), 1);
    }
    assert_eq!(factory.cached_sources(), 0);
}

#[tokio::test]
async fn metadata_failure_is_fatal() {
    let factory = SqlGeneratorFactory::new();
    let broken = MetadataOnly::failing("connection refused");
    let source: Arc<dyn DataSource> = broken.clone();

    let err = factory.get_generator(&source).await.err().unwrap();
    assert!(matches!(err, RepoError::MetadataProbe(_)));
    assert!(err.is_fatal());
    assert!(err.to_string().contains("connection refused"));
    assert_eq!(factory.cached_sources(), 0);
}
