use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::RwLock;

use super::{
    Compatibility, DefaultSqlGenerator, LimitOffsetSqlGenerator, Oracle9SqlGenerator,
    Sql2008SqlGenerator, SqlGenerator,
};
use crate::db::{DataSource, EngineMetadata};
use crate::error::{RepoError, Result};

struct CachedGenerator {
    source: Weak<dyn DataSource>,
    generator: Arc<dyn SqlGenerator>,
}

/// Registry of SQL generators plus a per-source memo of the one selected.
///
/// Generators are probed most recently registered first. The memo holds its
/// sources weakly; entries for dropped sources are pruned on the next
/// resolution and simply re-derived if the same source shows up again.
pub struct SqlGeneratorFactory {
    generators: RwLock<VecDeque<Arc<dyn SqlGenerator>>>,
    cache: DashMap<usize, CachedGenerator>,
}

impl Default for SqlGeneratorFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlGeneratorFactory {
    /// Registry with the built-in dialects; the universal fallback is probed last.
    pub fn new() -> Self {
        let factory = Self::empty();
        factory.register_generator(Arc::new(DefaultSqlGenerator));
        factory.register_generator(Arc::new(Oracle9SqlGenerator));
        factory.register_generator(Arc::new(LimitOffsetSqlGenerator));
        factory.register_generator(Arc::new(Sql2008SqlGenerator));
        factory
    }

    pub fn empty() -> Self {
        Self {
            generators: RwLock::new(VecDeque::new()),
            cache: DashMap::new(),
        }
    }

    /// Adds `generator` to the top of the registry.
    pub fn register_generator(&self, generator: Arc<dyn SqlGenerator>) {
        self.generators.write().push_front(generator);
    }

    /// Registry contents in probe order.
    pub fn generator_names(&self) -> Vec<&'static str> {
        self.generators.read().iter().map(|g| g.name()).collect()
    }

    /// Removes all generators and forgets every cached selection.
    pub fn clear(&self) {
        self.generators.write().clear();
        self.cache.clear();
    }

    /// Number of live sources with a memoized generator.
    pub fn cached_sources(&self) -> usize {
        self.prune();
        self.cache.len()
    }

    /// Finds the generator for `source`, probing its metadata on first use.
    ///
    /// A failing metadata probe is returned as [`RepoError::MetadataProbe`]
    /// and never retried here.
    pub async fn get_generator(
        &self,
        source: &Arc<dyn DataSource>,
    ) -> Result<Arc<dyn SqlGenerator>> {
        let key = source_key(source);
        if let Some(generator) = self.cached(key, source) {
            return Ok(generator);
        }

        let metadata = source.metadata().await.map_err(|e| match e {
            RepoError::MetadataProbe(_) => e,
            other => RepoError::metadata_probe(other),
        })?;
        let generator = self.select(&metadata)?;
        tracing::debug!(
            generator = generator.name(),
            source = %source.description(),
            "caching SQL generator for source"
        );

        self.prune();
        self.cache.insert(
            key,
            CachedGenerator {
                source: Arc::downgrade(source),
                generator: generator.clone(),
            },
        );
        Ok(generator)
    }

    /// Picks the first registered generator compatible with `metadata`.
    pub fn select(&self, metadata: &EngineMetadata) -> Result<Arc<dyn SqlGenerator>> {
        let generators = self.generators.read();
        for generator in generators.iter() {
            match generator.is_compatible(metadata) {
                Compatibility::Compatible => {
                    tracing::info!(
                        generator = generator.name(),
                        product = %metadata.product_name,
                        major_version = ?metadata.major_version,
                        "using SQL generator"
                    );
                    return Ok(generator.clone());
                }
                Compatibility::Incompatible => {}
                Compatibility::ProbeFailed(reason) => {
                    tracing::warn!(
                        generator = generator.name(),
                        %reason,
                        "compatibility probe failed, skipping generator"
                    );
                }
            }
        }
        // Unreachable while the registry holds a fallback that accepts every engine.
        Err(RepoError::NoCompatibleDialect)
    }

    fn cached(&self, key: usize, source: &Arc<dyn DataSource>) -> Option<Arc<dyn SqlGenerator>> {
        let entry = self.cache.get(&key)?;
        match entry.source.upgrade() {
            Some(live) if Arc::ptr_eq(&live, source) => Some(entry.generator.clone()),
            // The address was reused by a different source.
            _ => None,
        }
    }

    fn prune(&self) {
        self.cache.retain(|_, entry| entry.source.strong_count() > 0);
    }
}

fn source_key(source: &Arc<dyn DataSource>) -> usize {
    Arc::as_ptr(source) as *const () as usize
}
