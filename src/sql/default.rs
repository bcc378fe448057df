use super::{Compatibility, SqlGenerator};
use crate::db::EngineMetadata;

/// Universal fallback: compatible with every engine, so dialect selection
/// never comes up empty. Pages through `row_number() OVER (...)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSqlGenerator;

impl SqlGenerator for DefaultSqlGenerator {
    fn name(&self) -> &'static str {
        "DefaultSqlGenerator"
    }

    fn is_compatible(&self, _metadata: &EngineMetadata) -> Compatibility {
        Compatibility::Compatible
    }
}
