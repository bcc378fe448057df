use super::{sort_or_pks, Compatibility, SqlGenerator};
use crate::db::EngineMetadata;
use crate::mapping::TableDescription;
use crate::page::Pageable;

/// SQL generator for Oracle up to 11g. Newer servers are better served by
/// [`super::Sql2008SqlGenerator`].
///
/// `ROWNUM` is assigned before `ORDER BY` runs and a `ROWNUM > n` filter in
/// the same query block never matches, so the sorted query is wrapped twice:
/// the inner block numbers the already ordered rows, the outer one cuts the
/// page out of them.
#[derive(Debug, Default, Clone, Copy)]
pub struct Oracle9SqlGenerator;

impl Oracle9SqlGenerator {
    fn wrap(&self, sorted: String, page: &Pageable) -> String {
        format!(
            "SELECT t2__.* FROM ( \
             SELECT t1__.*, ROWNUM AS rn__ FROM ( {} ) t1__ \
             ) t2__ WHERE t2__.rn__ > {} AND t2__.rn__ <= {} ORDER BY t2__.rn__",
            sorted,
            page.offset,
            page.end()
        )
    }
}

impl SqlGenerator for Oracle9SqlGenerator {
    fn name(&self) -> &'static str {
        "Oracle9SqlGenerator"
    }

    fn is_compatible(&self, metadata: &EngineMetadata) -> Compatibility {
        Compatibility::from_bool(
            metadata.product_name == "Oracle"
                && metadata.major_version.map_or(true, |major| major < 12),
        )
    }

    fn select_page(&self, table: &TableDescription, page: &Pageable) -> String {
        let sort = sort_or_pks(&page.sort, table);
        self.wrap(self.select_all_sorted(table, &sort), page)
    }

    fn select_page_where(
        &self,
        table: &TableDescription,
        where_clause: &str,
        page: &Pageable,
    ) -> String {
        let sort = sort_or_pks(&page.sort, table);
        self.wrap(self.select_all_where_sorted(table, where_clause, &sort), page)
    }
}
