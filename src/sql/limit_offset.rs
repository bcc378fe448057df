use super::{Compatibility, SqlGenerator};
use crate::db::EngineMetadata;
use crate::mapping::TableDescription;
use crate::page::Pageable;

const SUPPORTED_PRODUCTS: &[&str] = &[
    "PostgreSQL",
    "H2",
    "HSQL Database Engine",
    "MySQL",
    "MariaDB",
    "SQLite",
];

/// SQL generator for servers that support the `LIMIT ... OFFSET` clause:
/// PostgreSQL, H2, HSQLDB, SQLite, MariaDB, and MySQL.
#[derive(Debug, Default, Clone, Copy)]
pub struct LimitOffsetSqlGenerator;

impl SqlGenerator for LimitOffsetSqlGenerator {
    fn name(&self) -> &'static str {
        "LimitOffsetSqlGenerator"
    }

    fn is_compatible(&self, metadata: &EngineMetadata) -> Compatibility {
        Compatibility::from_bool(SUPPORTED_PRODUCTS.contains(&metadata.product_name.as_str()))
    }

    fn select_page(&self, table: &TableDescription, page: &Pageable) -> String {
        format!(
            "{} LIMIT {} OFFSET {}",
            self.select_all_sorted(table, &page.sort),
            page.size,
            page.offset
        )
    }

    fn select_page_where(
        &self,
        table: &TableDescription,
        where_clause: &str,
        page: &Pageable,
    ) -> String {
        format!(
            "{} LIMIT {} OFFSET {}",
            self.select_all_where_sorted(table, where_clause, &page.sort),
            page.size,
            page.offset
        )
    }
}
