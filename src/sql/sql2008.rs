use super::{sort_or_pks, Compatibility, SqlGenerator};
use crate::db::EngineMetadata;
use crate::mapping::TableDescription;
use crate::page::Pageable;

/// SQL generator for servers that support the SQL:2008 `OFFSET ... FETCH`
/// feature: Apache Derby, Microsoft SQL Server 2012 and Oracle 12c.
///
/// The standard only allows `OFFSET` after an `ORDER BY`, so unsorted pages
/// are ordered by the primary key.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sql2008SqlGenerator;

impl SqlGenerator for Sql2008SqlGenerator {
    fn name(&self) -> &'static str {
        "Sql2008SqlGenerator"
    }

    fn is_compatible(&self, metadata: &EngineMetadata) -> Compatibility {
        let minimum = match metadata.product_name.as_str() {
            "Apache Derby" => return Compatibility::Compatible,
            "Oracle" => 12,
            // 11 is SQL Server 2012
            "Microsoft SQL Server" => 11,
            _ => return Compatibility::Incompatible,
        };
        match metadata.major_version {
            Some(major) => Compatibility::from_bool(major >= minimum),
            None => Compatibility::ProbeFailed(format!(
                "major version of {} is unavailable",
                metadata.product_name
            )),
        }
    }

    fn select_page(&self, table: &TableDescription, page: &Pageable) -> String {
        let sort = sort_or_pks(&page.sort, table);
        format!(
            "{} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
            self.select_all_sorted(table, &sort),
            page.offset,
            page.size
        )
    }

    fn select_page_where(
        &self,
        table: &TableDescription,
        where_clause: &str,
        page: &Pageable,
    ) -> String {
        let sort = sort_or_pks(&page.sort, table);
        format!(
            "{} OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
            self.select_all_where_sorted(table, where_clause, &sort),
            page.offset,
            page.size
        )
    }
}
