//! SQL generation strategies, one per database dialect.
//!
//! Generators are stateless string builders. They emit `?` bind markers; the
//! connection rewrites them into the engine's own placeholder style.

mod default;
pub mod factory;
mod limit_offset;
mod oracle9;
mod sql2008;

pub use default::DefaultSqlGenerator;
pub use factory::SqlGeneratorFactory;
pub use limit_offset::LimitOffsetSqlGenerator;
pub use oracle9::Oracle9SqlGenerator;
pub use sql2008::Sql2008SqlGenerator;

use crate::db::EngineMetadata;
use crate::mapping::TableDescription;
use crate::page::{Pageable, Sort};

/// Outcome of asking a generator whether it fits an engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Compatibility {
    Compatible,
    Incompatible,
    /// The metadata needed to decide was unavailable; treated as a non-match.
    ProbeFailed(String),
}

impl Compatibility {
    pub fn from_bool(compatible: bool) -> Self {
        if compatible {
            Compatibility::Compatible
        } else {
            Compatibility::Incompatible
        }
    }
}

/// Produces dialect-specific SQL for a [`TableDescription`].
///
/// Every method except [`SqlGenerator::is_compatible`] has a portable default;
/// dialects override what their engine does differently, usually paging.
pub trait SqlGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_compatible(&self, metadata: &EngineMetadata) -> Compatibility;

    fn select_all(&self, table: &TableDescription) -> String {
        format!(
            "SELECT {} FROM {}",
            table.select_clause(),
            table.from_clause()
        )
    }

    fn select_all_sorted(&self, table: &TableDescription, sort: &Sort) -> String {
        order_by(self.select_all(table), sort)
    }

    fn select_all_where(&self, table: &TableDescription, where_clause: &str) -> String {
        format!(
            "SELECT {} FROM {} WHERE {}",
            table.select_clause(),
            table.from_clause(),
            where_clause
        )
    }

    fn select_all_where_sorted(
        &self,
        table: &TableDescription,
        where_clause: &str,
        sort: &Sort,
    ) -> String {
        order_by(self.select_all_where(table, where_clause), sort)
    }

    /// Paging through the standard `row_number()` window function.
    fn select_page(&self, table: &TableDescription, page: &Pageable) -> String {
        row_number_page(&self.select_all(table), table, page)
    }

    fn select_page_where(
        &self,
        table: &TableDescription,
        where_clause: &str,
        page: &Pageable,
    ) -> String {
        row_number_page(&self.select_all_where(table, where_clause), table, page)
    }

    fn select_by_pk(&self, table: &TableDescription) -> String {
        format!(
            "SELECT {} FROM {} WHERE {}",
            table.select_clause(),
            table.from_clause(),
            pk_predicate(table)
        )
    }

    /// `count` must be at least one; an empty `IN ()` list is not valid SQL.
    fn select_by_pks(&self, table: &TableDescription, count: usize) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} IN ({})",
            table.select_clause(),
            table.from_clause(),
            table.id_column(),
            markers(count)
        )
    }

    fn exists_by_pk(&self, table: &TableDescription) -> String {
        format!(
            "SELECT 1 FROM {} WHERE {}",
            table.from_clause(),
            pk_predicate(table)
        )
    }

    fn count(&self, table: &TableDescription) -> String {
        format!("SELECT count(*) FROM {}", table.from_clause())
    }

    fn count_where(&self, table: &TableDescription, where_clause: &str) -> String {
        format!(
            "SELECT count(*) FROM {} WHERE {}",
            table.from_clause(),
            where_clause
        )
    }

    fn delete_by_pk(&self, table: &TableDescription) -> String {
        format!(
            "DELETE FROM {} WHERE {}",
            table.table_name(),
            pk_predicate(table)
        )
    }

    /// With `auto_generate_key` the key columns are left to the engine;
    /// otherwise they come first, ahead of the regular columns.
    fn insert(&self, table: &TableDescription, auto_generate_key: bool) -> String {
        let mut columns: Vec<&str> = Vec::new();
        if !auto_generate_key {
            columns.extend(table.pk_columns().iter().map(String::as_str));
        }
        columns.extend(table.columns().iter().map(String::as_str));
        if columns.is_empty() {
            return format!("INSERT INTO {} DEFAULT VALUES", table.table_name());
        }
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.table_name(),
            columns.join(", "),
            markers(columns.len())
        )
    }

    /// Key columns are bound last, after the regular columns.
    fn update(&self, table: &TableDescription) -> String {
        let set = if table.columns().is_empty() {
            let id = table.id_column();
            format!("{} = {}", id, id)
        } else {
            table
                .columns()
                .iter()
                .map(|c| format!("{} = ?", c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "UPDATE {} SET {} WHERE {}",
            table.table_name(),
            set,
            pk_predicate(table)
        )
    }
}

/// `a = ? AND b = ?` over the key columns.
pub fn pk_predicate(table: &TableDescription) -> String {
    table
        .pk_columns()
        .iter()
        .map(|c| format!("{} = ?", c))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// The caller's sort, or ascending key order when none was given.
pub fn sort_or_pks(sort: &Sort, table: &TableDescription) -> Sort {
    if sort.is_sorted() {
        sort.clone()
    } else {
        Sort::by_columns(table.pk_columns())
    }
}

fn order_by(sql: String, sort: &Sort) -> String {
    if sort.is_unsorted() {
        sql
    } else {
        format!("{} ORDER BY {}", sql, sort.to_sql())
    }
}

fn markers(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn row_number_page(base: &str, table: &TableDescription, page: &Pageable) -> String {
    let sort = sort_or_pks(&page.sort, table);
    format!(
        "SELECT t2__.* FROM ( \
         SELECT row_number() OVER (ORDER BY {}) AS rn__, t1__.* FROM ( {} ) t1__ \
         ) t2__ WHERE t2__.rn__ BETWEEN {} AND {} ORDER BY t2__.rn__",
        sort.to_sql(),
        base,
        page.offset + 1,
        page.end()
    )
}
