use std::collections::HashSet;
use std::marker::PhantomData;

use crate::error::{RepoError, Result};
use crate::naming::to_snake_case;
use crate::query::{Row, SqlParam};

/// One declared field of a record and the column it persists to.
#[derive(Debug)]
pub struct FieldMeta {
    pub field: &'static str,
    pub column: &'static str,
}

/// Statically declared shape of a record type, normally produced by
/// `#[derive(Record)]`.
#[derive(Debug)]
pub struct RecordSchema {
    pub type_name: &'static str,
    pub table: &'static str,
    pub id_field: &'static str,
    /// Persisted fields in declaration order, identifier included.
    pub fields: &'static [FieldMeta],
}

impl RecordSchema {
    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.field == name)
    }
}

/// A record type the generic repository can persist.
pub trait Record: Sized + Send + Sync + 'static {
    fn schema() -> &'static RecordSchema;

    /// Current identifier value; unassigned keys are null or zero.
    fn id(&self) -> SqlParam;

    /// Writes a key handed out by the database back into the record.
    fn set_id(&mut self, id: SqlParam) -> Result<()>;

    fn from_row(row: &Row) -> Result<Self>;

    /// Value persisted into `column`, `None` when the column is unknown.
    fn column_value(&self, column: &str) -> Option<SqlParam>;
}

/// Static per-repository table metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableDescription {
    table_name: String,
    columns: Vec<String>,
    pk_columns: Vec<String>,
    select_clause: String,
    from_clause: String,
}

impl TableDescription {
    /// `columns` excludes the key columns. An empty `pk_columns` defaults to `id`.
    pub fn new(
        table_name: impl Into<String>,
        columns: Vec<String>,
        pk_columns: Vec<String>,
    ) -> Self {
        let table_name = table_name.into();
        let pk_columns = if pk_columns.is_empty() {
            vec!["id".to_string()]
        } else {
            pk_columns
        };
        let select_clause = if columns.is_empty() {
            "*".to_string()
        } else {
            format!("{}, {}", pk_columns.join(", "), columns.join(", "))
        };
        Self {
            from_clause: table_name.clone(),
            table_name,
            columns,
            pk_columns,
            select_clause,
        }
    }

    /// Builds the description from bare field names: the identifier is dropped
    /// and the rest are converted to snake-case columns, order preserved.
    pub fn from_field_names(
        type_name: &str,
        id_field: &str,
        fields: &[&str],
    ) -> Result<Self> {
        if !fields.contains(&id_field) {
            return Err(RepoError::Construction(format!(
                "identifier field `{}` is not declared on `{}`",
                id_field, type_name
            )));
        }
        let columns = fields
            .iter()
            .filter(|f| **f != id_field)
            .map(|f| to_snake_case(f))
            .collect::<Vec<_>>();
        check_unique(type_name, &columns)?;
        Ok(Self::new(
            to_snake_case(type_name),
            columns,
            vec![to_snake_case(id_field)],
        ))
    }

    /// Validates a record's static schema and derives its description.
    pub fn for_record<T: Record>() -> Result<Self> {
        Self::from_schema(T::schema())
    }

    pub fn from_schema(schema: &RecordSchema) -> Result<Self> {
        if schema.fields.is_empty() {
            return Err(RepoError::Construction(format!(
                "`{}` declares no persisted fields",
                schema.type_name
            )));
        }
        let id = schema.field(schema.id_field).ok_or_else(|| {
            RepoError::Construction(format!(
                "identifier field `{}` is not declared on `{}`",
                schema.id_field, schema.type_name
            ))
        })?;
        let columns = schema
            .fields
            .iter()
            .filter(|f| f.field != schema.id_field)
            .map(|f| f.column.to_string())
            .collect::<Vec<_>>();
        let mut all = columns.clone();
        all.push(id.column.to_string());
        check_unique(schema.type_name, &all)?;
        if all.iter().any(|c| c.trim().is_empty()) {
            return Err(RepoError::Construction(format!(
                "`{}` maps a field to an empty column name",
                schema.type_name
            )));
        }
        Ok(Self::new(schema.table, columns, vec![id.column.to_string()]))
    }

    pub fn with_from_clause(mut self, from_clause: impl Into<String>) -> Self {
        self.from_clause = from_clause.into();
        self
    }

    pub fn with_select_clause(mut self, select_clause: impl Into<String>) -> Self {
        self.select_clause = select_clause.into();
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn pk_columns(&self) -> &[String] {
        &self.pk_columns
    }

    /// The single key column the repository works with.
    pub fn id_column(&self) -> &str {
        &self.pk_columns[0]
    }

    pub fn select_clause(&self) -> &str {
        &self.select_clause
    }

    pub fn from_clause(&self) -> &str {
        &self.from_clause
    }

    /// Whether `name` is a key or data column of this table, ignoring case.
    pub fn has_column(&self, name: &str) -> bool {
        self.pk_columns
            .iter()
            .chain(&self.columns)
            .any(|c| c.eq_ignore_ascii_case(name))
    }
}

fn check_unique(type_name: &str, columns: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for c in columns {
        if !seen.insert(c.to_ascii_lowercase()) {
            return Err(RepoError::Construction(format!(
                "`{}` maps more than one field to column `{}`",
                type_name, c
            )));
        }
    }
    Ok(())
}

/// Bidirectional mapping between a record and its column values.
pub trait RowMapper<T>: Send + Sync {
    fn map_row(&self, row: &Row) -> Result<T>;

    /// Values for `columns`, positionally aligned with them.
    fn columns_values(&self, entity: &T, columns: &[String]) -> Result<Vec<SqlParam>>;
}

/// Mapper backed by the record's own [`Record`] implementation.
pub struct RecordMapper<T>(PhantomData<fn() -> T>);

impl<T> RecordMapper<T> {
    pub fn new() -> Self {
        RecordMapper(PhantomData)
    }
}

impl<T> Default for RecordMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> RowMapper<T> for RecordMapper<T> {
    fn map_row(&self, row: &Row) -> Result<T> {
        T::from_row(row)
    }

    fn columns_values(&self, entity: &T, columns: &[String]) -> Result<Vec<SqlParam>> {
        columns
            .iter()
            .map(|c| {
                entity.column_value(c).ok_or_else(|| {
                    RepoError::Mapping(format!(
                        "`{}` has no field for column `{}`",
                        T::schema().type_name,
                        c
                    ))
                })
            })
            .collect()
    }
}

/// Mapper for read-only repositories: rows map normally, every write is refused.
pub struct ReadOnlyRowMapper<T>(PhantomData<fn() -> T>);

impl<T> ReadOnlyRowMapper<T> {
    pub fn new() -> Self {
        ReadOnlyRowMapper(PhantomData)
    }
}

impl<T> Default for ReadOnlyRowMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> RowMapper<T> for ReadOnlyRowMapper<T> {
    fn map_row(&self, row: &Row) -> Result<T> {
        T::from_row(row)
    }

    fn columns_values(&self, _entity: &T, _columns: &[String]) -> Result<Vec<SqlParam>> {
        Err(RepoError::UnsupportedWriteOnReadOnly)
    }
}
