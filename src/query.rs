use std::sync::Arc;

use crate::error::{RepoError, Result};

/// Bind marker flavour understood by a database engine.
///
/// SQL generators always emit `?`; the connection rewrites the text with
/// [`PlaceholderStyle::apply`] right before it is sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` (SQLite, JDBC-style generators).
    Question,
    /// `@P1, @P2, ...` (SQL Server).
    AtP,
    /// `$1, $2, ...` (PostgreSQL).
    Dollar,
}

impl PlaceholderStyle {
    pub fn marker(self, idx: usize) -> String {
        match self {
            PlaceholderStyle::Question => "?".to_string(),
            PlaceholderStyle::AtP => format!("@P{}", idx),
            PlaceholderStyle::Dollar => format!("${}", idx),
        }
    }

    /// Rewrites every `?` outside string literals into this style's numbered markers.
    pub fn apply(self, sql: &str) -> String {
        if self == PlaceholderStyle::Question {
            return sql.to_string();
        }
        let mut out = String::with_capacity(sql.len() + 8);
        let mut idx = 0;
        let mut in_literal = false;
        for ch in sql.chars() {
            match ch {
                '\'' => {
                    in_literal = !in_literal;
                    out.push(ch);
                }
                '?' if !in_literal => {
                    idx += 1;
                    out.push_str(&self.marker(idx));
                }
                _ => out.push(ch),
            }
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SqlParam {
    I32(i32),
    I64(i64),
    F64(f64),
    Bool(bool),
    Text(String),
    Uuid(uuid::Uuid),
    Decimal(rust_decimal::Decimal),
    DateTime(chrono::NaiveDateTime),
    Bytes(Vec<u8>),
    Null,
}

impl SqlParam {
    /// True when the value cannot be a key handed out by the database:
    /// null, numeric zero, empty or `"0"` text, or the nil UUID.
    pub fn is_unassigned(&self) -> bool {
        match self {
            SqlParam::Null => true,
            SqlParam::I32(v) => *v == 0,
            SqlParam::I64(v) => *v == 0,
            SqlParam::Text(v) => v.is_empty() || v == "0",
            SqlParam::Uuid(v) => v.is_nil(),
            SqlParam::Decimal(v) => v.is_zero(),
            _ => false,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            SqlParam::I32(_) => "i32",
            SqlParam::I64(_) => "i64",
            SqlParam::F64(_) => "f64",
            SqlParam::Bool(_) => "bool",
            SqlParam::Text(_) => "text",
            SqlParam::Uuid(_) => "uuid",
            SqlParam::Decimal(_) => "decimal",
            SqlParam::DateTime(_) => "datetime",
            SqlParam::Bytes(_) => "bytes",
            SqlParam::Null => "null",
        }
    }
}

impl std::fmt::Display for SqlParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlParam::I32(v) => write!(f, "{}", v),
            SqlParam::I64(v) => write!(f, "{}", v),
            SqlParam::F64(v) => write!(f, "{}", v),
            SqlParam::Bool(v) => write!(f, "{}", v),
            SqlParam::Text(v) => write!(f, "{}", v),
            SqlParam::Uuid(v) => write!(f, "{}", v),
            SqlParam::Decimal(v) => write!(f, "{}", v),
            SqlParam::DateTime(v) => write!(f, "{}", v),
            SqlParam::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            SqlParam::Null => write!(f, "null"),
        }
    }
}

pub trait ToParam {
    fn to_param(self) -> SqlParam;
}

impl ToParam for SqlParam {
    fn to_param(self) -> SqlParam {
        self
    }
}
impl ToParam for i32 {
    fn to_param(self) -> SqlParam {
        SqlParam::I32(self)
    }
}
impl ToParam for i64 {
    fn to_param(self) -> SqlParam {
        SqlParam::I64(self)
    }
}
impl ToParam for f64 {
    fn to_param(self) -> SqlParam {
        SqlParam::F64(self)
    }
}
impl ToParam for bool {
    fn to_param(self) -> SqlParam {
        SqlParam::Bool(self)
    }
}
impl ToParam for String {
    fn to_param(self) -> SqlParam {
        SqlParam::Text(self)
    }
}
impl<'a> ToParam for &'a str {
    fn to_param(self) -> SqlParam {
        SqlParam::Text(self.to_string())
    }
}
impl ToParam for uuid::Uuid {
    fn to_param(self) -> SqlParam {
        SqlParam::Uuid(self)
    }
}
impl ToParam for rust_decimal::Decimal {
    fn to_param(self) -> SqlParam {
        SqlParam::Decimal(self)
    }
}
impl ToParam for chrono::NaiveDateTime {
    fn to_param(self) -> SqlParam {
        SqlParam::DateTime(self)
    }
}
impl ToParam for Vec<u8> {
    fn to_param(self) -> SqlParam {
        SqlParam::Bytes(self)
    }
}

impl<T: ToParam> ToParam for Option<T> {
    fn to_param(self) -> SqlParam {
        match self {
            Some(v) => v.to_param(),
            None => SqlParam::Null,
        }
    }
}

/// Conversion from a fetched value back into a record field.
pub trait FromSqlParam: Sized {
    fn from_param(value: &SqlParam) -> Result<Self>;
}

fn mismatch<T>(value: &SqlParam, target: &str) -> Result<T> {
    Err(RepoError::Mapping(format!(
        "cannot convert {} value `{}` into {}",
        value.kind(),
        value,
        target
    )))
}

impl FromSqlParam for SqlParam {
    fn from_param(value: &SqlParam) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromSqlParam for i32 {
    fn from_param(value: &SqlParam) -> Result<Self> {
        match value {
            SqlParam::I32(v) => Ok(*v),
            SqlParam::I64(v) => i32::try_from(*v).or_else(|_| mismatch(value, "i32")),
            _ => mismatch(value, "i32"),
        }
    }
}

impl FromSqlParam for i64 {
    fn from_param(value: &SqlParam) -> Result<Self> {
        match value {
            SqlParam::I32(v) => Ok(i64::from(*v)),
            SqlParam::I64(v) => Ok(*v),
            SqlParam::Decimal(v) if v.fract().is_zero() => {
                rust_decimal::prelude::ToPrimitive::to_i64(v).map_or_else(|| mismatch(value, "i64"), Ok)
            }
            _ => mismatch(value, "i64"),
        }
    }
}

impl FromSqlParam for f64 {
    fn from_param(value: &SqlParam) -> Result<Self> {
        match value {
            SqlParam::F64(v) => Ok(*v),
            SqlParam::I32(v) => Ok(f64::from(*v)),
            // SQLite stores integral REALs in NUMERIC columns as integers
            SqlParam::I64(v) => Ok(*v as f64),
            SqlParam::Decimal(v) => rust_decimal::prelude::ToPrimitive::to_f64(v)
                .map_or_else(|| mismatch(value, "f64"), Ok),
            _ => mismatch(value, "f64"),
        }
    }
}

impl FromSqlParam for bool {
    fn from_param(value: &SqlParam) -> Result<Self> {
        match value {
            SqlParam::Bool(v) => Ok(*v),
            SqlParam::I32(v) => Ok(*v != 0),
            SqlParam::I64(v) => Ok(*v != 0),
            _ => mismatch(value, "bool"),
        }
    }
}

impl FromSqlParam for String {
    fn from_param(value: &SqlParam) -> Result<Self> {
        match value {
            SqlParam::Text(v) => Ok(v.clone()),
            _ => mismatch(value, "String"),
        }
    }
}

impl FromSqlParam for uuid::Uuid {
    fn from_param(value: &SqlParam) -> Result<Self> {
        match value {
            SqlParam::Uuid(v) => Ok(*v),
            SqlParam::Text(v) => v.parse().or_else(|_| mismatch(value, "Uuid")),
            SqlParam::Bytes(v) => uuid::Uuid::from_slice(v).or_else(|_| mismatch(value, "Uuid")),
            _ => mismatch(value, "Uuid"),
        }
    }
}

impl FromSqlParam for rust_decimal::Decimal {
    fn from_param(value: &SqlParam) -> Result<Self> {
        match value {
            SqlParam::Decimal(v) => Ok(*v),
            SqlParam::I32(v) => Ok((*v).into()),
            SqlParam::I64(v) => Ok((*v).into()),
            SqlParam::Text(v) => v.parse().or_else(|_| mismatch(value, "Decimal")),
            SqlParam::F64(v) => {
                rust_decimal::Decimal::try_from(*v).or_else(|_| mismatch(value, "Decimal"))
            }
            _ => mismatch(value, "Decimal"),
        }
    }
}

impl FromSqlParam for chrono::NaiveDateTime {
    fn from_param(value: &SqlParam) -> Result<Self> {
        match value {
            SqlParam::DateTime(v) => Ok(*v),
            SqlParam::Text(v) => {
                chrono::NaiveDateTime::parse_from_str(v, "%Y-%m-%d %H:%M:%S%.f")
                    .or_else(|_| chrono::NaiveDateTime::parse_from_str(v, "%Y-%m-%dT%H:%M:%S%.f"))
                    .or_else(|_| mismatch(value, "NaiveDateTime"))
            }
            _ => mismatch(value, "NaiveDateTime"),
        }
    }
}

impl FromSqlParam for Vec<u8> {
    fn from_param(value: &SqlParam) -> Result<Self> {
        match value {
            SqlParam::Bytes(v) => Ok(v.clone()),
            _ => mismatch(value, "Vec<u8>"),
        }
    }
}

impl<T: FromSqlParam> FromSqlParam for Option<T> {
    fn from_param(value: &SqlParam) -> Result<Self> {
        match value {
            SqlParam::Null => Ok(None),
            other => T::from_param(other).map(Some),
        }
    }
}

/// One fetched row: column names in select order plus their values.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<SqlParam>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<SqlParam>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[SqlParam] {
        &self.values
    }

    /// Raw value by column name. Engines disagree on identifier case, so the
    /// lookup ignores it.
    pub fn value(&self, column: &str) -> Option<&SqlParam> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|idx| self.values.get(idx))
    }

    pub fn get<T: FromSqlParam>(&self, column: &str) -> Result<T> {
        let value = self
            .value(column)
            .ok_or_else(|| RepoError::Mapping(format!("column `{}` not in result set", column)))?;
        T::from_param(value)
            .map_err(|e| RepoError::Mapping(format!("column `{}`: {}", column, e)))
    }

    pub fn get_index<T: FromSqlParam>(&self, idx: usize) -> Result<T> {
        let value = self
            .values
            .get(idx)
            .ok_or_else(|| RepoError::Mapping(format!("column index {} out of range", idx)))?;
        T::from_param(value)
    }
}

#[derive(Clone, Debug)]
pub enum Expr {
    Col(String),
    Param(SqlParam),
    Binary {
        left: Box<Expr>,
        op: &'static str,
        right: Box<Expr>,
    },
    Like {
        left: Box<Expr>,
        right: SqlParam,
    },
    InList {
        left: Box<Expr>,
        list: Vec<SqlParam>,
    },
    IsNull(Box<Expr>),
    Group(Box<Expr>),
}

impl Expr {
    fn binary(self, op: &'static str, rhs: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(self),
            op,
            right: Box::new(rhs),
        }
    }

    pub fn eq(self, rhs: Expr) -> Expr {
        self.binary("=", rhs)
    }
    pub fn ne(self, rhs: Expr) -> Expr {
        self.binary("<>", rhs)
    }
    pub fn gt(self, rhs: Expr) -> Expr {
        self.binary(">", rhs)
    }
    pub fn ge(self, rhs: Expr) -> Expr {
        self.binary(">=", rhs)
    }
    pub fn lt(self, rhs: Expr) -> Expr {
        self.binary("<", rhs)
    }
    pub fn le(self, rhs: Expr) -> Expr {
        self.binary("<=", rhs)
    }
    pub fn and(self, rhs: Expr) -> Expr {
        self.binary("AND", rhs)
    }
    pub fn or(self, rhs: Expr) -> Expr {
        self.binary("OR", rhs)
    }
    pub fn like(self, pattern: impl ToParam) -> Expr {
        Expr::Like {
            left: Box::new(self),
            right: pattern.to_param(),
        }
    }
    pub fn in_list<P: ToParam>(self, list: impl IntoIterator<Item = P>) -> Expr {
        Expr::InList {
            left: Box::new(self),
            list: list.into_iter().map(ToParam::to_param).collect(),
        }
    }
    pub fn is_null(self) -> Expr {
        Expr::IsNull(Box::new(self))
    }
    pub fn group(self) -> Expr {
        Expr::Group(Box::new(self))
    }

    pub fn to_sql_with(&self, style: PlaceholderStyle, params: &mut Vec<SqlParam>) -> String {
        match self {
            Expr::Col(c) => c.clone(),
            Expr::Param(p) => {
                params.push(p.clone());
                style.marker(params.len())
            }
            Expr::Binary { left, op, right } => {
                let l = left.to_sql_with(style, params);
                let r = right.to_sql_with(style, params);
                if *op == "AND" || *op == "OR" {
                    format!("{} {} {}", l, op, r)
                } else {
                    format!("({} {} {})", l, op, r)
                }
            }
            Expr::Like { left, right } => {
                let l = left.to_sql_with(style, params);
                params.push(right.clone());
                format!("({} LIKE {})", l, style.marker(params.len()))
            }
            Expr::InList { left, list } => {
                let l = left.to_sql_with(style, params);
                if list.is_empty() {
                    // An empty IN list is invalid SQL and matches nothing.
                    return "(1 = 0)".to_string();
                }
                let mut phs = Vec::with_capacity(list.len());
                for p in list {
                    params.push(p.clone());
                    phs.push(style.marker(params.len()));
                }
                format!("{} IN ({})", l, phs.join(", "))
            }
            Expr::IsNull(e) => format!("({} IS NULL)", e.to_sql_with(style, params)),
            Expr::Group(e) => format!("({})", e.to_sql_with(style, params)),
        }
    }
}

#[macro_export]
macro_rules! col {
    ($name:expr) => {
        $crate::query::Expr::Col($name.to_string())
    };
}

#[macro_export]
macro_rules! val {
    ($v:expr) => {
        $crate::query::Expr::Param($crate::query::ToParam::to_param($v))
    };
}

/// A WHERE predicate plus the values bound to its `?` markers.
///
/// Raw strings are passed through verbatim, the way callers hand predicates to
/// `find_all_where`; expressions render with `?` markers and carry their params.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Criteria {
    pub clause: String,
    pub params: Vec<SqlParam>,
}

impl Criteria {
    pub fn new(clause: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            clause: clause.into(),
            params,
        }
    }
}

impl From<&str> for Criteria {
    fn from(clause: &str) -> Self {
        Criteria::new(clause, Vec::new())
    }
}

impl From<String> for Criteria {
    fn from(clause: String) -> Self {
        Criteria::new(clause, Vec::new())
    }
}

impl From<Expr> for Criteria {
    fn from(expr: Expr) -> Self {
        let mut params = Vec::new();
        let clause = expr.to_sql_with(PlaceholderStyle::Question, &mut params);
        Criteria { clause, params }
    }
}
