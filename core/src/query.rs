//! Query expressions and their translation to parameterized SQL.
//!
//! Predicates are explicit expression trees built with [`field`], [`lit`],
//! [`not`] and the comparison/combinator methods on [`Expr`]. The translator
//! supports comparisons of a field against a constant, `AND`/`OR`/`NOT`, and
//! ordering, which is all a single-table filter needs.
//!
//! # Example
//!
//! ```
//! use tablemap_core::{Query, Record, SortOrder, SqlValue, ValueCodec, field, impl_record, translate};
//!
//! #[derive(Debug, Default)]
//! struct Order {
//!     id: i64,
//!     name: String,
//! }
//! impl_record!(Order { id: Integer => primary_key, name: Text });
//!
//! let mapping = Order::mapping().finalize().unwrap();
//! let query = Query::<Order>::new()
//!     .filter(field("name").eq("Shipped"))
//!     .order_by("id", SortOrder::Desc);
//!
//! let stmt = translate(&mapping, &ValueCodec::default(), &query).unwrap();
//! assert_eq!(stmt.sql, "SELECT * FROM \"Order\" WHERE name = ? ORDER BY id DESC");
//! assert_eq!(stmt.params, vec![SqlValue::from("Shipped")]);
//! ```

use std::fmt;
use std::marker::PhantomData;

use crate::codec::ValueCodec;
use crate::crud::SqlStatement;
use crate::error::QueryError;
use crate::ident::quote_ident;
use crate::mapping::{ColumnMapping, TableMapping};
use crate::types::{SemanticType, SortOrder};
use crate::value::{FieldValue, SqlValue};

/// Relational comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// Operator with its operands swapped (`a < b` ⇔ `b > a`).
    pub fn mirror(self) -> Self {
        match self {
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
            other => other,
        }
    }
}

/// A predicate expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to a record field.
    Field(String),
    /// Constant value.
    Literal(FieldValue),
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

/// References a record field.
pub fn field(name: impl Into<String>) -> Expr {
    Expr::Field(name.into())
}

/// A constant.
pub fn lit(value: impl Into<FieldValue>) -> Expr {
    Expr::Literal(value.into())
}

/// Negates a predicate.
pub fn not(expr: Expr) -> Expr {
    Expr::Not(Box::new(expr))
}

impl Expr {
    /// Builds a comparison between two arbitrary expressions.
    pub fn compare(op: CompareOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn eq(self, value: impl Into<FieldValue>) -> Expr {
        Expr::compare(CompareOp::Eq, self, lit(value))
    }

    pub fn ne(self, value: impl Into<FieldValue>) -> Expr {
        Expr::compare(CompareOp::Ne, self, lit(value))
    }

    pub fn lt(self, value: impl Into<FieldValue>) -> Expr {
        Expr::compare(CompareOp::Lt, self, lit(value))
    }

    pub fn le(self, value: impl Into<FieldValue>) -> Expr {
        Expr::compare(CompareOp::Le, self, lit(value))
    }

    pub fn gt(self, value: impl Into<FieldValue>) -> Expr {
        Expr::compare(CompareOp::Gt, self, lit(value))
    }

    pub fn ge(self, value: impl Into<FieldValue>) -> Expr {
        Expr::compare(CompareOp::Ge, self, lit(value))
    }

    pub fn is_null(self) -> Expr {
        Expr::compare(CompareOp::Eq, self, Expr::Literal(FieldValue::Null))
    }

    pub fn is_not_null(self) -> Expr {
        Expr::compare(CompareOp::Ne, self, Expr::Literal(FieldValue::Null))
    }

    pub fn and(self, other: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(other))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Field(name) => write!(f, "field '{name}'"),
            Expr::Literal(value) => write!(f, "{} literal", value.kind()),
            Expr::Compare { op, .. } => write!(f, "'{}' comparison", op.symbol()),
            Expr::And(..) => f.write_str("AND"),
            Expr::Or(..) => f.write_str("OR"),
            Expr::Not(_) => f.write_str("NOT"),
        }
    }
}

/// One ordering key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub field: String,
    pub order: SortOrder,
}

/// A composable query over records of type `R`.
///
/// Queries are plain values: building one touches no database, and the
/// same query can be executed any number of times.
pub struct Query<R> {
    filter: Option<Expr>,
    ordering: Vec<Ordering>,
    limit: Option<u64>,
    offset: Option<u64>,
    _record: PhantomData<fn() -> R>,
}

impl<R> Query<R> {
    pub fn new() -> Self {
        Self {
            filter: None,
            ordering: Vec::new(),
            limit: None,
            offset: None,
            _record: PhantomData,
        }
    }

    /// Adds a predicate; repeated calls are combined with `AND`.
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Sets the ordering, replacing any previous one.
    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.ordering.clear();
        self.then_by(field, order)
    }

    /// Appends a secondary ordering key.
    pub fn then_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.ordering.push(Ordering {
            field: field.into(),
            order,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn predicate(&self) -> Option<&Expr> {
        self.filter.as_ref()
    }

    pub fn ordering(&self) -> &[Ordering] {
        &self.ordering
    }
}

impl<R> Default for Query<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for Query<R> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            ordering: self.ordering.clone(),
            limit: self.limit,
            offset: self.offset,
            _record: PhantomData,
        }
    }
}

impl<R> fmt::Debug for Query<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("filter", &self.filter)
            .field("ordering", &self.ordering)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}

/// Lowers queries against one mapping into SQL.
#[derive(Debug, Clone, Copy)]
pub struct QueryTranslator<'m> {
    mapping: &'m TableMapping,
    codec: ValueCodec,
}

/// Translates `query` into a `SELECT * ...` statement.
pub fn translate<R>(
    mapping: &TableMapping,
    codec: &ValueCodec,
    query: &Query<R>,
) -> Result<SqlStatement, QueryError> {
    QueryTranslator::new(mapping, *codec).select(query)
}

impl<'m> QueryTranslator<'m> {
    pub fn new(mapping: &'m TableMapping, codec: ValueCodec) -> Self {
        Self { mapping, codec }
    }

    /// `SELECT * FROM t [WHERE ..] [ORDER BY ..] [LIMIT ? [OFFSET ?]]`
    pub fn select<R>(&self, query: &Query<R>) -> Result<SqlStatement, QueryError> {
        let mut sql = format!("SELECT * FROM {}", quote_ident(self.mapping.table_name()));
        let mut params = Vec::new();
        self.push_where(query.predicate(), &mut sql, &mut params)?;

        if !query.ordering.is_empty() {
            let keys = query
                .ordering
                .iter()
                .map(|o| {
                    let column = self.column(&o.field)?;
                    Ok(format!("{} {}", quote_ident(&column.name), o.order.keyword()))
                })
                .collect::<Result<Vec<_>, QueryError>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }

        match (query.limit, query.offset) {
            (None, None) => {}
            (limit, offset) => {
                sql.push_str(" LIMIT ?");
                // SQLite treats a negative limit as "no limit".
                params.push(SqlValue::Integer(limit.map_or(-1, clamp)));
                if let Some(offset) = offset {
                    sql.push_str(" OFFSET ?");
                    params.push(SqlValue::Integer(clamp(offset)));
                }
            }
        }

        Ok(SqlStatement::new(sql, params))
    }

    /// `SELECT COUNT(*) FROM t [WHERE ..]`; ordering and paging are ignored.
    pub fn count<R>(&self, query: &Query<R>) -> Result<SqlStatement, QueryError> {
        let mut sql = format!(
            "SELECT COUNT(*) FROM {}",
            quote_ident(self.mapping.table_name())
        );
        let mut params = Vec::new();
        self.push_where(query.predicate(), &mut sql, &mut params)?;
        Ok(SqlStatement::new(sql, params))
    }

    /// `DELETE FROM t [WHERE ..]`; ordering and paging are ignored.
    pub fn delete<R>(&self, query: &Query<R>) -> Result<SqlStatement, QueryError> {
        let mut sql = format!("DELETE FROM {}", quote_ident(self.mapping.table_name()));
        let mut params = Vec::new();
        self.push_where(query.predicate(), &mut sql, &mut params)?;
        Ok(SqlStatement::new(sql, params))
    }

    /// Lowers a bare predicate into a SQL fragment and its parameters.
    pub fn predicate(&self, expr: &Expr) -> Result<SqlStatement, QueryError> {
        let mut sql = String::new();
        let mut params = Vec::new();
        self.lower(expr, &mut sql, &mut params)?;
        Ok(SqlStatement::new(sql, params))
    }

    fn push_where(
        &self,
        predicate: Option<&Expr>,
        sql: &mut String,
        params: &mut Vec<SqlValue>,
    ) -> Result<(), QueryError> {
        if let Some(expr) = predicate {
            let mut clause = String::new();
            self.lower(expr, &mut clause, params)?;
            sql.push_str(" WHERE ");
            sql.push_str(&clause);
        }
        Ok(())
    }

    fn column(&self, field: &str) -> Result<&'m ColumnMapping, QueryError> {
        self.mapping
            .column_for_field(field)
            .ok_or_else(|| QueryError::UnknownField {
                table: self.mapping.table_name().to_string(),
                field: field.to_string(),
            })
    }

    fn lower(
        &self,
        expr: &Expr,
        sql: &mut String,
        params: &mut Vec<SqlValue>,
    ) -> Result<(), QueryError> {
        match expr {
            Expr::Field(name) => {
                let column = self.column(name)?;
                if column.ty != SemanticType::Boolean {
                    return Err(QueryError::UnsupportedExpression(format!(
                        "field '{name}' of type {} used as a condition; only boolean fields can stand alone",
                        column.ty
                    )));
                }
                sql.push_str(&quote_ident(&column.name));
            }
            Expr::Literal(value) => match natural_type(value) {
                None => sql.push_str("NULL"),
                Some(ty) => {
                    sql.push('?');
                    params.push(self.codec.encode(ty, value)?);
                }
            },
            Expr::Compare { op, lhs, rhs } => match (lhs.as_ref(), rhs.as_ref()) {
                (Expr::Field(name), Expr::Literal(value)) => {
                    self.lower_comparison(name, *op, value, sql, params)?;
                }
                (Expr::Literal(value), Expr::Field(name)) => {
                    self.lower_comparison(name, op.mirror(), value, sql, params)?;
                }
                (lhs, rhs) => {
                    return Err(QueryError::UnsupportedExpression(format!(
                        "comparison between {lhs} and {rhs}; only field-to-constant comparisons are supported"
                    )));
                }
            },
            Expr::And(lhs, rhs) => self.lower_binary("AND", lhs, rhs, sql, params)?,
            Expr::Or(lhs, rhs) => self.lower_binary("OR", lhs, rhs, sql, params)?,
            Expr::Not(inner) => {
                sql.push_str("NOT (");
                self.lower(inner, sql, params)?;
                sql.push(')');
            }
        }
        Ok(())
    }

    fn lower_binary(
        &self,
        keyword: &str,
        lhs: &Expr,
        rhs: &Expr,
        sql: &mut String,
        params: &mut Vec<SqlValue>,
    ) -> Result<(), QueryError> {
        sql.push('(');
        self.lower(lhs, sql, params)?;
        sql.push(' ');
        sql.push_str(keyword);
        sql.push(' ');
        self.lower(rhs, sql, params)?;
        sql.push(')');
        Ok(())
    }

    fn lower_comparison(
        &self,
        field: &str,
        op: CompareOp,
        value: &FieldValue,
        sql: &mut String,
        params: &mut Vec<SqlValue>,
    ) -> Result<(), QueryError> {
        let column = self.column(field)?;
        let name = quote_ident(&column.name);
        if value.is_null() {
            let test = match op {
                CompareOp::Eq => "IS NULL",
                CompareOp::Ne => "IS NOT NULL",
                other => {
                    return Err(QueryError::UnsupportedExpression(format!(
                        "'{}' against null",
                        other.symbol()
                    )));
                }
            };
            sql.push_str(&format!("{name} {test}"));
            return Ok(());
        }
        sql.push_str(&format!("{name} {} ?", op.symbol()));
        params.push(self.codec.encode(column.ty, value)?);
        Ok(())
    }
}

fn clamp(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn natural_type(value: &FieldValue) -> Option<SemanticType> {
    match value {
        FieldValue::Null => None,
        FieldValue::Integer(_) => Some(SemanticType::Integer),
        FieldValue::Real(_) => Some(SemanticType::Real),
        FieldValue::Text(_) => Some(SemanticType::Text),
        FieldValue::Blob(_) => Some(SemanticType::Blob),
        FieldValue::Boolean(_) => Some(SemanticType::Boolean),
        FieldValue::DateTime(_) => Some(SemanticType::DateTime),
        FieldValue::Enum(_) => Some(SemanticType::Enum),
        FieldValue::Json(_) => Some(SemanticType::Complex),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CodecError, FieldDescriptor, TypeDescriptor, build_mapping};

    struct Row;

    fn mapping() -> TableMapping {
        build_mapping(
            TypeDescriptor::new("Orders")
                .field(FieldDescriptor::new("id", SemanticType::Integer).primary_key())
                .field(FieldDescriptor::new("name", SemanticType::Text))
                .field(FieldDescriptor::new("status", SemanticType::Enum))
                .field(FieldDescriptor::new("active", SemanticType::Boolean))
                .field(FieldDescriptor::new("table_name", SemanticType::Text).column("tbl_name")),
        )
        .finalize()
        .unwrap()
    }

    fn select(query: Query<Row>) -> Result<SqlStatement, QueryError> {
        translate(&mapping(), &ValueCodec::default(), &query)
    }

    #[test]
    fn test_simple_equality() {
        let stmt = select(Query::new().filter(field("name").eq("Shipped"))).unwrap();
        assert!(stmt.sql.contains("name = ?"));
        assert_eq!(stmt.params, vec![SqlValue::Text("Shipped".into())]);
    }

    #[test]
    fn test_no_filter_selects_everything() {
        let stmt = select(Query::new()).unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM Orders");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_combinators_are_parenthesized() {
        let expr = field("id")
            .gt(1)
            .and(field("name").ne("x").or(not(field("status").eq(2))));
        let stmt = select(Query::new().filter(expr)).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM Orders WHERE (id > ? AND (name <> ? OR NOT (status = ?)))"
        );
        assert_eq!(
            stmt.params,
            vec![
                SqlValue::Integer(1),
                SqlValue::Text("x".into()),
                SqlValue::Integer(2)
            ]
        );
    }

    #[test]
    fn test_repeated_filters_are_anded() {
        let stmt = select(
            Query::new()
                .filter(field("id").ge(3))
                .filter(field("id").le(9)),
        )
        .unwrap();
        assert!(stmt.sql.ends_with("WHERE (id >= ? AND id <= ?)"));
    }

    #[test]
    fn test_literal_first_is_mirrored() {
        let expr = Expr::compare(CompareOp::Lt, lit(5), field("id"));
        let stmt = select(Query::new().filter(expr)).unwrap();
        assert!(stmt.sql.ends_with("WHERE id > ?"));
    }

    #[test]
    fn test_null_comparisons() {
        let stmt = select(Query::new().filter(field("name").is_null())).unwrap();
        assert!(stmt.sql.ends_with("WHERE name IS NULL"));
        assert!(stmt.params.is_empty());

        let stmt = select(Query::new().filter(field("name").is_not_null())).unwrap();
        assert!(stmt.sql.ends_with("WHERE name IS NOT NULL"));

        let err = select(Query::new().filter(Expr::compare(
            CompareOp::Lt,
            field("name"),
            lit(FieldValue::Null),
        )))
        .unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedExpression(_)));
    }

    #[test]
    fn test_unknown_field_fails() {
        let err = select(Query::new().filter(field("missing").eq(1))).unwrap_err();
        assert_eq!(
            err,
            QueryError::UnknownField {
                table: "Orders".into(),
                field: "missing".into()
            }
        );
        let err = select(Query::new().order_by("nope", SortOrder::Asc)).unwrap_err();
        assert!(matches!(err, QueryError::UnknownField { .. }));
    }

    #[test]
    fn test_field_to_field_is_unsupported() {
        let expr = Expr::compare(CompareOp::Eq, field("id"), field("status"));
        let err = select(Query::new().filter(expr)).unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedExpression(_)));
    }

    #[test]
    fn test_literal_is_encoded_with_column_type() {
        let stmt = select(Query::new().filter(field("active").eq(true))).unwrap();
        assert_eq!(stmt.params, vec![SqlValue::Integer(1)]);

        let err = select(Query::new().filter(field("id").eq("abc"))).unwrap_err();
        assert!(matches!(
            err,
            QueryError::Codec(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_bare_boolean_field_predicate() {
        let stmt = select(Query::new().filter(not(field("active")))).unwrap();
        assert!(stmt.sql.ends_with("WHERE NOT (active)"));
    }

    #[test]
    fn test_bare_non_boolean_field_is_unsupported() {
        let err = select(Query::new().filter(field("name"))).unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedExpression(_)));

        let err = select(Query::new().filter(field("active").and(field("status")))).unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedExpression(_)));
    }

    #[test]
    fn test_ordering_paging_and_column_names() {
        let stmt = select(
            Query::new()
                .filter(field("table_name").eq("OrderLine"))
                .order_by("name", SortOrder::Asc)
                .then_by("id", SortOrder::Desc)
                .limit(10)
                .offset(20),
        )
        .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM Orders WHERE tbl_name = ? ORDER BY name ASC, id DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            &stmt.params[1..],
            &[SqlValue::Integer(10), SqlValue::Integer(20)]
        );
    }

    #[test]
    fn test_offset_without_limit() {
        let stmt = select(Query::new().offset(5)).unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM Orders LIMIT ? OFFSET ?");
        assert_eq!(stmt.params, vec![SqlValue::Integer(-1), SqlValue::Integer(5)]);
    }

    #[test]
    fn test_count_and_delete() {
        let m = mapping();
        let translator = QueryTranslator::new(&m, ValueCodec::default());
        let query = Query::<Row>::new()
            .filter(field("id").lt(4))
            .order_by("id", SortOrder::Asc)
            .limit(1);
        assert_eq!(
            translator.count(&query).unwrap().sql,
            "SELECT COUNT(*) FROM Orders WHERE id < ?"
        );
        let delete = translator.delete(&query).unwrap();
        assert_eq!(delete.sql, "DELETE FROM Orders WHERE id < ?");
        assert_eq!(delete.params, vec![SqlValue::Integer(4)]);
    }
}
