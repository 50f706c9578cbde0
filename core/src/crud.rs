//! Insert, update, delete and point-select statement rendering.
//!
//! All statements use positional `?` placeholders; values travel separately
//! in [`SqlStatement::params`], already encoded by the [`ValueCodec`].
//! The functions here never touch a connection and are safe to call inside
//! or outside a transaction.

use crate::codec::ValueCodec;
use crate::error::CrudError;
use crate::ident::quote_ident;
use crate::mapping::{ColumnMapping, TableMapping};
use crate::record::Record;
use crate::value::{FieldValue, SqlValue};

/// SQL text with its ordered positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl SqlStatement {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Conflict clause for inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnConflict {
    /// Plain `INSERT`; constraint violations fail the statement.
    #[default]
    Abort,
    /// `INSERT OR REPLACE`; an existing row with the same key is replaced.
    Replace,
}

/// A rendered insert.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub statement: SqlStatement,
    /// `true` when the key column was left out and the engine assigns it.
    pub generates_key: bool,
}

fn require_key<'m>(mapping: &'m TableMapping) -> Result<&'m ColumnMapping, CrudError> {
    mapping
        .primary_key()
        .ok_or_else(|| CrudError::NoPrimaryKey(mapping.table_name().to_string()))
}

/// Returns `true` when the record's key still equals the key of `R::default()`.
pub fn is_key_unset<R: Record>(mapping: &TableMapping, record: &R) -> Result<bool, CrudError> {
    let Some(key) = mapping.primary_key() else {
        return Ok(false);
    };
    let current = record.get(&key.field)?;
    let default = R::default().get(&key.field)?;
    Ok(current == default)
}

/// Renders an insert for `record`.
///
/// The key column is omitted when the mapping is autoincrement and the
/// record's key is unset; any other key value is sent explicitly.
pub fn insert_sql<R: Record>(
    mapping: &TableMapping,
    codec: &ValueCodec,
    record: &R,
    conflict: OnConflict,
) -> Result<InsertStatement, CrudError> {
    let generates_key = mapping.is_auto_increment() && is_key_unset(mapping, record)?;

    let mut names = Vec::with_capacity(mapping.columns().len());
    let mut params = Vec::with_capacity(mapping.columns().len());
    for column in mapping.columns() {
        if generates_key && column.is_primary_key {
            continue;
        }
        names.push(quote_ident(&column.name).into_owned());
        params.push(codec.encode(column.ty, &record.get(&column.field)?)?);
    }

    let verb = match conflict {
        OnConflict::Abort => "INSERT",
        OnConflict::Replace => "INSERT OR REPLACE",
    };
    let table = quote_ident(mapping.table_name());
    let sql = if names.is_empty() {
        format!("{verb} INTO {table} DEFAULT VALUES")
    } else {
        let placeholders = vec!["?"; names.len()].join(", ");
        format!(
            "{verb} INTO {table} ({}) VALUES ({placeholders})",
            names.join(", ")
        )
    };

    Ok(InsertStatement {
        statement: SqlStatement::new(sql, params),
        generates_key,
    })
}

/// Renders an update of every non-key column; the key is bound last.
///
/// # Errors
///
/// [`CrudError::MissingKeyForUpdate`] when the record's key is unset, and
/// [`CrudError::NoPrimaryKey`] when the mapping has no key.
pub fn update_sql<R: Record>(
    mapping: &TableMapping,
    codec: &ValueCodec,
    record: &R,
) -> Result<SqlStatement, CrudError> {
    let key = require_key(mapping)?;
    if is_key_unset(mapping, record)? {
        return Err(CrudError::MissingKeyForUpdate(
            mapping.table_name().to_string(),
        ));
    }

    let mut assignments = Vec::new();
    let mut params = Vec::new();
    for column in mapping.columns().iter().filter(|c| !c.is_primary_key) {
        assignments.push(format!("{} = ?", quote_ident(&column.name)));
        params.push(codec.encode(column.ty, &record.get(&column.field)?)?);
    }

    let key_value = codec.encode(key.ty, &record.get(&key.field)?)?;
    let key_name = quote_ident(&key.name);
    if assignments.is_empty() {
        // Key-only table: keep the statement valid and row-counting.
        assignments.push(format!("{key_name} = ?"));
        params.push(key_value.clone());
    }
    params.push(key_value);

    let sql = format!(
        "UPDATE {} SET {} WHERE {key_name} = ?",
        quote_ident(mapping.table_name()),
        assignments.join(", ")
    );
    Ok(SqlStatement::new(sql, params))
}

/// Renders a delete of the row identified by `record`'s key.
pub fn delete_sql<R: Record>(
    mapping: &TableMapping,
    codec: &ValueCodec,
    record: &R,
) -> Result<SqlStatement, CrudError> {
    let key = require_key(mapping)?;
    delete_by_key_sql(mapping, codec, &record.get(&key.field)?)
}

/// Renders a delete of the row whose key equals `key`.
pub fn delete_by_key_sql(
    mapping: &TableMapping,
    codec: &ValueCodec,
    key: &FieldValue,
) -> Result<SqlStatement, CrudError> {
    let column = require_key(mapping)?;
    let sql = format!(
        "DELETE FROM {} WHERE {} = ?",
        quote_ident(mapping.table_name()),
        quote_ident(&column.name)
    );
    Ok(SqlStatement::new(sql, vec![codec.encode(column.ty, key)?]))
}

/// Renders a select of the row whose key equals `key`.
pub fn select_by_key_sql(
    mapping: &TableMapping,
    codec: &ValueCodec,
    key: &FieldValue,
) -> Result<SqlStatement, CrudError> {
    let column = require_key(mapping)?;
    let sql = format!(
        "SELECT * FROM {} WHERE {} = ? LIMIT 1",
        quote_ident(mapping.table_name()),
        quote_ident(&column.name)
    );
    Ok(SqlStatement::new(sql, vec![codec.encode(column.ty, key)?]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MappingBuilder, Record};

    #[derive(Debug, Default)]
    struct Product {
        id: i64,
        name: String,
        price: f64,
    }

    crate::impl_record!(Product {
        id: Integer,
        name: Text,
        price: Real,
    });

    #[derive(Debug, Default)]
    struct Tag {
        code: String,
        hits: i32,
    }

    crate::impl_record!(Tag {
        code: Text => primary_key,
        hits: Integer,
    });

    fn product_mapping() -> TableMapping {
        Product::mapping()
            .set_table_name("Product")
            .set_primary_key("id", true)
            .finalize()
            .unwrap()
    }

    #[test]
    fn test_insert_omits_unset_autoincrement_key() {
        let mapping = product_mapping();
        let record = Product {
            id: 0,
            name: "Widget".into(),
            price: 2.5,
        };
        let insert = insert_sql(&mapping, &ValueCodec::default(), &record, OnConflict::Abort).unwrap();
        assert!(insert.generates_key);
        assert_eq!(
            insert.statement.sql,
            "INSERT INTO Product (name, price) VALUES (?, ?)"
        );
        assert_eq!(
            insert.statement.params,
            vec![SqlValue::Text("Widget".into()), SqlValue::Real(2.5)]
        );
    }

    #[test]
    fn test_insert_honors_caller_assigned_key() {
        let mapping = product_mapping();
        let record = Product {
            id: 42,
            ..Default::default()
        };
        let insert =
            insert_sql(&mapping, &ValueCodec::default(), &record, OnConflict::Replace).unwrap();
        assert!(!insert.generates_key);
        assert_eq!(
            insert.statement.sql,
            "INSERT OR REPLACE INTO Product (id, name, price) VALUES (?, ?, ?)"
        );
        assert_eq!(insert.statement.params[0], SqlValue::Integer(42));
    }

    #[test]
    fn test_insert_keeps_non_autoincrement_key() {
        let mapping = Tag::mapping().finalize().unwrap();
        let insert = insert_sql(
            &mapping,
            &ValueCodec::default(),
            &Tag::default(),
            OnConflict::Abort,
        )
        .unwrap();
        assert!(!insert.generates_key);
        assert_eq!(insert.statement.params.len(), 2);
    }

    #[test]
    fn test_insert_default_values_when_only_key() {
        #[derive(Debug, Default)]
        struct Counter {
            id: i64,
        }
        crate::impl_record!(Counter { id: Integer => primary_key auto_increment });

        let mapping = MappingBuilder::for_record::<Counter>().finalize().unwrap();
        let insert = insert_sql(
            &mapping,
            &ValueCodec::default(),
            &Counter::default(),
            OnConflict::Abort,
        )
        .unwrap();
        assert_eq!(insert.statement.sql, "INSERT INTO Counter DEFAULT VALUES");
        assert!(insert.statement.params.is_empty());
    }

    #[test]
    fn test_update_binds_key_last() {
        let mapping = product_mapping();
        let record = Product {
            id: 7,
            name: "Gadget".into(),
            price: 1.0,
        };
        let stmt = update_sql(&mapping, &ValueCodec::default(), &record).unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE Product SET name = ?, price = ? WHERE id = ?"
        );
        assert_eq!(stmt.params.last(), Some(&SqlValue::Integer(7)));
    }

    #[test]
    fn test_update_with_unset_key_fails() {
        let mapping = product_mapping();
        let err = update_sql(&mapping, &ValueCodec::default(), &Product::default()).unwrap_err();
        assert_eq!(err, CrudError::MissingKeyForUpdate("Product".into()));
    }

    #[test]
    fn test_update_without_key_fails() {
        let mapping = Product::mapping().finalize().unwrap();
        let record = Product {
            id: 1,
            ..Default::default()
        };
        assert_eq!(
            update_sql(&mapping, &ValueCodec::default(), &record).unwrap_err(),
            CrudError::NoPrimaryKey("Product".into())
        );
    }

    #[test]
    fn test_delete_and_select_by_key() {
        let mapping = Tag::mapping().finalize().unwrap();
        let codec = ValueCodec::default();
        let record = Tag {
            code: "rust".into(),
            hits: 3,
        };
        let delete = delete_sql(&mapping, &codec, &record).unwrap();
        assert_eq!(delete.sql, "DELETE FROM Tag WHERE code = ?");
        assert_eq!(delete.params, vec![SqlValue::Text("rust".into())]);

        let select = select_by_key_sql(&mapping, &codec, &FieldValue::from("rust")).unwrap();
        assert_eq!(select.sql, "SELECT * FROM Tag WHERE code = ? LIMIT 1");
    }

    #[test]
    fn test_key_literal_type_mismatch() {
        let mapping = Tag::mapping().finalize().unwrap();
        let err = select_by_key_sql(&mapping, &ValueCodec::default(), &FieldValue::Integer(1))
            .unwrap_err();
        assert!(matches!(err, CrudError::Codec(_)));
    }
}
