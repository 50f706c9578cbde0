//! Conversion between core [`SqlValue`]s and rusqlite values.

use rusqlite::Row;
use rusqlite::types::{Value, ValueRef};
use tablemap_core::{CodecError, SqlValue};

use crate::error::{EngineContext, Operation, Result};

/// Converts a bound parameter into an owned rusqlite value.
pub(crate) fn to_engine(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(v) => Value::Integer(*v),
        SqlValue::Real(v) => Value::Real(*v),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Blob(b) => Value::Blob(b.clone()),
    }
}

/// Converts a borrowed column value read from a row.
pub(crate) fn from_engine(value: ValueRef<'_>) -> std::result::Result<SqlValue, CodecError> {
    Ok(match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(v) => SqlValue::Integer(v),
        ValueRef::Real(v) => SqlValue::Real(v),
        ValueRef::Text(bytes) => SqlValue::Text(
            std::str::from_utf8(bytes)
                .map_err(|_| CodecError::InvalidUtf8)?
                .to_string(),
        ),
        ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
    })
}

/// Reads every column of `row` in result order.
pub(crate) fn row_values(row: &Row<'_>, width: usize) -> Result<Vec<SqlValue>> {
    let mut values = Vec::with_capacity(width);
    for index in 0..width {
        let value = row.get_ref(index).during(Operation::Query)?;
        values.push(from_engine(value)?);
    }
    Ok(values)
}
