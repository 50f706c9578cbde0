//! Error types for mapping, encoding and translation.
//!
//! Every failure in this crate is detected before a statement reaches the
//! database engine, and each failure domain has its own error type:
//!
//! - [`SchemaError`]: raised by [`MappingBuilder::finalize`](crate::MappingBuilder::finalize)
//! - [`CodecError`]: raised while converting a single field value
//! - [`QueryError`]: raised while lowering a query expression to SQL
//! - [`CrudError`]: raised while rendering insert/update/delete statements

use thiserror::Error;

use crate::types::{SemanticType, StorageClass};

/// Errors detected when a mapping builder is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The type contributes no persistable fields.
    #[error("type '{0}' has no persistable fields")]
    NoColumns(String),

    /// The table name is empty.
    #[error("table name cannot be empty")]
    EmptyTableName,

    /// Autoincrement was requested on a key that cannot carry it.
    #[error("invalid autoincrement on '{table}': {reason}")]
    InvalidAutoIncrement { table: String, reason: String },

    /// An index names a field the type does not have.
    #[error("index '{index}' references unknown field '{field}'")]
    UnknownIndexColumn { index: String, field: String },

    /// A primary key or column override names a field the type does not have.
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// Two fields resolve to the same column name.
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    /// Two indices share a name.
    #[error("duplicate index name '{0}'")]
    DuplicateIndex(String),

    /// More than one field is flagged as primary key.
    #[error("table '{0}' declares more than one primary key")]
    MultiplePrimaryKeys(String),

    /// A `WITHOUT ROWID` table was requested without a primary key.
    #[error("table '{0}' is WITHOUT ROWID but declares no primary key")]
    WithoutRowIdRequiresPrimaryKey(String),
}

/// Errors raised while encoding or decoding a single value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A complex column holds text that is not valid JSON.
    #[error("malformed JSON in complex column: {0}")]
    MalformedJson(String),

    /// The stored value cannot be coerced to the requested type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: SemanticType, found: String },

    /// A numeric value does not fit the target type.
    #[error("value {value} out of range for {target}")]
    OutOfRange { value: String, target: &'static str },

    /// A null was read into a field that cannot hold one.
    #[error("unexpected null for non-nullable {0}")]
    UnexpectedNull(&'static str),

    /// Stored text is not valid UTF-8.
    #[error("stored text is not valid UTF-8")]
    InvalidUtf8,

    /// A record was asked for a field it does not declare.
    #[error("record has no field '{0}'")]
    UnknownField(String),

    /// A complex value could not be serialized to JSON.
    #[error("failed to serialize complex value: {0}")]
    Serialize(String),
}

impl CodecError {
    pub(crate) fn mismatch(expected: SemanticType, found: StorageClass) -> Self {
        CodecError::TypeMismatch {
            expected,
            found: found.to_string(),
        }
    }
}

/// Errors raised while translating a query expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The expression references a field with no mapped column.
    #[error("unknown field '{field}' on table '{table}'")]
    UnknownField { table: String, field: String },

    /// The expression uses a shape outside the supported grammar.
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// A literal could not be encoded for its column.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Errors raised while rendering write statements.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrudError {
    /// Update was called on a record whose key still holds its default value.
    #[error("cannot update '{0}': primary key is unset")]
    MissingKeyForUpdate(String),

    /// The mapping has no primary key to address a single row.
    #[error("table '{0}' has no primary key")]
    NoPrimaryKey(String),

    /// A field value could not be encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}
