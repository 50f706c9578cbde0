//! Type tags shared by descriptors, mappings and the codec.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic type of a mapped field.
///
/// The tag decides how a field value is encoded into one of the engine's
/// storage classes and which DDL keyword its column is declared with.
///
/// # Examples
///
/// ```
/// use tablemap_core::{SemanticType, StorageClass, DateTimeStorage};
///
/// assert_eq!(SemanticType::Boolean.storage_class(DateTimeStorage::Text), StorageClass::Integer);
/// assert_eq!(SemanticType::Complex.storage_class(DateTimeStorage::Text), StorageClass::Text);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    /// Signed 64-bit integer.
    Integer,
    /// Double-precision float.
    Real,
    /// UTF-8 text.
    Text,
    /// Raw bytes.
    Blob,
    /// Stored as 0/1.
    Boolean,
    /// UTC timestamp, representation chosen by [`DateTimeStorage`].
    DateTime,
    /// Enumeration stored as its integer discriminant.
    Enum,
    /// Nested record or sequence stored as JSON text.
    Complex,
}

impl SemanticType {
    /// Returns the native storage class used for this type.
    pub fn storage_class(self, datetime: DateTimeStorage) -> StorageClass {
        match self {
            SemanticType::Integer | SemanticType::Boolean | SemanticType::Enum => {
                StorageClass::Integer
            }
            SemanticType::Real => StorageClass::Real,
            SemanticType::Text | SemanticType::Complex => StorageClass::Text,
            SemanticType::Blob => StorageClass::Blob,
            SemanticType::DateTime => match datetime {
                DateTimeStorage::Text => StorageClass::Text,
                DateTimeStorage::UnixNanos => StorageClass::Integer,
            },
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticType::Integer => "integer",
            SemanticType::Real => "real",
            SemanticType::Text => "text",
            SemanticType::Blob => "blob",
            SemanticType::Boolean => "boolean",
            SemanticType::DateTime => "datetime",
            SemanticType::Enum => "enum",
            SemanticType::Complex => "complex",
        };
        f.write_str(name)
    }
}

/// Engine-native value category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    Null,
    Integer,
    Real,
    Text,
    Blob,
}

impl StorageClass {
    /// DDL keyword for a column of this class.
    pub fn keyword(self) -> &'static str {
        match self {
            StorageClass::Null => "",
            StorageClass::Integer => "INTEGER",
            StorageClass::Real => "REAL",
            StorageClass::Text => "TEXT",
            StorageClass::Blob => "BLOB",
        }
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageClass::Null => "null",
            StorageClass::Integer => "integer",
            StorageClass::Real => "real",
            StorageClass::Text => "text",
            StorageClass::Blob => "blob",
        };
        f.write_str(name)
    }
}

/// How datetime fields are physically stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateTimeStorage {
    /// RFC 3339 text with nanosecond precision, always in UTC (`Z`).
    #[default]
    Text,
    /// Integer nanoseconds since the Unix epoch.
    UnixNanos,
}

/// Sort direction for orderings and index columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Physical storage mode of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageMode {
    /// Regular table with an implicit row identifier.
    #[default]
    RowId,
    /// The primary key is the clustering key.
    WithoutRowId,
}
