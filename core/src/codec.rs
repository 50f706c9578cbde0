//! Conversion between typed field values and storable SQL values.
//!
//! Primitive semantic types map onto the engine's native storage classes.
//! `Complex` values (nested records, sequences) are stored as JSON text, and
//! an absent complex value is stored as SQL `NULL` rather than as `null` or
//! `[]`, so "never set" and "empty collection" stay distinguishable.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::CodecError;
use crate::types::{DateTimeStorage, SemanticType, StorageClass};
use crate::value::{FieldValue, SqlValue};

/// Encodes and decodes single field values.
///
/// The codec is a small `Copy` value; the only setting is how datetimes are
/// stored.
///
/// # Examples
///
/// ```
/// use tablemap_core::{FieldValue, SemanticType, SqlValue, ValueCodec};
///
/// let codec = ValueCodec::default();
/// let stored = codec.encode(SemanticType::Boolean, &FieldValue::Boolean(true)).unwrap();
/// assert_eq!(stored, SqlValue::Integer(1));
///
/// let back = codec.decode(SemanticType::Boolean, &stored).unwrap();
/// assert_eq!(back, FieldValue::Boolean(true));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValueCodec {
    datetime: DateTimeStorage,
}

impl ValueCodec {
    pub fn new(datetime: DateTimeStorage) -> Self {
        Self { datetime }
    }

    pub fn datetime_storage(&self) -> DateTimeStorage {
        self.datetime
    }

    /// Storage class a column of type `ty` is declared with.
    pub fn storage_class(&self, ty: SemanticType) -> StorageClass {
        ty.storage_class(self.datetime)
    }

    /// Encodes a field value for a column of type `ty`.
    ///
    /// Compatible variants are accepted (an `Integer` for an `Enum` column,
    /// an `Integer` for a `Real` column, and so on); anything else is a
    /// [`CodecError::TypeMismatch`].
    pub fn encode(&self, ty: SemanticType, value: &FieldValue) -> Result<SqlValue, CodecError> {
        if value.is_null() {
            return Ok(SqlValue::Null);
        }

        let encoded = match (ty, value) {
            (SemanticType::Integer, FieldValue::Integer(v) | FieldValue::Enum(v)) => {
                SqlValue::Integer(*v)
            }
            (SemanticType::Integer, FieldValue::Boolean(b)) => SqlValue::Integer(i64::from(*b)),
            (SemanticType::Real, FieldValue::Real(v)) => SqlValue::Real(*v),
            (SemanticType::Real, FieldValue::Integer(v)) => SqlValue::Real(*v as f64),
            (SemanticType::Text, FieldValue::Text(s)) => SqlValue::Text(s.clone()),
            (SemanticType::Blob, FieldValue::Blob(b)) => SqlValue::Blob(b.clone()),
            (SemanticType::Boolean, FieldValue::Boolean(b)) => SqlValue::Integer(i64::from(*b)),
            (SemanticType::Boolean, FieldValue::Integer(v)) => {
                SqlValue::Integer(i64::from(*v != 0))
            }
            (SemanticType::DateTime, FieldValue::DateTime(d)) => self.encode_datetime(d)?,
            (SemanticType::Enum, FieldValue::Enum(v) | FieldValue::Integer(v)) => {
                SqlValue::Integer(*v)
            }
            (SemanticType::Complex, FieldValue::Json(json)) => SqlValue::Text(
                serde_json::to_string(json).map_err(|e| CodecError::Serialize(e.to_string()))?,
            ),
            (expected, other) => {
                return Err(CodecError::TypeMismatch {
                    expected,
                    found: other.kind().to_string(),
                });
            }
        };
        Ok(encoded)
    }

    /// Decodes a stored value read from a column of type `ty`.
    ///
    /// SQL `NULL` decodes to [`FieldValue::Null`] for every type. Text that
    /// holds a number is accepted for numeric types, as the engine's own
    /// affinity rules would.
    pub fn decode(&self, ty: SemanticType, stored: &SqlValue) -> Result<FieldValue, CodecError> {
        if let SqlValue::Null = stored {
            return Ok(FieldValue::Null);
        }

        match ty {
            SemanticType::Integer => decode_integer(ty, stored).map(FieldValue::Integer),
            SemanticType::Enum => decode_integer(ty, stored).map(FieldValue::Enum),
            SemanticType::Boolean => decode_integer(ty, stored).map(|v| FieldValue::Boolean(v != 0)),
            SemanticType::Real => match stored {
                SqlValue::Real(v) => Ok(FieldValue::Real(*v)),
                SqlValue::Integer(v) => Ok(FieldValue::Real(*v as f64)),
                SqlValue::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(FieldValue::Real)
                    .map_err(|_| CodecError::mismatch(ty, StorageClass::Text)),
                other => Err(CodecError::mismatch(ty, other.storage_class())),
            },
            SemanticType::Text => match stored {
                SqlValue::Text(s) => Ok(FieldValue::Text(s.clone())),
                SqlValue::Integer(v) => Ok(FieldValue::Text(v.to_string())),
                SqlValue::Real(v) => Ok(FieldValue::Text(v.to_string())),
                other => Err(CodecError::mismatch(ty, other.storage_class())),
            },
            SemanticType::Blob => match stored {
                SqlValue::Blob(b) => Ok(FieldValue::Blob(b.clone())),
                SqlValue::Text(s) => Ok(FieldValue::Blob(s.as_bytes().to_vec())),
                other => Err(CodecError::mismatch(ty, other.storage_class())),
            },
            SemanticType::DateTime => decode_datetime(stored).map(FieldValue::DateTime),
            SemanticType::Complex => match stored {
                SqlValue::Text(s) => serde_json::from_str(s)
                    .map(FieldValue::Json)
                    .map_err(|e| CodecError::MalformedJson(e.to_string())),
                SqlValue::Blob(b) => serde_json::from_slice(b)
                    .map(FieldValue::Json)
                    .map_err(|e| CodecError::MalformedJson(e.to_string())),
                other => Err(CodecError::mismatch(ty, other.storage_class())),
            },
        }
    }

    fn encode_datetime(&self, value: &DateTime<Utc>) -> Result<SqlValue, CodecError> {
        match self.datetime {
            DateTimeStorage::Text => Ok(SqlValue::Text(
                value.to_rfc3339_opts(SecondsFormat::Nanos, true),
            )),
            DateTimeStorage::UnixNanos => value
                .timestamp_nanos_opt()
                .map(SqlValue::Integer)
                .ok_or_else(|| CodecError::OutOfRange {
                    value: value.to_rfc3339(),
                    target: "unix nanoseconds",
                }),
        }
    }
}

fn decode_integer(ty: SemanticType, stored: &SqlValue) -> Result<i64, CodecError> {
    match stored {
        SqlValue::Integer(v) => Ok(*v),
        SqlValue::Real(v) if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 => {
            Ok(*v as i64)
        }
        SqlValue::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| CodecError::mismatch(ty, StorageClass::Text)),
        other => Err(CodecError::mismatch(ty, other.storage_class())),
    }
}

// Either representation is accepted so a change of setting does not strand
// existing rows. Text goes through chrono's relaxed RFC 3339 parser, which
// also takes the signed expanded years written outside 0000..=9999.
fn decode_datetime(stored: &SqlValue) -> Result<DateTime<Utc>, CodecError> {
    match stored {
        SqlValue::Integer(nanos) => Ok(DateTime::from_timestamp_nanos(*nanos)),
        SqlValue::Text(s) => s
            .parse::<DateTime<Utc>>()
            .map_err(|_| CodecError::mismatch(SemanticType::DateTime, StorageClass::Text)),
        other => Err(CodecError::mismatch(
            SemanticType::DateTime,
            other.storage_class(),
        )),
    }
}
