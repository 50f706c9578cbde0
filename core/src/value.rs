//! Typed field values, storable SQL values, and conversions from Rust types.
//!
//! Two value types flow through the crate:
//!
//! - [`FieldValue`] is what a record field holds, tagged by its semantic kind.
//! - [`SqlValue`] is what the engine stores: one of its native storage classes.
//!
//! The [`ValueCodec`](crate::ValueCodec) converts between the two. Record
//! implementations move between their Rust fields and [`FieldValue`] through
//! [`ToFieldValue`] and [`FromFieldValue`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CodecError;
use crate::types::{SemanticType, StorageClass};

/// A value as stored by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Returns the storage class of this value.
    pub fn storage_class(&self) -> StorageClass {
        match self {
            SqlValue::Null => StorageClass::Null,
            SqlValue::Integer(_) => StorageClass::Integer,
            SqlValue::Real(_) => StorageClass::Real,
            SqlValue::Text(_) => StorageClass::Text,
            SqlValue::Blob(_) => StorageClass::Blob,
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Real(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Blob(value)
    }
}

/// A typed field value.
///
/// `Null` represents an absent value for any field type. `Json` carries a
/// nested record or sequence destined for a complex column.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Enum(i64),
    Json(serde_json::Value),
}

impl FieldValue {
    /// Returns `true` for [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Integer(_) => "integer",
            FieldValue::Real(_) => "real",
            FieldValue::Text(_) => "text",
            FieldValue::Blob(_) => "blob",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::DateTime(_) => "datetime",
            FieldValue::Enum(_) => "enum",
            FieldValue::Json(_) => "json",
        }
    }

    fn mismatch(&self, expected: SemanticType) -> CodecError {
        CodecError::TypeMismatch {
            expected,
            found: self.kind().to_string(),
        }
    }
}

macro_rules! field_value_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::$variant(value.into())
                }
            }
        )+
    };
}

field_value_from! {
    i64 => Integer,
    i32 => Integer,
    i16 => Integer,
    i8 => Integer,
    u32 => Integer,
    u16 => Integer,
    u8 => Integer,
    f64 => Real,
    f32 => Real,
    bool => Boolean,
    String => Text,
    Vec<u8> => Blob,
    DateTime<Utc> => DateTime,
    serde_json::Value => Json,
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Converts a Rust field into a [`FieldValue`].
pub trait ToFieldValue {
    fn to_field_value(&self) -> Result<FieldValue, CodecError>;
}

/// Rebuilds a Rust field from a decoded [`FieldValue`].
pub trait FromFieldValue: Sized {
    fn from_field_value(value: FieldValue) -> Result<Self, CodecError>;
}

impl ToFieldValue for FieldValue {
    fn to_field_value(&self) -> Result<FieldValue, CodecError> {
        Ok(self.clone())
    }
}

impl FromFieldValue for FieldValue {
    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        Ok(value)
    }
}

impl ToFieldValue for i64 {
    fn to_field_value(&self) -> Result<FieldValue, CodecError> {
        Ok(FieldValue::Integer(*self))
    }
}

impl FromFieldValue for i64 {
    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Integer(v) | FieldValue::Enum(v) => Ok(v),
            FieldValue::Boolean(b) => Ok(i64::from(b)),
            FieldValue::Null => Err(CodecError::UnexpectedNull("i64")),
            other => Err(other.mismatch(SemanticType::Integer)),
        }
    }
}

macro_rules! narrow_integer {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl ToFieldValue for $ty {
                fn to_field_value(&self) -> Result<FieldValue, CodecError> {
                    Ok(FieldValue::Integer(i64::from(*self)))
                }
            }

            impl FromFieldValue for $ty {
                fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
                    if value.is_null() {
                        return Err(CodecError::UnexpectedNull(stringify!($ty)));
                    }
                    let wide = i64::from_field_value(value)?;
                    <$ty>::try_from(wide).map_err(|_| CodecError::OutOfRange {
                        value: wide.to_string(),
                        target: stringify!($ty),
                    })
                }
            }
        )+
    };
}

narrow_integer!(i32, i16, i8, u32, u16, u8);

impl ToFieldValue for f64 {
    fn to_field_value(&self) -> Result<FieldValue, CodecError> {
        Ok(FieldValue::Real(*self))
    }
}

impl FromFieldValue for f64 {
    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Real(v) => Ok(v),
            FieldValue::Integer(v) => Ok(v as f64),
            FieldValue::Null => Err(CodecError::UnexpectedNull("f64")),
            other => Err(other.mismatch(SemanticType::Real)),
        }
    }
}

impl ToFieldValue for f32 {
    fn to_field_value(&self) -> Result<FieldValue, CodecError> {
        Ok(FieldValue::Real(f64::from(*self)))
    }
}

impl FromFieldValue for f32 {
    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        if value.is_null() {
            return Err(CodecError::UnexpectedNull("f32"));
        }
        let wide = f64::from_field_value(value)?;
        if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
            return Err(CodecError::OutOfRange {
                value: wide.to_string(),
                target: "f32",
            });
        }
        Ok(wide as f32)
    }
}

impl ToFieldValue for bool {
    fn to_field_value(&self) -> Result<FieldValue, CodecError> {
        Ok(FieldValue::Boolean(*self))
    }
}

impl FromFieldValue for bool {
    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Boolean(b) => Ok(b),
            FieldValue::Integer(v) => Ok(v != 0),
            FieldValue::Null => Err(CodecError::UnexpectedNull("bool")),
            other => Err(other.mismatch(SemanticType::Boolean)),
        }
    }
}

impl ToFieldValue for String {
    fn to_field_value(&self) -> Result<FieldValue, CodecError> {
        Ok(FieldValue::Text(self.clone()))
    }
}

impl FromFieldValue for String {
    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Text(s) => Ok(s),
            FieldValue::Null => Err(CodecError::UnexpectedNull("String")),
            other => Err(other.mismatch(SemanticType::Text)),
        }
    }
}

impl ToFieldValue for Vec<u8> {
    fn to_field_value(&self) -> Result<FieldValue, CodecError> {
        Ok(FieldValue::Blob(self.clone()))
    }
}

impl FromFieldValue for Vec<u8> {
    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Blob(b) => Ok(b),
            FieldValue::Null => Err(CodecError::UnexpectedNull("Vec<u8>")),
            other => Err(other.mismatch(SemanticType::Blob)),
        }
    }
}

impl ToFieldValue for DateTime<Utc> {
    fn to_field_value(&self) -> Result<FieldValue, CodecError> {
        Ok(FieldValue::DateTime(*self))
    }
}

impl FromFieldValue for DateTime<Utc> {
    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::DateTime(d) => Ok(d),
            FieldValue::Null => Err(CodecError::UnexpectedNull("DateTime<Utc>")),
            other => Err(other.mismatch(SemanticType::DateTime)),
        }
    }
}

impl<T: ToFieldValue> ToFieldValue for Option<T> {
    fn to_field_value(&self) -> Result<FieldValue, CodecError> {
        match self {
            Some(inner) => inner.to_field_value(),
            None => Ok(FieldValue::Null),
        }
    }
}

impl<T: FromFieldValue> FromFieldValue for Option<T> {
    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Null => Ok(None),
            other => T::from_field_value(other).map(Some),
        }
    }
}

/// Wrapper that stores any serde type in a complex (JSON) column.
///
/// Wrap nested records and sequences in `Option<Json<T>>` so that an unset
/// field (`None`) stays distinct from an empty collection.
///
/// # Examples
///
/// ```
/// use tablemap_core::{FieldValue, FromFieldValue, Json, ToFieldValue};
///
/// let tags = Json(vec!["a".to_string(), "b".to_string()]);
/// let value = tags.to_field_value().unwrap();
/// assert!(matches!(value, FieldValue::Json(_)));
///
/// let back: Json<Vec<String>> = Json::from_field_value(value).unwrap();
/// assert_eq!(back.0, vec!["a", "b"]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Serialize> ToFieldValue for Json<T> {
    fn to_field_value(&self) -> Result<FieldValue, CodecError> {
        serde_json::to_value(&self.0)
            .map(FieldValue::Json)
            .map_err(|e| CodecError::Serialize(e.to_string()))
    }
}

impl<T: DeserializeOwned> FromFieldValue for Json<T> {
    fn from_field_value(value: FieldValue) -> Result<Self, CodecError> {
        match value {
            FieldValue::Json(json) => serde_json::from_value(json)
                .map(Json)
                .map_err(|e| CodecError::MalformedJson(e.to_string())),
            FieldValue::Null => Err(CodecError::UnexpectedNull("Json")),
            other => Err(other.mismatch(SemanticType::Complex)),
        }
    }
}
