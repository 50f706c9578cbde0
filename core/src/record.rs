//! The [`Record`] trait and macros that implement it.

use std::any::{TypeId, type_name};

use crate::descriptor::TypeDescriptor;
use crate::error::CodecError;
use crate::mapping::MappingBuilder;
use crate::value::FieldValue;

/// Identity of a Rust type that a mapping was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordType {
    pub id: TypeId,
    pub name: &'static str,
}

impl RecordType {
    pub fn of<R: 'static>() -> Self {
        Self {
            id: TypeId::of::<R>(),
            name: type_name::<R>(),
        }
    }
}

/// A Rust type that can be stored as a table row.
///
/// Implementations describe their fields once through [`descriptor`](Record::descriptor)
/// and expose each field by name. `Default` provides the "unset" state used
/// for autoincrement detection and as the starting point when rows are read
/// back. Most types use [`impl_record!`](crate::impl_record) rather than a
/// hand-written impl.
pub trait Record: Default + 'static {
    /// Describes the persistable fields of this type.
    fn descriptor() -> TypeDescriptor;

    /// Reads a field by name.
    fn get(&self, field: &str) -> Result<FieldValue, CodecError>;

    /// Writes a field by name.
    fn set(&mut self, field: &str, value: FieldValue) -> Result<(), CodecError>;

    /// Mapping used when none has been registered for this type.
    ///
    /// Override to set a table name, key or indices that the descriptor
    /// alone does not express.
    fn mapping() -> MappingBuilder {
        MappingBuilder::for_record::<Self>()
    }
}

/// Implements [`Record`] for a struct with named fields.
///
/// Each entry is `field: SemanticType`, optionally followed by `=>` and a
/// list of [`FieldDescriptor`](crate::FieldDescriptor) attribute methods.
/// Fields left out of the list are not persisted.
///
/// # Examples
///
/// ```
/// use tablemap_core::{Record, impl_record};
///
/// #[derive(Debug, Default)]
/// struct Product {
///     id: i64,
///     name: String,
///     price: f64,
/// }
///
/// impl_record!(Product {
///     id: Integer => primary_key auto_increment,
///     name: Text => not_null,
///     price: Real,
/// });
///
/// let desc = Product::descriptor();
/// assert_eq!(desc.type_name, "Product");
/// assert_eq!(desc.fields.len(), 3);
/// assert!(desc.fields[0].is_auto_increment);
/// ```
#[macro_export]
macro_rules! impl_record {
    ($ty:ident { $($field:ident : $sem:ident $(=> $($attr:ident)+)?),+ $(,)? }) => {
        impl $crate::Record for $ty {
            fn descriptor() -> $crate::TypeDescriptor {
                $crate::TypeDescriptor::new(stringify!($ty))
                    $(
                        .field(
                            $crate::FieldDescriptor::new(
                                stringify!($field),
                                $crate::SemanticType::$sem,
                            )
                            $($(.$attr())+)?
                        )
                    )+
            }

            fn get(&self, field: &str) -> ::std::result::Result<$crate::FieldValue, $crate::CodecError> {
                match field {
                    $(stringify!($field) => $crate::ToFieldValue::to_field_value(&self.$field),)+
                    other => Err($crate::CodecError::UnknownField(other.to_string())),
                }
            }

            fn set(
                &mut self,
                field: &str,
                value: $crate::FieldValue,
            ) -> ::std::result::Result<(), $crate::CodecError> {
                match field {
                    $(
                        stringify!($field) => {
                            self.$field = $crate::FromFieldValue::from_field_value(value)?;
                            Ok(())
                        }
                    )+
                    other => Err($crate::CodecError::UnknownField(other.to_string())),
                }
            }
        }
    };
}

/// Implements field conversions for a fieldless enum stored by discriminant.
///
/// # Examples
///
/// ```
/// use tablemap_core::{FieldValue, FromFieldValue, ToFieldValue, impl_sql_enum};
///
/// #[derive(Debug, Default, Clone, Copy, PartialEq)]
/// enum Status {
///     #[default]
///     Pending,
///     Shipped,
/// }
///
/// impl_sql_enum!(Status { Pending = 0, Shipped = 1 });
///
/// assert_eq!(Status::Shipped.to_field_value().unwrap(), FieldValue::Enum(1));
/// assert_eq!(Status::from_field_value(FieldValue::Integer(0)).unwrap(), Status::Pending);
/// assert!(Status::from_field_value(FieldValue::Integer(9)).is_err());
/// ```
#[macro_export]
macro_rules! impl_sql_enum {
    ($ty:ident { $($variant:ident = $value:expr),+ $(,)? }) => {
        impl $crate::ToFieldValue for $ty {
            fn to_field_value(&self) -> ::std::result::Result<$crate::FieldValue, $crate::CodecError> {
                Ok($crate::FieldValue::from(*self))
            }
        }

        impl $crate::FromFieldValue for $ty {
            fn from_field_value(
                value: $crate::FieldValue,
            ) -> ::std::result::Result<Self, $crate::CodecError> {
                if value.is_null() {
                    return Err($crate::CodecError::UnexpectedNull(stringify!($ty)));
                }
                let raw = <i64 as $crate::FromFieldValue>::from_field_value(value)?;
                $(
                    if raw == $value {
                        return Ok($ty::$variant);
                    }
                )+
                Err($crate::CodecError::OutOfRange {
                    value: raw.to_string(),
                    target: stringify!($ty),
                })
            }
        }

        impl From<$ty> for $crate::FieldValue {
            fn from(value: $ty) -> Self {
                let raw: i64 = match value {
                    $($ty::$variant => $value,)+
                };
                $crate::FieldValue::Enum(raw)
            }
        }
    };
}
