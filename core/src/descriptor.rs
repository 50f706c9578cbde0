//! Type descriptors: the ordered list of persistable fields of a record type.
//!
//! A [`TypeDescriptor`] is produced once per record type, usually by
//! [`Record::descriptor`](crate::Record::descriptor) or the
//! [`impl_record!`](crate::impl_record) macro, and is the starting point of
//! every [`MappingBuilder`](crate::MappingBuilder).

use crate::types::SemanticType;

/// A single field of a record type and its mapping attributes.
///
/// # Examples
///
/// ```
/// use tablemap_core::{FieldDescriptor, SemanticType};
///
/// let id = FieldDescriptor::new("id", SemanticType::Integer)
///     .primary_key()
///     .auto_increment();
/// assert!(id.is_primary_key);
/// assert_eq!(id.column_name(), "id");
///
/// let name = FieldDescriptor::new("name", SemanticType::Text).column("display_name");
/// assert_eq!(name.column_name(), "display_name");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field identity within the record type.
    pub name: String,
    /// Declared semantic type.
    pub ty: SemanticType,
    /// Explicit column name; defaults to the field name.
    pub column: Option<String>,
    pub is_primary_key: bool,
    pub is_auto_increment: bool,
    pub is_indexed: bool,
    pub is_unique: bool,
    pub is_not_null: bool,
    /// Ignored fields are never persisted.
    pub is_ignored: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: SemanticType) -> Self {
        Self {
            name: name.into(),
            ty,
            column: None,
            is_primary_key: false,
            is_auto_increment: false,
            is_indexed: false,
            is_unique: false,
            is_not_null: false,
            is_ignored: false,
        }
    }

    /// Marks the field as the primary key.
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    /// Requests engine-assigned keys. Only meaningful on the primary key.
    pub fn auto_increment(mut self) -> Self {
        self.is_auto_increment = true;
        self
    }

    /// Adds a single-column index named `<table>_<column>`.
    pub fn indexed(mut self) -> Self {
        self.is_indexed = true;
        self
    }

    /// Adds a single-column unique index named `<table>_<column>`.
    pub fn unique(mut self) -> Self {
        self.is_indexed = true;
        self.is_unique = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_not_null = true;
        self
    }

    pub fn ignored(mut self) -> Self {
        self.is_ignored = true;
        self
    }

    /// Stores the field under a different column name.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.column = Some(name.into());
        self
    }

    /// Effective column name.
    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

/// Ordered field list of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Type name, used as the default table name.
    pub type_name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Fields that are not marked ignored, in declaration order.
    pub fn persistable_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.is_ignored)
    }

    /// Looks up a persistable field by name.
    pub fn find(&self, name: &str) -> Option<&FieldDescriptor> {
        self.persistable_fields().find(|f| f.name == name)
    }
}
