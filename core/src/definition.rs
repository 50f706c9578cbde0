//! Declarative table definitions.
//!
//! A [`TableDefinition`] describes a table as data (JSON or YAML) instead of
//! as a Rust type. It lowers to the same [`MappingBuilder`] that typed
//! records use, so validation and DDL are identical for both paths.
//!
//! ```yaml
//! table: OrderLine
//! primary_key: { field: id, autoincrement: true }
//! columns:
//!   - { name: id, type: integer }
//!   - { name: order_id, type: integer }
//!   - { name: product_id, type: integer }
//!   - { name: quantity, type: integer, not_null: true }
//! indexes:
//!   - name: IX_OrderProduct
//!     columns: [order_id, product_id]
//! ```

use serde::{Deserialize, Serialize};

use crate::descriptor::{FieldDescriptor, TypeDescriptor};
use crate::error::SchemaError;
use crate::mapping::{IndexField, MappingBuilder, TableMapping};
use crate::types::{SemanticType, SortOrder};

/// A table described as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableDefinition {
    pub table: String,
    pub columns: Vec<ColumnDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<KeyDefinition>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub without_rowid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexSpec>,
}

/// One field of a [`TableDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SemanticType,
    /// Stored column name when it differs from `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub not_null: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub indexed: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyDefinition {
    pub field: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub autoincrement: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<IndexColumnSpec>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
}

/// An index column, either a bare field name or a field with a direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexColumnSpec {
    Name(String),
    Ordered {
        field: String,
        #[serde(default)]
        order: SortOrder,
    },
}

impl From<&IndexColumnSpec> for IndexField {
    fn from(spec: &IndexColumnSpec) -> Self {
        match spec {
            IndexColumnSpec::Name(field) => IndexField::from(field.clone()),
            IndexColumnSpec::Ordered { field, order } => IndexField {
                field: field.clone(),
                order: *order,
            },
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl TableDefinition {
    /// Parses a definition from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Builds the descriptor equivalent of this definition.
    pub fn to_descriptor(&self) -> TypeDescriptor {
        self.columns
            .iter()
            .fold(TypeDescriptor::new(&self.table), |desc, column| {
                let mut field = FieldDescriptor::new(&column.name, column.ty);
                if let Some(name) = &column.column {
                    field = field.column(name);
                }
                if column.not_null {
                    field = field.not_null();
                }
                if column.unique {
                    field = field.unique();
                } else if column.indexed {
                    field = field.indexed();
                }
                desc.field(field)
            })
    }

    /// Lowers the definition to a mapping builder.
    pub fn to_builder(&self) -> MappingBuilder {
        let mut builder = MappingBuilder::new(self.to_descriptor()).set_table_name(&self.table);
        if let Some(key) = &self.primary_key {
            builder = builder.set_primary_key(&key.field, key.autoincrement);
        }
        if self.without_rowid {
            builder = builder.without_row_id();
        }
        for index in &self.indexes {
            let fields = index.columns.iter().map(IndexField::from);
            builder = if index.unique {
                builder.add_unique_index(&index.name, fields)
            } else {
                builder.add_index(&index.name, fields)
            };
        }
        builder
    }

    /// Validates the definition and produces its mapping.
    pub fn to_mapping(&self) -> Result<TableMapping, SchemaError> {
        self.to_builder().finalize()
    }
}
