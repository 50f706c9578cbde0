//! Table mappings and the fluent builder that produces them.
//!
//! A [`MappingBuilder`] starts from a [`TypeDescriptor`] and collects
//! overrides (table name, primary key, indices, column names, storage mode).
//! [`MappingBuilder::finalize`] validates everything at once and snapshots the
//! result into an immutable [`TableMapping`].
//!
//! # Example
//!
//! ```
//! use tablemap_core::{FieldDescriptor, SemanticType, TypeDescriptor, build_mapping};
//!
//! let desc = TypeDescriptor::new("OrderLinePoco")
//!     .field(FieldDescriptor::new("id", SemanticType::Integer))
//!     .field(FieldDescriptor::new("order_id", SemanticType::Integer))
//!     .field(FieldDescriptor::new("product_id", SemanticType::Integer));
//!
//! let mapping = build_mapping(desc)
//!     .set_table_name("OrderLine")
//!     .set_primary_key("id", true)
//!     .add_index("IX_OrderProduct", ["order_id", "product_id"])
//!     .finalize()
//!     .unwrap();
//!
//! assert_eq!(mapping.table_name(), "OrderLine");
//! assert!(mapping.is_auto_increment());
//! assert_eq!(mapping.indexes().len(), 1);
//! ```

use std::collections::HashSet;

use crate::descriptor::{FieldDescriptor, TypeDescriptor};
use crate::error::SchemaError;
use crate::record::{Record, RecordType};
use crate::types::{SemanticType, SortOrder, StorageMode};

/// One field-to-column binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    /// Source field identity.
    pub field: String,
    /// Column name in the table.
    pub name: String,
    pub ty: SemanticType,
    pub nullable: bool,
    pub is_primary_key: bool,
    pub is_indexed: bool,
}

/// A column reference inside an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumn {
    /// Column name (already resolved from the field).
    pub column: String,
    pub order: SortOrder,
}

/// A named index over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<IndexColumn>,
    pub unique: bool,
}

/// Immutable description of how a record type maps onto a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMapping {
    table_name: String,
    columns: Vec<ColumnMapping>,
    primary_key: Option<usize>,
    auto_increment: bool,
    storage_mode: StorageMode,
    indexes: Vec<IndexDefinition>,
    record_type: Option<RecordType>,
}

impl TableMapping {
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[ColumnMapping] {
        &self.columns
    }

    pub fn primary_key(&self) -> Option<&ColumnMapping> {
        self.primary_key.map(|i| &self.columns[i])
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.storage_mode
    }

    /// Indices in declaration order.
    pub fn indexes(&self) -> &[IndexDefinition] {
        &self.indexes
    }

    /// The Rust type this mapping was built for, if any.
    pub fn record_type(&self) -> Option<RecordType> {
        self.record_type
    }

    /// Finds the column bound to a field.
    pub fn column_for_field(&self, field: &str) -> Option<&ColumnMapping> {
        self.columns.iter().find(|c| c.field == field)
    }

    /// Finds a column by name, ignoring ASCII case as the engine does.
    pub fn column_by_name(&self, name: &str) -> Option<&ColumnMapping> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// An index column as passed to [`MappingBuilder::add_index`].
///
/// Converts from a bare field name (ascending) or a `(field, order)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexField {
    pub field: String,
    pub order: SortOrder,
}

impl From<&str> for IndexField {
    fn from(field: &str) -> Self {
        Self {
            field: field.to_string(),
            order: SortOrder::Asc,
        }
    }
}

impl From<String> for IndexField {
    fn from(field: String) -> Self {
        Self {
            field,
            order: SortOrder::Asc,
        }
    }
}

impl From<(&str, SortOrder)> for IndexField {
    fn from((field, order): (&str, SortOrder)) -> Self {
        Self {
            field: field.to_string(),
            order,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingIndex {
    name: String,
    fields: Vec<IndexField>,
    unique: bool,
}

/// Fluent builder for a [`TableMapping`].
///
/// Configuration calls only record intent; all validation happens in
/// [`finalize`](Self::finalize), which consumes the builder.
#[derive(Debug, Clone)]
pub struct MappingBuilder {
    descriptor: TypeDescriptor,
    record_type: Option<RecordType>,
    table_name: Option<String>,
    primary_key: Option<(String, bool)>,
    column_overrides: Vec<(String, String)>,
    indexes: Vec<PendingIndex>,
    without_row_id: bool,
}

/// Starts a mapping builder from a descriptor.
pub fn build_mapping(descriptor: TypeDescriptor) -> MappingBuilder {
    MappingBuilder::new(descriptor)
}

impl MappingBuilder {
    pub fn new(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor,
            record_type: None,
            table_name: None,
            primary_key: None,
            column_overrides: Vec::new(),
            indexes: Vec::new(),
            without_row_id: false,
        }
    }

    /// Starts from `R`'s descriptor and tags the result with `R`'s identity.
    pub fn for_record<R: Record>() -> Self {
        let mut builder = Self::new(R::descriptor());
        builder.record_type = Some(RecordType::of::<R>());
        builder
    }

    pub fn set_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Declares the primary key, replacing any key flagged on the descriptor.
    pub fn set_primary_key(mut self, field: impl Into<String>, auto_increment: bool) -> Self {
        self.primary_key = Some((field.into(), auto_increment));
        self
    }

    /// Adds a non-unique index.
    pub fn add_index<I, F>(self, name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<IndexField>,
    {
        self.push_index(name.into(), fields, false)
    }

    /// Adds a unique index.
    pub fn add_unique_index<I, F>(self, name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<IndexField>,
    {
        self.push_index(name.into(), fields, true)
    }

    fn push_index<I, F>(mut self, name: String, fields: I, unique: bool) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<IndexField>,
    {
        self.indexes.push(PendingIndex {
            name,
            fields: fields.into_iter().map(Into::into).collect(),
            unique,
        });
        self
    }

    /// Stores `field` under column `name`.
    pub fn override_column(mut self, field: impl Into<String>, name: impl Into<String>) -> Self {
        self.column_overrides.push((field.into(), name.into()));
        self
    }

    /// Uses the primary key as the clustering key.
    pub fn without_row_id(mut self) -> Self {
        self.without_row_id = true;
        self
    }

    /// Validates the collected configuration and produces the mapping.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::NoColumns`] when no field is persistable
    /// - [`SchemaError::InvalidAutoIncrement`] when autoincrement is set on a
    ///   non-integer key or combined with `without_row_id`
    /// - [`SchemaError::UnknownIndexColumn`] when an index names an unknown field
    /// - [`SchemaError::UnknownField`], [`SchemaError::DuplicateColumn`],
    ///   [`SchemaError::DuplicateIndex`], [`SchemaError::MultiplePrimaryKeys`],
    ///   [`SchemaError::WithoutRowIdRequiresPrimaryKey`],
    ///   [`SchemaError::EmptyTableName`] for the remaining structural problems
    pub fn finalize(self) -> Result<TableMapping, SchemaError> {
        let table_name = self
            .table_name
            .clone()
            .unwrap_or_else(|| self.descriptor.type_name.clone());
        if table_name.trim().is_empty() {
            return Err(SchemaError::EmptyTableName);
        }

        let fields: Vec<&FieldDescriptor> = self.descriptor.persistable_fields().collect();
        if fields.is_empty() {
            return Err(SchemaError::NoColumns(self.descriptor.type_name.clone()));
        }

        for (field, _) in &self.column_overrides {
            if !fields.iter().any(|f| &f.name == field) {
                return Err(SchemaError::UnknownField(field.clone()));
            }
        }

        let (key_field, auto_increment) = self.resolve_primary_key(&table_name, &fields)?;

        let mut columns = Vec::with_capacity(fields.len());
        let mut seen = HashSet::new();
        for field in &fields {
            // Later overrides win.
            let name = self
                .column_overrides
                .iter()
                .rev()
                .find(|(f, _)| f == &field.name)
                .map(|(_, name)| name.clone())
                .unwrap_or_else(|| field.column_name().to_string());
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(SchemaError::DuplicateColumn(name));
            }
            let is_primary_key = key_field.as_deref() == Some(field.name.as_str());
            columns.push(ColumnMapping {
                field: field.name.clone(),
                name,
                ty: field.ty,
                nullable: !(field.is_not_null || is_primary_key),
                is_primary_key,
                is_indexed: field.is_indexed,
            });
        }
        let primary_key = columns.iter().position(|c| c.is_primary_key);

        if self.without_row_id && primary_key.is_none() {
            return Err(SchemaError::WithoutRowIdRequiresPrimaryKey(table_name));
        }
        if auto_increment {
            let ty = primary_key.map(|i| columns[i].ty);
            if ty != Some(SemanticType::Integer) {
                return Err(SchemaError::InvalidAutoIncrement {
                    table: table_name,
                    reason: "primary key is not a signed integer".to_string(),
                });
            }
            if self.without_row_id {
                return Err(SchemaError::InvalidAutoIncrement {
                    table: table_name,
                    reason: "cannot be combined with WITHOUT ROWID".to_string(),
                });
            }
        }

        let indexes = self.resolve_indexes(&table_name, &fields, &mut columns)?;

        Ok(TableMapping {
            table_name,
            columns,
            primary_key,
            auto_increment,
            storage_mode: if self.without_row_id {
                StorageMode::WithoutRowId
            } else {
                StorageMode::RowId
            },
            indexes,
            record_type: self.record_type,
        })
    }

    fn resolve_primary_key(
        &self,
        table_name: &str,
        fields: &[&FieldDescriptor],
    ) -> Result<(Option<String>, bool), SchemaError> {
        if let Some((field, auto_increment)) = &self.primary_key {
            if !fields.iter().any(|f| &f.name == field) {
                return Err(SchemaError::UnknownField(field.clone()));
            }
            return Ok((Some(field.clone()), *auto_increment));
        }

        let flagged: Vec<_> = fields.iter().filter(|f| f.is_primary_key).collect();
        match flagged.as_slice() {
            [] => {
                if fields.iter().any(|f| f.is_auto_increment) {
                    return Err(SchemaError::InvalidAutoIncrement {
                        table: table_name.to_string(),
                        reason: "autoincrement field is not the primary key".to_string(),
                    });
                }
                Ok((None, false))
            }
            [key] => Ok((Some(key.name.clone()), key.is_auto_increment)),
            _ => {
                if flagged.iter().any(|f| f.is_auto_increment) {
                    return Err(SchemaError::InvalidAutoIncrement {
                        table: table_name.to_string(),
                        reason: "composite primary keys cannot autoincrement".to_string(),
                    });
                }
                Err(SchemaError::MultiplePrimaryKeys(table_name.to_string()))
            }
        }
    }

    fn resolve_indexes(
        &self,
        table_name: &str,
        fields: &[&FieldDescriptor],
        columns: &mut [ColumnMapping],
    ) -> Result<Vec<IndexDefinition>, SchemaError> {
        let mut indexes = Vec::new();

        for (field, column) in fields.iter().zip(columns.iter()) {
            if field.is_indexed {
                indexes.push(IndexDefinition {
                    name: format!("{table_name}_{}", column.name),
                    columns: vec![IndexColumn {
                        column: column.name.clone(),
                        order: SortOrder::Asc,
                    }],
                    unique: field.is_unique,
                });
            }
        }

        for pending in &self.indexes {
            let mut index_columns = Vec::with_capacity(pending.fields.len());
            for index_field in &pending.fields {
                let column = columns
                    .iter_mut()
                    .find(|c| c.field == index_field.field)
                    .ok_or_else(|| SchemaError::UnknownIndexColumn {
                        index: pending.name.clone(),
                        field: index_field.field.clone(),
                    })?;
                column.is_indexed = true;
                index_columns.push(IndexColumn {
                    column: column.name.clone(),
                    order: index_field.order,
                });
            }
            indexes.push(IndexDefinition {
                name: pending.name.clone(),
                columns: index_columns,
                unique: pending.unique,
            });
        }

        let mut names = HashSet::new();
        for index in &indexes {
            if !names.insert(index.name.to_ascii_lowercase()) {
                return Err(SchemaError::DuplicateIndex(index.name.clone()));
            }
        }

        Ok(indexes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_line() -> TypeDescriptor {
        TypeDescriptor::new("OrderLinePoco")
            .field(FieldDescriptor::new("id", SemanticType::Integer))
            .field(FieldDescriptor::new("order_id", SemanticType::Integer))
            .field(FieldDescriptor::new("product_id", SemanticType::Integer))
            .field(FieldDescriptor::new("quantity", SemanticType::Integer))
            .field(FieldDescriptor::new("unit_price", SemanticType::Real))
            .field(FieldDescriptor::new("status", SemanticType::Enum))
    }

    #[test]
    fn test_no_columns_fails() {
        let err = build_mapping(TypeDescriptor::new("NoPropObject"))
            .finalize()
            .unwrap_err();
        assert_eq!(err, SchemaError::NoColumns("NoPropObject".into()));
    }

    #[test]
    fn test_only_ignored_fields_fails() {
        let desc = TypeDescriptor::new("Hidden")
            .field(FieldDescriptor::new("x", SemanticType::Integer).ignored());
        assert!(matches!(
            build_mapping(desc).finalize(),
            Err(SchemaError::NoColumns(_))
        ));
    }

    #[test]
    fn test_default_table_name_is_type_name() {
        let mapping = build_mapping(order_line()).finalize().unwrap();
        assert_eq!(mapping.table_name(), "OrderLinePoco");
        assert_eq!(mapping.columns().len(), 6);
        assert!(mapping.primary_key().is_none());
        assert_eq!(mapping.storage_mode(), StorageMode::RowId);
    }

    #[test]
    fn test_fluent_configuration() {
        let mapping = build_mapping(order_line())
            .set_table_name("OrderLine")
            .set_primary_key("id", true)
            .add_index("IX_OrderProduct", ["order_id", "product_id"])
            .finalize()
            .unwrap();

        let pk = mapping.primary_key().unwrap();
        assert_eq!(pk.name, "id");
        assert!(!pk.nullable);
        assert!(mapping.is_auto_increment());

        let index = &mapping.indexes()[0];
        assert_eq!(index.name, "IX_OrderProduct");
        assert_eq!(index.columns.len(), 2);
        assert!(!index.unique);
        assert!(mapping.column_for_field("order_id").unwrap().is_indexed);
        assert!(!mapping.column_for_field("quantity").unwrap().is_indexed);
    }

    #[test]
    fn test_autoincrement_on_text_key_fails() {
        let desc = TypeDescriptor::new("Keyed")
            .field(FieldDescriptor::new("code", SemanticType::Text));
        let err = build_mapping(desc)
            .set_primary_key("code", true)
            .finalize()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidAutoIncrement { .. }));
    }

    #[test]
    fn test_autoincrement_with_without_row_id_fails() {
        let err = build_mapping(order_line())
            .set_primary_key("id", true)
            .without_row_id()
            .finalize()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidAutoIncrement { .. }));
    }

    #[test]
    fn test_composite_autoincrement_fails() {
        let desc = TypeDescriptor::new("Pair")
            .field(FieldDescriptor::new("a", SemanticType::Integer).primary_key().auto_increment())
            .field(FieldDescriptor::new("b", SemanticType::Integer).primary_key());
        assert!(matches!(
            build_mapping(desc).finalize(),
            Err(SchemaError::InvalidAutoIncrement { .. })
        ));
    }

    #[test]
    fn test_multiple_primary_keys_fail() {
        let desc = TypeDescriptor::new("Pair")
            .field(FieldDescriptor::new("a", SemanticType::Integer).primary_key())
            .field(FieldDescriptor::new("b", SemanticType::Integer).primary_key());
        assert_eq!(
            build_mapping(desc).finalize().unwrap_err(),
            SchemaError::MultiplePrimaryKeys("Pair".into())
        );
    }

    #[test]
    fn test_without_row_id_requires_key() {
        let err = build_mapping(order_line())
            .without_row_id()
            .finalize()
            .unwrap_err();
        assert!(matches!(err, SchemaError::WithoutRowIdRequiresPrimaryKey(_)));

        let mapping = build_mapping(order_line())
            .set_primary_key("id", false)
            .without_row_id()
            .finalize()
            .unwrap();
        assert_eq!(mapping.storage_mode(), StorageMode::WithoutRowId);
    }

    #[test]
    fn test_unknown_index_column_fails() {
        let err = build_mapping(order_line())
            .add_index("IX_Bad", ["order_id", "nope"])
            .finalize()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownIndexColumn {
                index: "IX_Bad".into(),
                field: "nope".into()
            }
        );
    }

    #[test]
    fn test_column_override_applies_to_indices() {
        let mapping = build_mapping(order_line())
            .override_column("order_id", "OrderId")
            .add_index("IX_Order", [("order_id", SortOrder::Desc)])
            .finalize()
            .unwrap();
        assert_eq!(mapping.column_for_field("order_id").unwrap().name, "OrderId");
        assert_eq!(mapping.indexes()[0].columns[0].column, "OrderId");
        assert_eq!(mapping.indexes()[0].columns[0].order, SortOrder::Desc);
        assert!(mapping.column_by_name("orderid").is_some());
    }

    #[test]
    fn test_override_unknown_field_fails() {
        let err = build_mapping(order_line())
            .override_column("ghost", "Ghost")
            .finalize()
            .unwrap_err();
        assert_eq!(err, SchemaError::UnknownField("ghost".into()));
    }

    #[test]
    fn test_duplicate_column_names_fail() {
        let err = build_mapping(order_line())
            .override_column("quantity", "ID")
            .finalize()
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateColumn("ID".into()));
    }

    #[test]
    fn test_descriptor_indices_come_first() {
        let desc = TypeDescriptor::new("User")
            .field(FieldDescriptor::new("id", SemanticType::Integer).primary_key())
            .field(FieldDescriptor::new("email", SemanticType::Text).unique())
            .field(FieldDescriptor::new("city", SemanticType::Text).indexed());
        let mapping = build_mapping(desc)
            .add_index("IX_Both", ["city", "email"])
            .finalize()
            .unwrap();
        let names: Vec<_> = mapping.indexes().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["User_email", "User_city", "IX_Both"]);
        assert!(mapping.indexes()[0].unique);
    }

    #[test]
    fn test_duplicate_index_names_fail() {
        let err = build_mapping(order_line())
            .add_index("IX", ["order_id"])
            .add_index("ix", ["product_id"])
            .finalize()
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateIndex("ix".into()));
    }

    #[test]
    fn test_finalize_snapshot_is_independent() {
        let builder = build_mapping(order_line()).set_table_name("A");
        let first = builder.clone().finalize().unwrap();
        let second = builder.set_table_name("B").finalize().unwrap();
        assert_eq!(first.table_name(), "A");
        assert_eq!(second.table_name(), "B");
    }
}
