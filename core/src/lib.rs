//! Table mappings, value encoding and SQL translation for record types.
//!
//! This crate is engine-agnostic: it turns a description of a Rust type into
//! an immutable [`TableMapping`] and renders the SQL needed to store and
//! query that type, but never executes anything itself.
//!
//! - [`TypeDescriptor`] / [`FieldDescriptor`] list a type's persistable
//!   fields; [`impl_record!`] derives them together with the [`Record`] impl.
//! - [`MappingBuilder`] layers table name, key, index and column overrides on
//!   top of a descriptor and validates them in [`MappingBuilder::finalize`].
//! - [`ValueCodec`] converts single values between [`FieldValue`] and
//!   [`SqlValue`], storing nested data as JSON text.
//! - [`create_table_sql`], [`insert_sql`], [`update_sql`] and [`translate`]
//!   render DDL, writes and filtered selects with positional parameters.
//! - [`MappingRegistry`] caches one mapping per record type.
//!
//! # Example
//!
//! ```
//! use tablemap_core::*;
//!
//! #[derive(Debug, Default)]
//! struct Product {
//!     id: i64,
//!     name: String,
//!     tags: Option<Json<Vec<String>>>,
//! }
//!
//! impl_record!(Product {
//!     id: Integer => primary_key auto_increment,
//!     name: Text => indexed,
//!     tags: Complex,
//! });
//!
//! let registry = MappingRegistry::new();
//! let mapping = registry.get_or_build::<Product>().unwrap();
//! let codec = ValueCodec::default();
//!
//! let ddl = create_table_sql(&mapping, &codec);
//! assert_eq!(ddl[1], "CREATE INDEX IF NOT EXISTS Product_name ON Product (name ASC)");
//!
//! let product = Product { name: "Widget".into(), ..Default::default() };
//! let insert = insert_sql(&mapping, &codec, &product, OnConflict::Abort).unwrap();
//! assert_eq!(insert.statement.sql, "INSERT INTO Product (name, tags) VALUES (?, ?)");
//! assert_eq!(insert.statement.params[1], SqlValue::Null);
//! ```

mod codec;
mod crud;
mod ddl;
mod definition;
mod descriptor;
mod error;
mod ident;
mod mapping;
mod query;
mod record;
mod registry;
mod row;
mod types;
mod value;

pub use codec::ValueCodec;
pub use crud::{
    InsertStatement, OnConflict, SqlStatement, delete_by_key_sql, delete_sql, insert_sql,
    is_key_unset, select_by_key_sql, update_sql,
};
pub use ddl::{create_index_sql, create_table_sql, drop_table_sql};
pub use definition::{ColumnDefinition, IndexColumnSpec, IndexSpec, KeyDefinition, TableDefinition};
pub use descriptor::{FieldDescriptor, TypeDescriptor};
pub use error::{CodecError, CrudError, QueryError, SchemaError};
pub use ident::quote_ident;
pub use mapping::{
    ColumnMapping, IndexColumn, IndexDefinition, IndexField, MappingBuilder, TableMapping,
    build_mapping,
};
pub use query::{CompareOp, Expr, Ordering, Query, QueryTranslator, field, lit, not, translate};
pub use record::{Record, RecordType};
pub use registry::MappingRegistry;
pub use row::RowDecoder;
pub use types::{DateTimeStorage, SemanticType, SortOrder, StorageClass, StorageMode};
pub use value::{FieldValue, FromFieldValue, Json, SqlValue, ToFieldValue};
