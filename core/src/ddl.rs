//! `CREATE TABLE` / `CREATE INDEX` generation from a [`TableMapping`].
//!
//! Every statement is guarded with `IF NOT EXISTS`, so applying the same
//! mapping twice is a no-op. Changing the shape of an existing table is not
//! attempted.

use crate::codec::ValueCodec;
use crate::ident::quote_ident;
use crate::mapping::{IndexDefinition, TableMapping};
use crate::types::StorageMode;

/// Renders the statements that materialize `mapping`.
///
/// The first statement creates the table; one statement per index follows,
/// in declaration order.
///
/// # Examples
///
/// ```
/// use tablemap_core::{FieldDescriptor, SemanticType, TypeDescriptor, ValueCodec, build_mapping, create_table_sql};
///
/// let mapping = build_mapping(
///     TypeDescriptor::new("Order")
///         .field(FieldDescriptor::new("id", SemanticType::Integer))
///         .field(FieldDescriptor::new("placed", SemanticType::DateTime)),
/// )
/// .set_primary_key("id", true)
/// .finalize()
/// .unwrap();
///
/// let sql = create_table_sql(&mapping, &ValueCodec::default());
/// assert_eq!(
///     sql[0],
///     "CREATE TABLE IF NOT EXISTS \"Order\" (id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, placed TEXT)"
/// );
/// ```
pub fn create_table_sql(mapping: &TableMapping, codec: &ValueCodec) -> Vec<String> {
    let columns: Vec<String> = mapping
        .columns()
        .iter()
        .map(|column| {
            let mut decl = format!(
                "{} {}",
                quote_ident(&column.name),
                codec.storage_class(column.ty).keyword()
            );
            if column.is_primary_key {
                decl.push_str(" PRIMARY KEY");
                if mapping.is_auto_increment() {
                    decl.push_str(" AUTOINCREMENT");
                }
            }
            if !column.nullable {
                decl.push_str(" NOT NULL");
            }
            decl
        })
        .collect();

    let mut table = format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(mapping.table_name()),
        columns.join(", ")
    );
    if mapping.storage_mode() == StorageMode::WithoutRowId {
        table.push_str(" WITHOUT ROWID");
    }

    let mut statements = Vec::with_capacity(1 + mapping.indexes().len());
    statements.push(table);
    statements.extend(
        mapping
            .indexes()
            .iter()
            .map(|index| create_index_sql(mapping.table_name(), index)),
    );
    statements
}

/// Renders a single `CREATE [UNIQUE] INDEX IF NOT EXISTS` statement.
pub fn create_index_sql(table: &str, index: &IndexDefinition) -> String {
    let columns: Vec<String> = index
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.column), c.order.keyword()))
        .collect();
    format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        quote_ident(&index.name),
        quote_ident(table),
        columns.join(", ")
    )
}

/// Renders `DROP TABLE IF EXISTS` for the mapping's table.
pub fn drop_table_sql(mapping: &TableMapping) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(mapping.table_name()))
}
