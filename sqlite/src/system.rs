//! Access to SQLite's own schema table.

use tablemap_core::{
    CodecError, FieldDescriptor, FieldValue, FromFieldValue, MappingBuilder, Query, Record,
    SchemaError, SemanticType, TableMapping, ToFieldValue, TypeDescriptor, field,
};

use crate::database::Database;
use crate::error::Result;

/// One row of `sqlite_master`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SqliteMaster {
    /// `table`, `index`, `view` or `trigger`.
    pub kind: String,
    pub name: String,
    pub table_name: String,
    pub root_page: i64,
    /// `None` for indices SQLite creates implicitly.
    pub sql: Option<String>,
}

// Written by hand so the default mapping already targets `sqlite_master`,
// whichever path resolves it first.
impl Record for SqliteMaster {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new("SqliteMaster")
            .field(FieldDescriptor::new("kind", SemanticType::Text).column("type"))
            .field(FieldDescriptor::new("name", SemanticType::Text))
            .field(FieldDescriptor::new("table_name", SemanticType::Text).column("tbl_name"))
            .field(FieldDescriptor::new("root_page", SemanticType::Integer).column("rootpage"))
            .field(FieldDescriptor::new("sql", SemanticType::Text))
    }

    fn get(&self, field: &str) -> std::result::Result<FieldValue, CodecError> {
        match field {
            "kind" => self.kind.to_field_value(),
            "name" => self.name.to_field_value(),
            "table_name" => self.table_name.to_field_value(),
            "root_page" => self.root_page.to_field_value(),
            "sql" => self.sql.to_field_value(),
            other => Err(CodecError::UnknownField(other.to_string())),
        }
    }

    fn set(&mut self, field: &str, value: FieldValue) -> std::result::Result<(), CodecError> {
        match field {
            "kind" => self.kind = String::from_field_value(value)?,
            "name" => self.name = String::from_field_value(value)?,
            "table_name" => self.table_name = String::from_field_value(value)?,
            "root_page" => self.root_page = i64::from_field_value(value)?,
            "sql" => self.sql = Option::<String>::from_field_value(value)?,
            other => return Err(CodecError::UnknownField(other.to_string())),
        }
        Ok(())
    }

    fn mapping() -> MappingBuilder {
        MappingBuilder::for_record::<Self>().set_table_name("sqlite_master")
    }
}

impl SqliteMaster {
    /// Mapping of this type onto `sqlite_master`'s fixed column names.
    pub fn system_mapping() -> std::result::Result<TableMapping, SchemaError> {
        Self::mapping().finalize()
    }
}

impl Database {
    /// Every object in the schema, ordered by name.
    pub fn schema_objects(&self) -> Result<Vec<SqliteMaster>> {
        self.query_all(&Query::<SqliteMaster>::new().order_by("name", Default::default()))
    }

    /// User tables, excluding SQLite's internal `sqlite_*` tables.
    pub fn tables(&self) -> Result<Vec<SqliteMaster>> {
        let query = Query::<SqliteMaster>::new()
            .filter(field("kind").eq("table"))
            .order_by("name", Default::default());
        Ok(self
            .query_all(&query)?
            .into_iter()
            .filter(|entry| !entry.name.starts_with("sqlite_"))
            .collect())
    }

    /// The `CREATE TABLE` text SQLite recorded for `table`.
    pub fn table_sql(&self, table: &str) -> Result<Option<String>> {
        let query = Query::<SqliteMaster>::new()
            .filter(field("kind").eq("table"))
            .filter(field("name").eq(table));
        Ok(self.first(&query)?.and_then(|entry| entry.sql))
    }
}
