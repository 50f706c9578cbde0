//! Declarative table definition example.
//!
//! Loads a table definition from YAML, prints its DDL and materializes it,
//! then inspects `sqlite_master` through the system-table mapping.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p tablemap-demos --example definitions
//! ```

use tablemap_core::{TableDefinition, ValueCodec, create_table_sql};
use tablemap_sqlite::Database;

const DEFINITION: &str = r#"
table: Event
primary_key: { field: id, autoincrement: true }
columns:
  - { name: id, type: integer }
  - { name: kind, type: text, indexed: true }
  - { name: at, type: datetime, column: happened_at, not_null: true }
  - { name: payload, type: complex }
indexes:
  - name: IX_Event_kind_at
    columns: [kind, { field: at, order: desc }]
"#;

fn main() {
    let definition: TableDefinition = serde_yaml::from_str(DEFINITION).unwrap();
    let mapping = definition.to_mapping().unwrap();

    println!("=== DDL ===");
    for sql in create_table_sql(&mapping, &ValueCodec::default()) {
        println!("{sql};");
    }

    println!("\n=== sqlite_master ===");
    let db = Database::open_in_memory().unwrap();
    db.create_table_from(mapping).unwrap();
    for table in db.tables().unwrap() {
        println!("table {}", table.name);
        println!("  {}", db.table_sql(&table.name).unwrap().unwrap_or_default());
    }
    for object in db.schema_objects().unwrap() {
        if object.kind == "index" {
            println!("index {} on {}", object.name, object.table_name);
        }
    }
}
