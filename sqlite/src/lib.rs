//! SQLite execution layer for tablemap.
//!
//! [`Database`] wraps a `rusqlite` connection and runs the statements that
//! `tablemap-core` renders: it creates tables for record types, inserts,
//! updates and deletes records, and streams query results back as typed
//! records through a lazy [`RecordStatement`] cursor.
//!
//! # Quick start
//!
//! ```
//! use tablemap_core::{Json, Query, Record, SortOrder, field, impl_record};
//! use tablemap_sqlite::Database;
//!
//! #[derive(Debug, Default)]
//! struct Product {
//!     id: i64,
//!     name: String,
//!     price: f64,
//!     tags: Option<Json<Vec<String>>>,
//! }
//!
//! impl_record!(Product {
//!     id: Integer => primary_key auto_increment,
//!     name: Text => indexed,
//!     price: Real,
//!     tags: Complex,
//! });
//!
//! let db = Database::open_in_memory().unwrap();
//! db.create_table::<Product>().unwrap();
//!
//! let mut products = vec![
//!     Product { name: "Widget".into(), price: 2.5, ..Default::default() },
//!     Product { name: "Gadget".into(), price: 9.0, tags: Some(Json(vec!["new".into()])), ..Default::default() },
//! ];
//! db.insert_all(&mut products).unwrap();
//!
//! let query = Query::<Product>::new()
//!     .filter(field("price").gt(1.0))
//!     .order_by("price", SortOrder::Desc);
//! let mut stmt = db.query(&query).unwrap();
//! for product in stmt.records().unwrap() {
//!     let product = product.unwrap();
//!     println!("{} costs {}", product.name, product.price);
//! }
//! ```
//!
//! # Configuration
//!
//! [`DatabaseConfig`] controls pragmas and the datetime representation, and
//! can be loaded from YAML with [`DatabaseConfig::load`].

mod config;
mod convert;
mod cursor;
mod database;
mod error;
mod system;

pub use config::DatabaseConfig;
pub use cursor::{RecordStatement, Records};
pub use database::Database;
pub use error::{Operation, Result, SqliteError};
pub use system::SqliteMaster;
