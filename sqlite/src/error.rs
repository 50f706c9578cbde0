//! Error type for database operations.
//!
//! Engine failures are passed through unchanged, tagged with the logical
//! [`Operation`] that triggered them. Mapping, codec, query and write
//! rendering failures from `tablemap-core` are wrapped as-is.

use std::fmt;

use tablemap_core::{CodecError, CrudError, QueryError, SchemaError};
use thiserror::Error;

/// The logical operation an engine error was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Open,
    Configure,
    CreateTable,
    DropTable,
    Insert,
    Update,
    Delete,
    Query,
    Execute,
    Transaction,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Open => "open",
            Operation::Configure => "configure",
            Operation::CreateTable => "create table",
            Operation::DropTable => "drop table",
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Query => "query",
            Operation::Execute => "execute",
            Operation::Transaction => "transaction",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while working with a [`Database`](crate::Database).
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite reported a failure.
    #[error("{operation} failed: {source}")]
    Engine {
        operation: Operation,
        #[source]
        source: rusqlite::Error,
    },

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("query error: {0}")]
    Query(#[from] QueryError),

    #[error("write error: {0}")]
    Crud(#[from] CrudError),

    /// No row matched the requested key.
    #[error("no row with the requested key in '{table}'")]
    NotFound { table: String },

    /// The configuration file could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl SqliteError {
    /// Returns the underlying engine error, if any.
    pub fn engine_error(&self) -> Option<&rusqlite::Error> {
        match self {
            SqliteError::Engine { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Attaches an [`Operation`] to engine results.
pub(crate) trait EngineContext<T> {
    fn during(self, operation: Operation) -> Result<T>;
}

impl<T> EngineContext<T> for std::result::Result<T, rusqlite::Error> {
    fn during(self, operation: Operation) -> Result<T> {
        self.map_err(|source| SqliteError::Engine { operation, source })
    }
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
