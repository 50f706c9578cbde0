//! Connection configuration.

use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tablemap_core::{DateTimeStorage, ValueCodec};
use tracing::debug;

use crate::error::{EngineContext, Operation, Result, SqliteError};

const JOURNAL_MODES: &[&str] = &["DELETE", "TRUNCATE", "PERSIST", "MEMORY", "WAL", "OFF"];

/// Settings applied when a [`Database`](crate::Database) is opened.
///
/// Every field has a default, so a YAML file only needs the keys it changes.
///
/// # Examples
///
/// ```
/// use tablemap_core::DateTimeStorage;
/// use tablemap_sqlite::DatabaseConfig;
///
/// let config = DatabaseConfig::from_yaml_str("datetime_storage: unix_nanos\nbusy_timeout_ms: 500\n").unwrap();
/// assert_eq!(config.datetime_storage, DateTimeStorage::UnixNanos);
/// assert!(config.foreign_keys);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// How datetime fields are stored.
    pub datetime_storage: DateTimeStorage,
    /// Enables `PRAGMA foreign_keys`.
    pub foreign_keys: bool,
    /// How long to wait on a locked database before failing.
    pub busy_timeout_ms: Option<u64>,
    /// `PRAGMA journal_mode` value, e.g. `WAL`.
    pub journal_mode: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            datetime_storage: DateTimeStorage::default(),
            foreign_keys: true,
            busy_timeout_ms: None,
            journal_mode: None,
        }
    }
}

impl DatabaseConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::Config`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| SqliteError::Config(format!("cannot open '{}': {e}", path.display())))?;
        serde_yaml::from_reader(BufReader::new(file))
            .map_err(|e| SqliteError::Config(format!("invalid config '{}': {e}", path.display())))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| SqliteError::Config(e.to_string()))
    }

    /// Codec matching this configuration.
    pub fn codec(&self) -> ValueCodec {
        ValueCodec::new(self.datetime_storage)
    }

    pub(crate) fn apply(&self, conn: &Connection) -> Result<()> {
        let foreign_keys = if self.foreign_keys { "ON" } else { "OFF" };
        conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))
            .during(Operation::Configure)?;

        if let Some(ms) = self.busy_timeout_ms {
            conn.busy_timeout(Duration::from_millis(ms))
                .during(Operation::Configure)?;
        }

        if let Some(mode) = &self.journal_mode {
            let mode = mode.to_ascii_uppercase();
            if !JOURNAL_MODES.contains(&mode.as_str()) {
                return Err(SqliteError::Config(format!("unsupported journal mode '{mode}'")));
            }
            // journal_mode reports the mode actually in effect.
            let active: String = conn
                .query_row(&format!("PRAGMA journal_mode = {mode}"), [], |row| row.get(0))
                .during(Operation::Configure)?;
            debug!(requested = %mode, active = %active, "Set journal mode");
        }
        Ok(())
    }
}
