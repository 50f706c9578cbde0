//! The [`Database`] handle: typed CRUD, queries and transactions.

use std::cell::Cell;
use std::path::Path;
use std::sync::Arc;

use rusqlite::{Connection, params_from_iter};
use tablemap_core::{
    FieldValue, MappingRegistry, OnConflict, Query, QueryTranslator, Record, RowDecoder,
    SqlStatement, SqlValue, TableMapping, ValueCodec, create_table_sql, delete_by_key_sql,
    delete_sql, drop_table_sql, insert_sql, select_by_key_sql, update_sql,
};
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::convert::to_engine;
use crate::cursor::RecordStatement;
use crate::error::{EngineContext, Operation, Result, SqliteError};

/// A SQLite connection that stores and loads [`Record`] types.
///
/// Mappings are resolved through a [`MappingRegistry`], which can be shared
/// between several `Database` values with [`with_registry`](Self::with_registry).
///
/// # Examples
///
/// ```
/// use tablemap_core::{Query, Record, field, impl_record};
/// use tablemap_sqlite::Database;
///
/// #[derive(Debug, Default)]
/// struct Order {
///     id: i64,
///     status: String,
/// }
/// impl_record!(Order { id: Integer => primary_key auto_increment, status: Text });
///
/// let db = Database::open_in_memory().unwrap();
/// db.create_table::<Order>().unwrap();
///
/// let mut order = Order { status: "Shipped".into(), ..Default::default() };
/// db.insert(&mut order).unwrap();
/// assert!(order.id > 0);
///
/// let shipped = db
///     .first(&Query::<Order>::new().filter(field("status").eq("Shipped")))
///     .unwrap()
///     .unwrap();
/// assert_eq!(shipped.id, order.id);
/// ```
pub struct Database {
    conn: Connection,
    codec: ValueCodec,
    registry: Arc<MappingRegistry>,
    savepoint_depth: Cell<u32>,
}

impl Database {
    /// Opens (or creates) a database file with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &DatabaseConfig::default())
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().during(Operation::Open)?;
        Self::new(conn)
    }

    pub fn open_with(path: impl AsRef<Path>, config: &DatabaseConfig) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).during(Operation::Open)?;
        debug!(path = %path.display(), "Opened database");
        Self::with_config(conn, config)
    }

    /// Wraps an existing connection with the default configuration.
    pub fn new(conn: Connection) -> Result<Self> {
        Self::with_config(conn, &DatabaseConfig::default())
    }

    /// Wraps an existing connection, applying `config`'s pragmas.
    pub fn with_config(conn: Connection, config: &DatabaseConfig) -> Result<Self> {
        config.apply(&conn)?;
        Ok(Self {
            conn,
            codec: config.codec(),
            registry: Arc::new(MappingRegistry::new()),
            savepoint_depth: Cell::new(0),
        })
    }

    /// Replaces the mapping registry, e.g. to share one across connections.
    pub fn with_registry(mut self, registry: Arc<MappingRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn codec(&self) -> ValueCodec {
        self.codec
    }

    pub fn registry(&self) -> &Arc<MappingRegistry> {
        &self.registry
    }

    /// Returns the mapping for `R`, resolving it on first use.
    pub fn mapping<R: Record>(&self) -> Result<Arc<TableMapping>> {
        Ok(self.registry.get_or_build::<R>()?)
    }

    /// Pins `mapping` for `R`. See [`MappingRegistry::register_override`].
    pub fn register_override<R: Record>(&self, mapping: TableMapping) -> Arc<TableMapping> {
        self.registry.register_override::<R>(mapping)
    }

    // Schema

    /// Creates the table and indices for `R` if they do not exist.
    pub fn create_table<R: Record>(&self) -> Result<Arc<TableMapping>> {
        let mapping = self.mapping::<R>()?;
        self.materialize(&mapping)?;
        Ok(mapping)
    }

    /// Creates the table and indices for an explicit mapping.
    ///
    /// A mapping built for a record type is also registered for that type,
    /// so later operations on the type use it.
    pub fn create_table_from(&self, mapping: TableMapping) -> Result<Arc<TableMapping>> {
        let mapping = Arc::new(mapping);
        self.materialize(&mapping)?;
        self.registry.register(Arc::clone(&mapping));
        Ok(mapping)
    }

    fn materialize(&self, mapping: &TableMapping) -> Result<()> {
        let statements = create_table_sql(mapping, &self.codec);
        self.run_in_transaction(|db| {
            for sql in &statements {
                debug!(sql = %sql, "Executing DDL");
                db.conn.execute_batch(sql).during(Operation::CreateTable)?;
            }
            Ok(())
        })?;
        info!(
            table = mapping.table_name(),
            indexes = mapping.indexes().len(),
            "Created table"
        );
        Ok(())
    }

    /// Drops the table for `R` if it exists.
    pub fn drop_table<R: Record>(&self) -> Result<()> {
        let mapping = self.mapping::<R>()?;
        self.drop_table_for(&mapping)
    }

    pub fn drop_table_for(&self, mapping: &TableMapping) -> Result<()> {
        let sql = drop_table_sql(mapping);
        debug!(sql = %sql, "Executing DDL");
        self.conn.execute_batch(&sql).during(Operation::DropTable)?;
        info!(table = mapping.table_name(), "Dropped table");
        Ok(())
    }

    // Writes

    /// Inserts `record` and returns the number of rows added.
    ///
    /// When the engine assigns an autoincrement key, it is written back
    /// into `record`. If the key field cannot hold the assigned id, the
    /// insert is rolled back and [`tablemap_core::CodecError::OutOfRange`] is
    /// returned.
    pub fn insert<R: Record>(&self, record: &mut R) -> Result<usize> {
        self.insert_with(record, OnConflict::Abort)
    }

    /// Inserts `record`, replacing any row with the same key.
    pub fn insert_or_replace<R: Record>(&self, record: &mut R) -> Result<usize> {
        self.insert_with(record, OnConflict::Replace)
    }

    fn insert_with<R: Record>(&self, record: &mut R, conflict: OnConflict) -> Result<usize> {
        let mapping = self.mapping::<R>()?;
        let insert = insert_sql(&mapping, &self.codec, record, conflict)?;
        if !insert.generates_key {
            return self.run(Operation::Insert, &insert.statement);
        }

        // The row is kept only if the assigned key fits the record's key field.
        self.run_in_transaction(|db| {
            let count = db.run(Operation::Insert, &insert.statement)?;
            if let Some(key) = mapping.primary_key() {
                let id = db.conn.last_insert_rowid();
                record.set(&key.field, FieldValue::Integer(id))?;
            }
            Ok(count)
        })
    }

    /// Inserts every record inside one transaction.
    pub fn insert_all<R: Record>(&self, records: &mut [R]) -> Result<usize> {
        self.run_in_transaction(|db| {
            let mut total = 0;
            for record in records.iter_mut() {
                total += db.insert(record)?;
            }
            Ok(total)
        })
    }

    /// Updates the row identified by `record`'s key; returns rows changed.
    pub fn update<R: Record>(&self, record: &R) -> Result<usize> {
        let mapping = self.mapping::<R>()?;
        let statement = update_sql(&mapping, &self.codec, record)?;
        self.run(Operation::Update, &statement)
    }

    /// Updates every record inside one transaction.
    pub fn update_all<R: Record>(&self, records: &[R]) -> Result<usize> {
        self.run_in_transaction(|db| {
            let mut total = 0;
            for record in records {
                total += db.update(record)?;
            }
            Ok(total)
        })
    }

    pub fn delete<R: Record>(&self, record: &R) -> Result<usize> {
        let mapping = self.mapping::<R>()?;
        let statement = delete_sql(&mapping, &self.codec, record)?;
        self.run(Operation::Delete, &statement)
    }

    pub fn delete_by_key<R: Record>(&self, key: impl Into<FieldValue>) -> Result<usize> {
        let mapping = self.mapping::<R>()?;
        let statement = delete_by_key_sql(&mapping, &self.codec, &key.into())?;
        self.run(Operation::Delete, &statement)
    }

    // Reads

    /// Loads the row whose key equals `key`.
    pub fn find<R: Record>(&self, key: impl Into<FieldValue>) -> Result<Option<R>> {
        let mapping = self.mapping::<R>()?;
        let statement = select_by_key_sql(&mapping, &self.codec, &key.into())?;
        let mut stmt = self.prepare_records::<R>(mapping, statement)?;
        stmt.records()?.next().transpose()
    }

    /// Like [`find`](Self::find), but a missing row is an error.
    pub fn get<R: Record>(&self, key: impl Into<FieldValue>) -> Result<R> {
        match self.find::<R>(key)? {
            Some(record) => Ok(record),
            None => Err(SqliteError::NotFound {
                table: self.mapping::<R>()?.table_name().to_string(),
            }),
        }
    }

    /// Prepares `query`; iterate the result with [`RecordStatement::records`].
    pub fn query<R: Record>(&self, query: &Query<R>) -> Result<RecordStatement<'_, R>> {
        let mapping = self.mapping::<R>()?;
        let statement = QueryTranslator::new(&mapping, self.codec).select(query)?;
        self.prepare_records(mapping, statement)
    }

    pub fn query_all<R: Record>(&self, query: &Query<R>) -> Result<Vec<R>> {
        self.query(query)?.all()
    }

    /// Returns the first record matching `query`.
    pub fn first<R: Record>(&self, query: &Query<R>) -> Result<Option<R>> {
        let mut stmt = self.query(&query.clone().limit(1))?;
        stmt.records()?.next().transpose()
    }

    pub fn count<R: Record>(&self, query: &Query<R>) -> Result<usize> {
        let mapping = self.mapping::<R>()?;
        let statement = QueryTranslator::new(&mapping, self.codec).count(query)?;
        debug!(sql = %statement.sql, params = statement.params.len(), "Executing statement");
        let count: i64 = self
            .conn
            .prepare_cached(&statement.sql)
            .and_then(|mut stmt| {
                stmt.query_row(params_from_iter(statement.params.iter().map(to_engine)), |row| {
                    row.get(0)
                })
            })
            .during(Operation::Query)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Deletes every row matching `query`; returns rows removed.
    pub fn delete_where<R: Record>(&self, query: &Query<R>) -> Result<usize> {
        let mapping = self.mapping::<R>()?;
        let statement = QueryTranslator::new(&mapping, self.codec).delete(query)?;
        self.run(Operation::Delete, &statement)
    }

    /// Prepares caller-written SQL whose rows decode into `R`.
    ///
    /// Result columns are matched to `R`'s mapped columns by name.
    pub fn prepare_sql<R: Record>(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<RecordStatement<'_, R>> {
        let mapping = self.mapping::<R>()?;
        self.prepare_records(mapping, SqlStatement::new(sql, params.to_vec()))
    }

    /// Executes caller-written SQL; returns rows changed.
    pub fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize> {
        self.run(Operation::Execute, &SqlStatement::new(sql, params.to_vec()))
    }

    fn run(&self, operation: Operation, statement: &SqlStatement) -> Result<usize> {
        debug!(sql = %statement.sql, params = statement.params.len(), "Executing statement");
        let mut stmt = self.conn.prepare_cached(&statement.sql).during(operation)?;
        stmt.execute(params_from_iter(statement.params.iter().map(to_engine)))
            .during(operation)
    }

    fn prepare_records<R: Record>(
        &self,
        mapping: Arc<TableMapping>,
        statement: SqlStatement,
    ) -> Result<RecordStatement<'_, R>> {
        debug!(sql = %statement.sql, params = statement.params.len(), "Preparing query");
        let stmt = self
            .conn
            .prepare_cached(&statement.sql)
            .during(Operation::Query)?;
        let decoder = RowDecoder::new(mapping, self.codec, &stmt.column_names());
        let params = statement.params.iter().map(to_engine).collect();
        Ok(RecordStatement::new(stmt, decoder, params))
    }

    // Transactions

    /// Runs `f` inside a transaction.
    ///
    /// Each call opens a named savepoint, so calls nest: an inner failure
    /// rolls back only the inner work. The savepoint is released when `f`
    /// returns `Ok`, and rolled back when it returns `Err` or panics.
    pub fn run_in_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T>,
    {
        let depth = self.savepoint_depth.get();
        let name = format!("tablemap_sp{depth}");
        self.conn
            .execute_batch(&format!("SAVEPOINT {name}"))
            .during(Operation::Transaction)?;
        self.savepoint_depth.set(depth + 1);

        let mut guard = Savepoint {
            db: self,
            name,
            depth,
            finished: false,
        };
        match f(self) {
            Ok(value) => {
                guard.release()?;
                Ok(value)
            }
            Err(err) => {
                guard.rollback()?;
                warn!(error = %err, "Rolled back transaction");
                Err(err)
            }
        }
    }

    /// Nesting depth of open transactions.
    pub fn transaction_depth(&self) -> u32 {
        self.savepoint_depth.get()
    }
}

struct Savepoint<'db> {
    db: &'db Database,
    name: String,
    depth: u32,
    finished: bool,
}

impl Savepoint<'_> {
    fn release(&mut self) -> Result<()> {
        // On failure the savepoint stays open and Drop rolls it back.
        self.db
            .conn
            .execute_batch(&format!("RELEASE {}", self.name))
            .during(Operation::Transaction)?;
        self.finished = true;
        self.db.savepoint_depth.set(self.depth);
        if self.depth == 0 {
            info!("Committed transaction");
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.finished = true;
        self.db.savepoint_depth.set(self.depth);
        self.db
            .conn
            .execute_batch(&format!("ROLLBACK TO {0}; RELEASE {0}", self.name))
            .during(Operation::Transaction)
    }
}

impl Drop for Savepoint<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.rollback() {
                warn!(error = %err, "Failed to roll back savepoint");
            }
        }
    }
}
