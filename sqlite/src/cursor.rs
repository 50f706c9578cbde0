//! Lazy record cursors over prepared statements.

use std::marker::PhantomData;

use rusqlite::types::Value;
use rusqlite::{CachedStatement, Rows, params_from_iter};
use tablemap_core::{Record, RowDecoder, TableMapping};

use crate::convert::row_values;
use crate::error::{EngineContext, Operation, Result};

/// A prepared query that yields records of type `R`.
///
/// Each call to [`records`](Self::records) executes the statement again and
/// returns a fresh single-pass iterator reflecting the current contents of
/// the database. The statement is finalized (returned to the connection's
/// statement cache) when this value is dropped.
pub struct RecordStatement<'conn, R> {
    stmt: CachedStatement<'conn>,
    decoder: RowDecoder,
    params: Vec<Value>,
    _record: PhantomData<fn() -> R>,
}

impl<'conn, R: Record> RecordStatement<'conn, R> {
    pub(crate) fn new(stmt: CachedStatement<'conn>, decoder: RowDecoder, params: Vec<Value>) -> Self {
        Self {
            stmt,
            decoder,
            params,
            _record: PhantomData,
        }
    }

    /// Mapping used to decode rows.
    pub fn mapping(&self) -> &TableMapping {
        self.decoder.mapping()
    }

    /// Runs the statement and returns an iterator over the decoded rows.
    ///
    /// The iterator stops after the first error.
    pub fn records(&mut self) -> Result<Records<'_, R>> {
        let rows = self
            .stmt
            .query(params_from_iter(self.params.iter()))
            .during(Operation::Query)?;
        Ok(Records {
            rows,
            decoder: &self.decoder,
            done: false,
            _record: PhantomData,
        })
    }

    /// Runs the statement and collects every row.
    pub fn all(&mut self) -> Result<Vec<R>> {
        self.records()?.collect()
    }
}

/// Iterator over the rows of one execution of a [`RecordStatement`].
pub struct Records<'stmt, R> {
    rows: Rows<'stmt>,
    decoder: &'stmt RowDecoder,
    done: bool,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Iterator for Records<'_, R> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let decoded = match self.rows.next() {
            Ok(Some(row)) => row_values(row, self.decoder.width())
                .and_then(|values| self.decoder.decode(values).map_err(Into::into)),
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(source) => Err(crate::SqliteError::Engine {
                operation: Operation::Query,
                source,
            }),
        };
        if decoded.is_err() {
            self.done = true;
        }
        Some(decoded)
    }
}
