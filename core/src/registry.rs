//! Cache of resolved table mappings keyed by record type.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::SchemaError;
use crate::mapping::TableMapping;
use crate::record::Record;

/// Resolves and caches one [`TableMapping`] per record type.
///
/// A registry is an ordinary value; callers create one and share it (a
/// `Database` owns one). Lookups take a read lock. A mapping missing from the
/// cache is built outside any lock and then published; when two threads race
/// on the same type, the first published mapping wins and the other build is
/// discarded.
#[derive(Debug, Default)]
pub struct MappingRegistry {
    mappings: RwLock<HashMap<TypeId, Arc<TableMapping>>>,
}

impl MappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached mapping for `R`, if one has been resolved.
    pub fn get<R: Record>(&self) -> Option<Arc<TableMapping>> {
        self.mappings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<R>())
            .cloned()
    }

    /// Returns the mapping for `R`, building it from [`Record::mapping`] on
    /// first use.
    ///
    /// # Errors
    ///
    /// Propagates the [`SchemaError`] from finalizing `R`'s builder. Nothing
    /// is cached on failure.
    pub fn get_or_build<R: Record>(&self) -> Result<Arc<TableMapping>, SchemaError> {
        if let Some(mapping) = self.get::<R>() {
            return Ok(mapping);
        }

        let built = Arc::new(R::mapping().finalize()?);
        let mut mappings = self
            .mappings
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(
            mappings.entry(TypeId::of::<R>()).or_insert(built),
        ))
    }

    /// Pins `mapping` for `R`, replacing anything cached before.
    ///
    /// Used to map a type onto a table whose shape is fixed elsewhere, such
    /// as an engine system table.
    pub fn register_override<R: Record>(&self, mapping: TableMapping) -> Arc<TableMapping> {
        let mapping = Arc::new(mapping);
        self.mappings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<R>(), Arc::clone(&mapping));
        mapping
    }

    /// Registers `mapping` under the record type it was built for.
    ///
    /// Returns `false` (and registers nothing) for mappings built from a bare
    /// descriptor.
    pub fn register(&self, mapping: Arc<TableMapping>) -> bool {
        let Some(record_type) = mapping.record_type() else {
            return false;
        };
        self.mappings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record_type.id, mapping);
        true
    }

    /// Drops the cached mapping for `R`.
    pub fn remove<R: Record>(&self) -> Option<Arc<TableMapping>> {
        self.mappings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&TypeId::of::<R>())
    }

    pub fn len(&self) -> usize {
        self.mappings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
