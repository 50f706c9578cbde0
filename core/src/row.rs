//! Rehydration of result rows into records.

use std::sync::Arc;

use crate::codec::ValueCodec;
use crate::error::CodecError;
use crate::mapping::TableMapping;
use crate::record::Record;
use crate::value::SqlValue;

/// Maps the columns of one result set onto the fields of a mapping.
///
/// The slot table is computed once from the result's column names, so each
/// row only pays for decoding. Result columns with no mapped field are
/// skipped, and mapped fields missing from the result keep their default.
#[derive(Debug, Clone)]
pub struct RowDecoder {
    mapping: Arc<TableMapping>,
    codec: ValueCodec,
    slots: Vec<Option<usize>>,
}

impl RowDecoder {
    pub fn new<S: AsRef<str>>(
        mapping: Arc<TableMapping>,
        codec: ValueCodec,
        column_names: &[S],
    ) -> Self {
        let slots = column_names
            .iter()
            .map(|name| {
                mapping
                    .columns()
                    .iter()
                    .position(|c| c.name.eq_ignore_ascii_case(name.as_ref()))
            })
            .collect();
        Self {
            mapping,
            codec,
            slots,
        }
    }

    pub fn mapping(&self) -> &Arc<TableMapping> {
        &self.mapping
    }

    /// Number of result columns this decoder expects.
    pub fn width(&self) -> usize {
        self.slots.len()
    }

    /// Builds a record from one row given in result-column order.
    pub fn decode<R: Record>(&self, values: Vec<SqlValue>) -> Result<R, CodecError> {
        let mut record = R::default();
        for (slot, stored) in self.slots.iter().zip(values) {
            let Some(index) = slot else { continue };
            let column = &self.mapping.columns()[*index];
            let value = self.codec.decode(column.ty, &stored)?;
            record.set(&column.field, value)?;
        }
        Ok(record)
    }
}
