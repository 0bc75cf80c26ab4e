use std::collections::BTreeMap;

use crate::vector::Fid;
use super::StoreError;

/// Keyed, field-addressed writes of nullable real values.
///
/// Implemented by the in-memory [`AttributeTable`](super::AttributeTable) and
/// by [`LayerWriter`](super::LayerWriter) for writing straight onto a layer.
/// Updates made outside a transaction apply immediately.
pub trait AttributeWriter {
    /// Add a nullable real field. Adding an existing field is a no-op.
    fn add_field(&mut self, field: &str) -> Result<(), StoreError>;

    fn has_field(&self, field: &str) -> bool;

    fn start_transaction(&mut self) -> Result<(), StoreError>;

    /// Set `field` on the record keyed by `id`. Returns `false` when no such
    /// record exists, in which case nothing is written.
    fn update(&mut self, id: Fid, field: &str, value: Option<f64>) -> Result<bool, StoreError>;

    fn commit_transaction(&mut self) -> Result<(), StoreError>;

    /// Undo every change made since [`start_transaction`](Self::start_transaction).
    fn rollback_transaction(&mut self) -> Result<(), StoreError>;

    /// Replace nulls in `field` with `value`, returning how many were filled.
    fn fill_nulls(&mut self, field: &str, value: f64) -> Result<usize, StoreError>;

    /// Write several fields of one record.
    fn update_many(&mut self, id: Fid, values: &[(&str, Option<f64>)]) -> Result<bool, StoreError> {
        let mut found = true;
        for &(field, value) in values {
            found &= self.update(id, field, value)?;
        }
        Ok(found)
    }
}

/// One row to insert into an [`AttributeTable`](super::AttributeTable).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub id: Fid,
    pub values: BTreeMap<String, Option<f64>>,
}

impl Record {
    pub fn new(id: Fid) -> Self {
        Self { id, values: BTreeMap::new() }
    }

    pub fn with(mut self, field: &str, value: Option<f64>) -> Self {
        self.values.insert(field.to_string(), value);
        self
    }
}
