use std::collections::BTreeSet;

use crate::vector::{FeatureLayer, FieldValue, Fid};
use super::{AttributeWriter, StoreError};

/// Changes recorded while a transaction is open, undone in reverse on rollback.
#[derive(Debug, Default)]
struct Journal {
    changes: Vec<(Fid, String, Option<FieldValue>)>,
    fields: Vec<String>,
}

/// Writes attributes directly onto the features of a live layer.
#[derive(Debug)]
pub struct LayerWriter<'a> {
    layer: &'a mut FeatureLayer,
    fields: BTreeSet<String>,
    journal: Option<Journal>,
}

impl<'a> LayerWriter<'a> {
    /// Every attribute already present on some feature counts as a field.
    pub fn new(layer: &'a mut FeatureLayer) -> Self {
        let fields = layer.features().iter()
            .flat_map(|feature| feature.attributes.keys().cloned())
            .collect();
        Self { layer, fields, journal: None }
    }

    #[inline] pub fn layer(&self) -> &FeatureLayer { &*self.layer }

    fn record(&mut self, fid: Fid, field: &str, previous: Option<FieldValue>) {
        if let Some(journal) = &mut self.journal {
            journal.changes.push((fid, field.to_string(), previous));
        }
    }

    fn require_field(&self, field: &str) -> Result<(), StoreError> {
        if self.fields.contains(field) {
            Ok(())
        } else {
            Err(StoreError::UnknownField(field.to_string()))
        }
    }
}

impl AttributeWriter for LayerWriter<'_> {
    fn add_field(&mut self, field: &str) -> Result<(), StoreError> {
        if !self.fields.insert(field.to_string()) {
            return Ok(());
        }
        let added: Vec<Fid> = self.layer.features_mut().iter_mut()
            .filter(|feature| !feature.attributes.contains_key(field))
            .map(|feature| {
                feature.set(field, FieldValue::Null);
                feature.fid
            })
            .collect();
        if let Some(journal) = &mut self.journal {
            journal.fields.push(field.to_string());
            journal.changes.extend(added.into_iter().map(|fid| (fid, field.to_string(), None)));
        }
        Ok(())
    }

    #[inline]
    fn has_field(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    fn start_transaction(&mut self) -> Result<(), StoreError> {
        if self.journal.is_some() {
            return Err(StoreError::TransactionActive);
        }
        self.journal = Some(Journal::default());
        Ok(())
    }

    fn update(&mut self, id: Fid, field: &str, value: Option<f64>) -> Result<bool, StoreError> {
        self.require_field(field)?;
        let Some(feature) = self.layer.feature_mut(id) else { return Ok(false) };
        let previous = feature.attributes.insert(field.to_string(), value.into());
        self.record(id, field, previous);
        Ok(true)
    }

    fn commit_transaction(&mut self) -> Result<(), StoreError> {
        self.journal.take().map(|_| ()).ok_or(StoreError::NoTransaction)
    }

    fn rollback_transaction(&mut self) -> Result<(), StoreError> {
        let journal = self.journal.take().ok_or(StoreError::NoTransaction)?;
        for (fid, field, previous) in journal.changes.into_iter().rev() {
            let Some(feature) = self.layer.feature_mut(fid) else { continue };
            match previous {
                Some(value) => feature.attributes.insert(field, value),
                None => feature.attributes.remove(&field),
            };
        }
        for field in journal.fields {
            self.fields.remove(&field);
        }
        Ok(())
    }

    fn fill_nulls(&mut self, field: &str, value: f64) -> Result<usize, StoreError> {
        self.require_field(field)?;
        let filled: Vec<(Fid, Option<FieldValue>)> = self.layer.features_mut().iter_mut()
            .filter(|feature| feature.get(field).is_none_or(FieldValue::is_null))
            .map(|feature| (feature.fid, feature.attributes.insert(field.to_string(), FieldValue::Real(value))))
            .collect();
        let count = filled.len();
        for (fid, previous) in filled {
            self.record(fid, field, previous);
        }
        Ok(count)
    }
}
