use std::{collections::BTreeMap, path::Path};

use ahash::AHashMap;
use anyhow::{Context, Result};
use polars::prelude::{Column, DataFrame, DataType};
use tracing::warn;

use crate::{io::csv, vector::Fid};
use super::{AttributeWriter, Record, StoreError};

type Rows = BTreeMap<Fid, Vec<Option<f64>>>;

/// State captured at `start_transaction` and restored on rollback.
#[derive(Debug, Clone)]
struct Snapshot {
    fields: usize,
    rows: Rows,
}

/// An ordered table of nullable real fields keyed by feature id, exported
/// through polars.
#[derive(Debug, Clone)]
pub struct AttributeTable {
    key: String,
    fields: Vec<String>,
    lookup: AHashMap<String, usize>,
    rows: Rows,
    snapshot: Option<Snapshot>,
}

impl AttributeTable {
    /// Empty table whose key column is named `key`.
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            fields: Vec::new(),
            lookup: AHashMap::new(),
            rows: BTreeMap::new(),
            snapshot: None,
        }
    }

    #[inline] pub fn key(&self) -> &str { &self.key }

    #[inline] pub fn fields(&self) -> &[String] { &self.fields }

    #[inline] pub fn len(&self) -> usize { self.rows.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    #[inline] pub fn contains(&self, id: Fid) -> bool { self.rows.contains_key(&id) }

    /// Record ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = Fid> + '_ {
        self.rows.keys().copied()
    }

    /// Stored value, `None` when the record, the field or the value is missing.
    pub fn value(&self, id: Fid, field: &str) -> Option<f64> {
        let &col = self.lookup.get(field)?;
        self.rows.get(&id)?[col]
    }

    /// Insert new records. Every record is attempted; records with a duplicate
    /// key or an unknown field are rejected and counted, and a single
    /// [`StoreError::Constraint`] reports them after the batch.
    pub fn insert_rows(&mut self, records: impl IntoIterator<Item = Record>) -> Result<usize, StoreError> {
        let (mut attempted, mut failed) = (0, 0);
        for record in records {
            attempted += 1;
            match self.insert_row(record) {
                Ok(()) => {}
                Err(err) => {
                    warn!(table = %self.key, %err, "rejected record");
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(StoreError::Constraint { failed, attempted });
        }
        Ok(attempted)
    }

    fn insert_row(&mut self, record: Record) -> Result<(), StoreError> {
        if self.rows.contains_key(&record.id) {
            return Err(StoreError::DuplicateKey(record.id));
        }
        let mut row = vec![None; self.fields.len()];
        for (field, value) in record.values {
            let &col = self.lookup.get(&field).ok_or(StoreError::UnknownField(field))?;
            row[col] = value;
        }
        self.rows.insert(record.id, row);
        Ok(())
    }

    /// Export as a DataFrame: the key as `Int64`, then one `Float64` column per field.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.fields.len() + 1);
        columns.push(Column::new(self.key.as_str().into(), self.rows.keys().copied().collect::<Vec<i64>>()));
        for (col, field) in self.fields.iter().enumerate() {
            columns.push(Column::new(
                field.as_str().into(),
                self.rows.values().map(|row| row[col]).collect::<Vec<Option<f64>>>(),
            ));
        }
        DataFrame::new(columns)
            .with_context(|| format!("[store::table] Failed to build DataFrame for table {:?}", self.key))
    }

    /// Build a table from a DataFrame keyed by the `key` column.
    /// Other columns are cast to `Float64`; columns that cannot be cast are skipped.
    pub fn from_dataframe(df: &DataFrame, key: &str) -> Result<Self> {
        let ids = df.column(key)
            .with_context(|| format!("[store::table] Missing key column {key:?}"))?
            .cast(&DataType::Int64)?;
        let ids = ids.i64()?;

        let mut table = Self::new(key);
        let mut columns = Vec::new();
        for column in df.get_columns().iter().filter(|column| column.name().as_str() != key) {
            match column.cast(&DataType::Float64) {
                Ok(values) => {
                    table.add_field(column.name().as_str())?;
                    columns.push(values);
                }
                Err(err) => warn!(table = key, field = %column.name(), %err, "skipping non-numeric column"),
            }
        }

        let records = ids.into_iter().enumerate()
            .filter_map(|(i, id)| id.map(|id| (i, id)))
            .map(|(i, id)| -> Result<(Fid, Vec<Option<f64>>)> {
                let mut row = Vec::with_capacity(columns.len());
                for values in &columns {
                    row.push(values.f64()?.get(i));
                }
                Ok((id, row))
            })
            .collect::<Result<Vec<_>>>()?;

        let skipped = ids.len() - records.len();
        if skipped > 0 {
            warn!(table = key, skipped, "skipping rows without a key");
        }
        let fields = table.fields.clone();
        table.insert_rows(records.into_iter().map(|(id, row)| Record {
            id,
            values: fields.iter().cloned().zip(row).collect(),
        }))?;
        Ok(table)
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        csv::write_csv(&mut self.to_dataframe()?, path)
    }

    pub fn to_csv_string(&self) -> Result<String> {
        csv::write_csv_string(&mut self.to_dataframe()?)
    }

    pub fn read_csv(path: &Path, key: &str) -> Result<Self> {
        Self::from_dataframe(&csv::read_csv(path)?, key)
    }

    pub fn from_csv_string(text: &str, key: &str) -> Result<Self> {
        Self::from_dataframe(&csv::read_csv_string(text)?, key)
    }

    #[cfg(feature = "parquet")]
    pub fn write_parquet(&self, path: &Path) -> Result<()> {
        crate::io::parquet::write_parquet(&mut self.to_dataframe()?, path)
    }

    #[cfg(feature = "parquet")]
    pub fn read_parquet(path: &Path, key: &str) -> Result<Self> {
        Self::from_dataframe(&crate::io::parquet::read_parquet(path)?, key)
    }
}

impl AttributeWriter for AttributeTable {
    fn add_field(&mut self, field: &str) -> Result<(), StoreError> {
        if self.lookup.contains_key(field) {
            return Ok(());
        }
        self.lookup.insert(field.to_string(), self.fields.len());
        self.fields.push(field.to_string());
        self.rows.values_mut().for_each(|row| row.push(None));
        Ok(())
    }

    #[inline]
    fn has_field(&self, field: &str) -> bool {
        self.lookup.contains_key(field)
    }

    fn start_transaction(&mut self) -> Result<(), StoreError> {
        if self.snapshot.is_some() {
            return Err(StoreError::TransactionActive);
        }
        self.snapshot = Some(Snapshot { fields: self.fields.len(), rows: self.rows.clone() });
        Ok(())
    }

    fn update(&mut self, id: Fid, field: &str, value: Option<f64>) -> Result<bool, StoreError> {
        let &col = self.lookup.get(field).ok_or_else(|| StoreError::UnknownField(field.to_string()))?;
        match self.rows.get_mut(&id) {
            Some(row) => {
                row[col] = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn commit_transaction(&mut self) -> Result<(), StoreError> {
        self.snapshot.take().map(|_| ()).ok_or(StoreError::NoTransaction)
    }

    fn rollback_transaction(&mut self) -> Result<(), StoreError> {
        let snapshot = self.snapshot.take().ok_or(StoreError::NoTransaction)?;
        for field in self.fields.drain(snapshot.fields..) {
            self.lookup.remove(&field);
        }
        self.rows = snapshot.rows;
        Ok(())
    }

    fn fill_nulls(&mut self, field: &str, value: f64) -> Result<usize, StoreError> {
        let &col = self.lookup.get(field).ok_or_else(|| StoreError::UnknownField(field.to_string()))?;
        let mut filled = 0;
        for cell in self.rows.values_mut().map(|row| &mut row[col]).filter(|cell| cell.is_none()) {
            *cell = Some(value);
            filled += 1;
        }
        Ok(filled)
    }
}
