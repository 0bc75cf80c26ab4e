use std::collections::BTreeMap;

use geo::Geometry;

/// Feature identifier, unique within a layer.
pub type Fid = i64;

/// A single attribute value on a feature.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl FieldValue {
    /// Numeric view of the value; text is parsed when it holds a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Real(v) if v.is_finite() => Some(*v),
            FieldValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Integer view of the value; reals are truncated toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            FieldValue::Real(v) if v.is_finite() => Some(v.trunc() as i64),
            FieldValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    #[inline] pub fn is_null(&self) -> bool { matches!(self, FieldValue::Null) }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self { FieldValue::Real(v) }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self { FieldValue::Integer(v) }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self { FieldValue::Bool(v) }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self { FieldValue::Text(v.to_string()) }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self { FieldValue::Text(v) }
}

impl From<Option<f64>> for FieldValue {
    fn from(v: Option<f64>) -> Self { v.map_or(FieldValue::Null, FieldValue::Real) }
}

/// A vector feature: identifier, optional geometry and named attributes.
#[derive(Debug, Clone)]
pub struct Feature {
    pub fid: Fid,
    pub geometry: Option<Geometry<f64>>,
    pub attributes: BTreeMap<String, FieldValue>,
}

impl Feature {
    pub fn new(fid: Fid, geometry: Option<Geometry<f64>>) -> Self {
        Self { fid, geometry, attributes: BTreeMap::new() }
    }

    /// Builder-style attribute assignment.
    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.attributes.insert(field.to_string(), value.into());
        self
    }

    #[inline]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.attributes.get(field)
    }

    #[inline]
    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_f64)
    }

    #[inline]
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(FieldValue::as_i64)
    }

    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) {
        self.attributes.insert(field.to_string(), value.into());
    }
}
