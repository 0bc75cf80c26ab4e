use super::{Feature, FieldValue};

/// Typed attribute filter applied while iterating a layer.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeFilter {
    /// Field equals value. Numbers compare numerically, text compares exactly.
    Eq(String, FieldValue),
    /// Numeric field lies in `[min, max]` (inclusive both ends).
    Between { field: String, min: f64, max: f64 },
    /// Every inner filter matches.
    And(Vec<AttributeFilter>),
}

impl AttributeFilter {
    pub fn eq(field: &str, value: impl Into<FieldValue>) -> Self {
        AttributeFilter::Eq(field.to_string(), value.into())
    }

    pub fn between(field: &str, min: f64, max: f64) -> Self {
        AttributeFilter::Between { field: field.to_string(), min, max }
    }

    /// Combine two filters, flattening nested conjunctions.
    pub fn and(self, other: AttributeFilter) -> Self {
        let mut parts = match self {
            AttributeFilter::And(parts) => parts,
            filter => vec![filter],
        };
        match other {
            AttributeFilter::And(more) => parts.extend(more),
            filter => parts.push(filter),
        }
        AttributeFilter::And(parts)
    }

    /// Check a feature against the filter. Missing or null fields never match.
    pub fn matches(&self, feature: &Feature) -> bool {
        match self {
            AttributeFilter::Eq(field, expected) => match feature.get(field) {
                None | Some(FieldValue::Null) => false,
                Some(actual) => match (actual.as_f64(), expected.as_f64()) {
                    (Some(a), Some(b)) if !matches!(expected, FieldValue::Text(_)) => a == b,
                    _ => actual == expected,
                },
            },
            AttributeFilter::Between { field, min, max } => feature.get_f64(field)
                .is_some_and(|v| v >= *min && v <= *max),
            AttributeFilter::And(parts) => parts.iter().all(|part| part.matches(feature)),
        }
    }
}
