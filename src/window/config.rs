use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Window length per stream-size class, keyed by the class as a string (`"0"`, `"1"`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowLengths(BTreeMap<String, f64>);

impl WindowLengths {
    pub fn new(lengths: impl IntoIterator<Item = (i64, f64)>) -> Self {
        Self(lengths.into_iter().map(|(class, length)| (class.to_string(), length)).collect())
    }

    /// Window length for a stream-size class.
    #[inline]
    pub fn get(&self, stream_size: i64) -> Option<f64> {
        self.0.get(&stream_size.to_string()).copied()
    }

    /// Iterate the raw `(class, length)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(class, &length)| (class.as_str(), length))
    }
}

impl Default for WindowLengths {
    fn default() -> Self {
        Self::new([(0, 200.0), (1, 400.0), (2, 1200.0), (3, 2000.0), (4, 8000.0)])
    }
}

/// How window membership is decided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStrategy {
    /// Every DGO on the level path within half a window length of the IGO distance.
    #[default]
    ByDistanceRange,
    /// Start at the DGO under the IGO and grow through touching DGOs.
    ByDgoIntersection,
}

/// How distance bounds are compared against DGO distances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceFilter {
    /// Truncate both bounds toward zero first. Matches results produced by earlier tooling.
    #[default]
    Truncated,
    /// Compare the exact floating point bounds.
    Exact,
}

impl DistanceFilter {
    /// Inclusive `[min, max]` bounds for a window of `length` centred on `distance`.
    pub fn bounds(&self, distance: f64, length: f64) -> (f64, f64) {
        let (min, max) = (distance - 0.5 * length, distance + 0.5 * length);
        match self {
            DistanceFilter::Truncated => (min.trunc(), max.trunc()),
            DistanceFilter::Exact => (min, max),
        }
    }
}
