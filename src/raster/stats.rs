use serde::{Deserialize, Serialize};

/// Running summary of the valid raster cells under a mask.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CellStats {
    pub count: usize,
    pub sum: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl CellStats {
    /// Add one valid cell value.
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    #[inline] pub fn is_empty(&self) -> bool { self.count == 0 }

    /// Mean of the valid cells, `None` when nothing was sampled.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

impl FromIterator<f64> for CellStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = CellStats::default();
        iter.into_iter().for_each(|v| stats.push(v));
        stats
    }
}

/// Statistic reported for a masked raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Min,
    Max,
    Mean,
    Sum,
    Count,
}

impl Statistic {
    /// Short name used as an output field suffix.
    pub fn name(&self) -> &'static str {
        match self {
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Mean => "mean",
            Statistic::Sum => "sum",
            Statistic::Count => "count",
        }
    }

    /// Pick this statistic out of a summary. Only `Count` is defined for an empty mask.
    pub fn apply(&self, stats: &CellStats) -> Option<f64> {
        match self {
            Statistic::Min => stats.min,
            Statistic::Max => stats.max,
            Statistic::Mean => stats.mean(),
            Statistic::Sum => (!stats.is_empty()).then_some(stats.sum),
            Statistic::Count => Some(stats.count as f64),
        }
    }
}
