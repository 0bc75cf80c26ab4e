use std::{fs, path::Path};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    network::NetworkFields,
    window::{DistanceFilter, WindowLengths, WindowStrategy},
    zonal::DensityBasis,
};

/// Settings for one moving-window run. Every field has a default, so a
/// config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub window_lengths: WindowLengths,
    pub strategy: WindowStrategy,
    pub distance_filter: DistanceFilter,
    /// Double the window length on level paths whose first DGO spacing exceeds half of it.
    pub widen_sparse_windows: bool,
    /// Decimal places kept when stitching clipped lines.
    pub precision: u32,
    /// Endpoint buffer radius for elevation sampling, in raster CRS units.
    pub buffer_elevation: f64,
    pub density_basis: DensityBasis,
    pub fields: NetworkFields,
    /// Key column of the IGO output table.
    pub igo_key: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            window_lengths: WindowLengths::default(),
            strategy: WindowStrategy::default(),
            distance_filter: DistanceFilter::default(),
            widen_sparse_windows: false,
            precision: 6,
            buffer_elevation: 15.0,
            density_basis: DensityBasis::default(),
            fields: NetworkFields::default(),
            igo_key: "igo_id".into(),
        }
    }
}

impl RunConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .context("[config] Failed to parse run config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("[config] Failed to read run config: {}", path.display()))?;
        Self::from_json_str(&json)
            .with_context(|| format!("[config] Invalid run config: {}", path.display()))
    }

    /// Reject settings the run cannot work with.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.window_lengths.iter().next().is_some(), "[config] window_lengths is empty");
        for (class, length) in self.window_lengths.iter() {
            ensure!(class.parse::<i64>().is_ok(), "[config] stream size class {class:?} is not an integer");
            ensure!(length.is_finite() && length > 0.0, "[config] window length for class {class} must be positive, got {length}");
        }
        ensure!(self.buffer_elevation.is_finite() && self.buffer_elevation >= 0.0,
            "[config] buffer_elevation must be non-negative, got {}", self.buffer_elevation);
        ensure!(self.precision <= 15, "[config] precision must be at most 15 decimals, got {}", self.precision);
        ensure!(!self.igo_key.is_empty(), "[config] igo_key is empty");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(RunConfig::from_json_str("{}").unwrap(), RunConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = RunConfig::from_json_str(r#"{
            "window_lengths": { "0": 100, "1": 300 },
            "strategy": "by_dgo_intersection",
            "distance_filter": "exact",
            "density_basis": "centerline_length",
            "fields": { "igo": { "stream_size": "StrmOrder" } }
        }"#).unwrap();
        assert_eq!(config.window_lengths.get(1), Some(300.0));
        assert_eq!(config.strategy, WindowStrategy::ByDgoIntersection);
        assert_eq!(config.distance_filter, DistanceFilter::Exact);
        assert_eq!(config.density_basis, DensityBasis::CenterlineLength);
        assert_eq!(config.fields.igo.stream_size, "StrmOrder");
        assert_eq!(config.fields.igo.level_path, "level_path");
        assert_eq!(config.precision, 6);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(RunConfig::from_json_str(r#"{ "window_lengths": {} }"#).is_err());
        assert!(RunConfig::from_json_str(r#"{ "window_lengths": { "small": 100 } }"#).is_err());
        assert!(RunConfig::from_json_str(r#"{ "window_lengths": { "0": -5 } }"#).is_err());
        assert!(RunConfig::from_json_str(r#"{ "buffer_elevation": -1 }"#).is_err());
        assert!(RunConfig::from_json_str(r#"{ "strategy": "by_magic" }"#).is_err());
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "buffer_elevation": 30 }}"#).unwrap();
        let config = RunConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.buffer_elevation, 30.0);
        assert!(RunConfig::from_json_file(Path::new("/nonexistent/run.json")).is_err());
    }
}
