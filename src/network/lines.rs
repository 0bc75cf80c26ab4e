use std::collections::BTreeMap;

use geo::{Centroid, Coord, Geometry, LineString, MultiLineString};
use tracing::warn;

use crate::vector::FeatureLayer;
use super::LevelPath;

/// Full (unclipped) network lines grouped by level path.
#[derive(Debug, Clone, Default)]
pub struct NetworkLines {
    lines: BTreeMap<LevelPath, MultiLineString<f64>>,
}

impl NetworkLines {
    /// Group the line parts of a flowline or centerline layer by level path.
    /// Parts keep their layer order within each level path.
    pub fn from_layer(layer: &FeatureLayer, level_path_field: &str) -> Self {
        let mut lines: BTreeMap<LevelPath, Vec<LineString<f64>>> = BTreeMap::new();
        for feature in layer.features() {
            let Some(lp) = feature.get_i64(level_path_field) else {
                warn!(layer = layer.name(), fid = feature.fid, "skipping line without level path");
                continue;
            };
            let parts: Vec<LineString<f64>> = match &feature.geometry {
                Some(Geometry::LineString(line)) => vec![line.clone()],
                Some(Geometry::MultiLineString(multi)) => multi.0.clone(),
                Some(Geometry::Line(line)) => vec![LineString::from(vec![line.start, line.end])],
                _ => {
                    warn!(layer = layer.name(), fid = feature.fid, "skipping feature without line geometry");
                    continue;
                }
            };
            lines.entry(LevelPath(lp)).or_default().extend(parts);
        }
        Self { lines: lines.into_iter().map(|(lp, parts)| (lp, MultiLineString::new(parts))).collect() }
    }

    #[inline] pub fn get(&self, level_path: LevelPath) -> Option<&MultiLineString<f64>> {
        self.lines.get(&level_path)
    }

    #[inline] pub fn len(&self) -> usize { self.lines.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.lines.is_empty() }

    /// Centroid of a level path's lines, used to pick its metric transform.
    pub fn center(&self, level_path: LevelPath) -> Option<Coord<f64>> {
        self.get(level_path)?.centroid().map(|point| point.0)
    }
}
