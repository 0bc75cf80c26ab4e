use geo::{Area, Geometry, MultiPolygon};

use crate::{network::LevelPath, vector::{Feature, Fid}};

/// Union of the DGO polygons around one IGO, with the DGO totals.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// IGO the window is centred on
    pub igo: Fid,
    pub level_path: LevelPath,
    /// Window length actually used, after any widening
    pub length: f64,
    /// Repaired union of the member polygons; empty when there are no members
    pub polygon: MultiPolygon<f64>,
    pub centerline_length: f64,
    pub segment_area: f64,
    /// Member DGO ids in ascending distance order
    pub members: Vec<Fid>,
}

impl Window {
    /// A window with no members.
    pub fn empty(igo: Fid, level_path: LevelPath, length: f64) -> Self {
        Self {
            igo,
            level_path,
            length,
            polygon: MultiPolygon::new(vec![]),
            centerline_length: 0.0,
            segment_area: 0.0,
            members: vec![],
        }
    }

    #[inline] pub fn is_empty(&self) -> bool { self.members.is_empty() }

    /// Planar area of the window polygon in its own CRS units.
    #[inline] pub fn planar_area(&self) -> f64 { self.polygon.unsigned_area() }

    /// Export as a feature keyed by the IGO id.
    pub fn to_feature(&self) -> Feature {
        Feature::new(self.igo, Some(Geometry::MultiPolygon(self.polygon.clone())))
            .with("level_path", self.level_path.0)
            .with("window_length", self.length)
            .with("centerline_length", self.centerline_length)
            .with("segment_area", self.segment_area)
            .with("dgo_count", self.members.len() as i64)
    }
}
