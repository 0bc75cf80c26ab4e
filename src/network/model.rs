use std::fmt;

use geo::{Geometry, MultiPolygon, Point};
use tracing::warn;

use crate::vector::{Feature, FeatureLayer, Fid};
use super::{DgoFields, IgoFields};

/// Identifier grouping every reach of one continuous stream course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LevelPath(pub i64);

impl fmt::Display for LevelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Segmentation point on the network where windowed metrics are reported.
#[derive(Debug, Clone, PartialEq)]
pub struct Igo {
    pub fid: Fid,
    pub level_path: LevelPath,
    /// Distance along the level path.
    pub seg_distance: f64,
    /// Stream-size class used to look up the window length.
    pub stream_size: Option<i64>,
    pub point: Option<Point<f64>>,
}

/// Valley-bottom polygon slice for a short stretch of one level path.
#[derive(Debug, Clone, PartialEq)]
pub struct Dgo {
    pub fid: Fid,
    pub level_path: LevelPath,
    pub seg_distance: f64,
    pub centerline_length: f64,
    pub segment_area: f64,
    pub geometry: MultiPolygon<f64>,
}

fn point_of(geometry: &Option<Geometry<f64>>) -> Option<Point<f64>> {
    match geometry.as_ref()? {
        Geometry::Point(point) => Some(*point),
        Geometry::MultiPoint(points) => points.0.first().copied(),
        _ => None,
    }
}

/// Level path and distance, the two keys every network record needs.
fn keys(feature: &Feature, level_path: &str, seg_distance: &str, layer: &str) -> Option<(LevelPath, f64)> {
    let Some(lp) = feature.get_i64(level_path) else {
        warn!(layer, fid = feature.fid, field = level_path, "skipping feature without level path");
        return None;
    };
    let Some(distance) = feature.get_f64(seg_distance) else {
        warn!(layer, fid = feature.fid, field = seg_distance, "skipping feature without distance");
        return None;
    };
    Some((LevelPath(lp), distance))
}

/// Extract segmentation points. Features missing a level path or distance are skipped.
pub fn read_igos(layer: &FeatureLayer, fields: &IgoFields) -> Vec<Igo> {
    layer.features().iter()
        .filter_map(|feature| {
            let (level_path, seg_distance) = keys(feature, &fields.level_path, &fields.seg_distance, layer.name())?;
            Some(Igo {
                fid: feature.fid,
                level_path,
                seg_distance,
                stream_size: feature.get_i64(&fields.stream_size),
                point: point_of(&feature.geometry),
            })
        })
        .collect()
}

/// Extract DGOs. Missing lengths and areas count as zero; a DGO without
/// polygon geometry keeps its attributes and contributes no area.
pub fn read_dgos(layer: &FeatureLayer, fields: &DgoFields) -> Vec<Dgo> {
    layer.features().iter()
        .filter_map(|feature| {
            let (level_path, seg_distance) = keys(feature, &fields.level_path, &fields.seg_distance, layer.name())?;
            let geometry = feature.geometry.as_ref()
                .map(geoprim::flatten_polygons)
                .map(MultiPolygon::new)
                .unwrap_or_else(|| {
                    warn!(layer = layer.name(), fid = feature.fid, "DGO has no geometry");
                    MultiPolygon::new(vec![])
                });
            Some(Dgo {
                fid: feature.fid,
                level_path,
                seg_distance,
                centerline_length: feature.get_f64(&fields.centerline_length).unwrap_or(0.0),
                segment_area: feature.get_f64(&fields.segment_area).unwrap_or(0.0),
                geometry,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPoint};

    use super::*;

    #[test]
    fn igos_skip_incomplete_records() {
        let layer = FeatureLayer::new("igos", None, vec![
            Feature::new(1, Some(Point::new(0.0, 0.0).into()))
                .with("level_path", 100i64).with("seg_distance", 50.0).with("stream_size", 2i64),
            Feature::new(2, Some(MultiPoint::from(vec![(1.0, 1.0)]).into()))
                .with("level_path", 100i64).with("seg_distance", 60.0),
            Feature::new(3, None).with("seg_distance", 70.0),
        ]);
        let igos = read_igos(&layer, &IgoFields::default());
        assert_eq!(igos.len(), 2);
        assert_eq!(igos[0].stream_size, Some(2));
        assert_eq!(igos[1].stream_size, None);
        assert_eq!(igos[1].point, Some(Point::new(1.0, 1.0)));
        assert_eq!(igos[0].level_path.to_string(), "100");
    }

    #[test]
    fn dgos_default_missing_measures() {
        let layer = FeatureLayer::new("dgos", None, vec![
            Feature::new(1, Some(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0)].into()))
                .with("level_path", 100i64).with("seg_distance", 0.0).with("segment_area", 0.5),
            Feature::new(2, None)
                .with("level_path", 100i64).with("seg_distance", 50.0).with("centerline_length", 50.0),
        ]);
        let dgos = read_dgos(&layer, &DgoFields::default());
        assert_eq!(dgos[0].centerline_length, 0.0);
        assert_eq!(dgos[0].geometry.0.len(), 1);
        assert!(dgos[1].geometry.0.is_empty());
        assert_eq!(dgos[1].centerline_length, 50.0);
    }
}
