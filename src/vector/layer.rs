use ahash::AHashMap;
use geo::{BoundingRect, Coord, Intersects, MultiPolygon, Rect};
use rstar::RTree;

use crate::geom::{envelope, BoundingBox};
use super::{AttributeFilter, Feature, Fid};

/// Position of a feature within one iteration pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    /// 1-based position among the candidates of this pass.
    pub current: usize,
    /// Number of candidates considered by this pass.
    pub total: usize,
}

impl Progress {
    /// Completed fraction in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 { 1.0 } else { self.current as f64 / self.total as f64 }
    }
}

/// An in-memory vector layer with a spatial index over feature envelopes.
#[derive(Debug, Clone)]
pub struct FeatureLayer {
    name: String,
    epsg: Option<u32>, // EPSG code, if known
    features: Vec<Feature>,
    index: AHashMap<Fid, usize>,
    rtree: RTree<BoundingBox>,
}

impl FeatureLayer {
    /// Construct a layer, indexing every feature that carries a non-empty geometry.
    pub fn new(name: &str, epsg: Option<u32>, features: Vec<Feature>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                features.iter().enumerate()
                    .filter_map(|(i, feature)| feature.geometry.as_ref()
                        .and_then(|geom| geom.bounding_rect())
                        .map(|rect| BoundingBox::new(i, rect)))
                    .collect()
            ),
            index: features.iter().enumerate()
                .map(|(i, feature)| (feature.fid, i))
                .collect(),
            name: name.to_string(),
            epsg,
            features,
        }
    }

    #[inline] pub fn name(&self) -> &str { &self.name }

    #[inline] pub fn epsg(&self) -> Option<u32> { self.epsg }

    #[inline] pub fn len(&self) -> usize { self.features.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.features.is_empty() }

    #[inline] pub fn features(&self) -> &[Feature] { &self.features }

    /// Look up a feature by its identifier.
    #[inline]
    pub fn feature(&self, fid: Fid) -> Option<&Feature> {
        self.index.get(&fid).map(|&i| &self.features[i])
    }

    pub(crate) fn feature_mut(&mut self, fid: Fid) -> Option<&mut Feature> {
        self.index.get(&fid).copied().map(move |i| &mut self.features[i])
    }

    /// Attributes may change through this; geometries must not, or the index goes stale.
    pub(crate) fn features_mut(&mut self) -> &mut [Feature] {
        &mut self.features
    }

    /// Bounding rectangle of every geometry in the layer.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.features.iter()
            .filter_map(|feature| feature.geometry.as_ref().and_then(|geom| geom.bounding_rect()))
            .reduce(|a, b| Rect::new(
                Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            ))
    }

    /// Iterate features matching an optional attribute filter and intersecting
    /// an optional clip shape, in layer order.
    ///
    /// With a clip shape only indexed features are candidates, so features
    /// without geometry are skipped; without one every feature is a candidate.
    pub fn iterate_features<'a>(
        &'a self,
        filter: Option<&'a AttributeFilter>,
        clip: Option<&'a MultiPolygon<f64>>,
    ) -> impl Iterator<Item = (&'a Feature, Progress)> + 'a {
        let candidates: Vec<usize> = match clip.and_then(|shape| shape.bounding_rect()) {
            Some(rect) => {
                let mut hits = self.rtree.locate_in_envelope_intersecting(&envelope(&rect))
                    .map(BoundingBox::idx)
                    .collect::<Vec<_>>();
                hits.sort_unstable();
                hits
            }
            None if clip.is_some() => Vec::new(), // empty clip shape
            None => (0..self.features.len()).collect(),
        };

        let total = candidates.len();
        candidates.into_iter().enumerate()
            .map(move |(i, idx)| (&self.features[idx], Progress { current: i + 1, total }))
            .filter(move |(feature, _)| filter.is_none_or(|f| f.matches(feature)))
            .filter(move |(feature, _)| match (clip, &feature.geometry) {
                (None, _) => true,
                (Some(shape), Some(geom)) => geom.intersects(shape),
                (Some(_), None) => false,
            })
    }
}

#[cfg(test)]
mod tests {
    use geo::{line_string, polygon, Geometry, Point};

    use super::*;

    fn layer() -> FeatureLayer {
        FeatureLayer::new("roads", None, vec![
            Feature::new(10, Some(Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)])))
                .with("kind", "paved"),
            Feature::new(11, Some(Geometry::LineString(line_string![(x: 0.0, y: 50.0), (x: 10.0, y: 50.0)])))
                .with("kind", "dirt"),
            Feature::new(12, Some(Geometry::Point(Point::new(5.0, 1.0))))
                .with("kind", "paved"),
            Feature::new(13, None).with("kind", "paved"),
        ])
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0)]])
    }

    #[test]
    fn unfiltered_iteration_yields_everything_in_order() {
        let layer = layer();
        let fids: Vec<_> = layer.iterate_features(None, None).map(|(f, _)| f.fid).collect();
        assert_eq!(fids, vec![10, 11, 12, 13]);
    }

    #[test]
    fn clip_shape_restricts_to_intersecting_geometries() {
        let layer = layer();
        let clip = square(-1.0, -1.0, 6.0, 2.0);
        let fids: Vec<_> = layer.iterate_features(None, Some(&clip)).map(|(f, _)| f.fid).collect();
        assert_eq!(fids, vec![10, 12]);
    }

    #[test]
    fn filter_and_clip_combine() {
        let layer = layer();
        let clip = square(-1.0, -1.0, 6.0, 60.0);
        let filter = AttributeFilter::eq("kind", "dirt");
        let fids: Vec<_> = layer.iterate_features(Some(&filter), Some(&clip)).map(|(f, _)| f.fid).collect();
        assert_eq!(fids, vec![11]);
    }

    #[test]
    fn progress_counts_candidates() {
        let layer = layer();
        let last = layer.iterate_features(None, None).last().map(|(_, p)| p).unwrap();
        assert_eq!(last, Progress { current: 4, total: 4 });
        assert_eq!(last.fraction(), 1.0);
    }

    #[test]
    fn lookup_and_bounds() {
        let layer = layer();
        assert_eq!(layer.feature(12).map(|f| f.fid), Some(12));
        assert!(layer.feature(99).is_none());
        let bounds = layer.bounds().unwrap();
        assert_eq!(bounds.max().y, 50.0);
    }
}
