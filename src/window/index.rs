use ahash::AHashMap;
use geo::{BoundingRect, Intersects, MultiPolygon, Point};
use rstar::RTree;

use crate::{geom::{envelope, BoundingBox}, network::{Dgo, LevelPath}};

/// DGOs indexed by level path (sorted by distance) and by envelope.
#[derive(Debug, Clone)]
pub struct DgoIndex {
    dgos: Vec<Dgo>,
    by_level_path: AHashMap<LevelPath, Vec<usize>>,
    rtree: RTree<BoundingBox>,
}

impl DgoIndex {
    pub fn new(dgos: Vec<Dgo>) -> Self {
        let mut by_level_path: AHashMap<LevelPath, Vec<usize>> = AHashMap::new();
        for (i, dgo) in dgos.iter().enumerate() {
            by_level_path.entry(dgo.level_path).or_default().push(i);
        }
        for members in by_level_path.values_mut() {
            members.sort_by(|&a, &b| dgos[a].seg_distance.total_cmp(&dgos[b].seg_distance)
                .then(dgos[a].fid.cmp(&dgos[b].fid)));
        }

        let rtree = RTree::bulk_load(dgos.iter().enumerate()
            .filter_map(|(i, dgo)| dgo.geometry.bounding_rect().map(|rect| BoundingBox::new(i, rect)))
            .collect());

        Self { dgos, by_level_path, rtree }
    }

    #[inline] pub fn len(&self) -> usize { self.dgos.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.dgos.is_empty() }

    #[inline] pub fn get(&self, idx: usize) -> &Dgo { &self.dgos[idx] }

    /// DGOs of one level path in ascending distance order.
    pub fn level_path(&self, level_path: LevelPath) -> impl Iterator<Item = &Dgo> + '_ {
        self.by_level_path.get(&level_path).into_iter().flatten().map(|&i| &self.dgos[i])
    }

    /// DGOs of one level path with `min <= seg_distance <= max`.
    pub fn in_range(&self, level_path: LevelPath, min: f64, max: f64) -> &[usize] {
        let Some(sorted) = self.by_level_path.get(&level_path) else { return &[] };
        let start = sorted.partition_point(|&i| self.dgos[i].seg_distance < min);
        let end = sorted.partition_point(|&i| self.dgos[i].seg_distance <= max).max(start);
        &sorted[start..end]
    }

    /// Gap between the two smallest distances on a level path.
    pub fn first_spacing(&self, level_path: LevelPath) -> Option<f64> {
        let mut dgos = self.level_path(level_path);
        let first = dgos.next()?.seg_distance;
        Some(dgos.next()?.seg_distance - first)
    }

    /// DGOs of one level path whose polygon intersects `shape`, in index order.
    pub fn intersecting(&self, level_path: LevelPath, shape: &MultiPolygon<f64>) -> Vec<usize> {
        let Some(rect) = shape.bounding_rect() else { return vec![] };
        let mut hits: Vec<usize> = self.rtree.locate_in_envelope_intersecting(&envelope(&rect))
            .map(BoundingBox::idx)
            .filter(|&i| self.dgos[i].level_path == level_path && self.dgos[i].geometry.intersects(shape))
            .collect();
        hits.sort_unstable();
        hits
    }

    /// DGOs of one level path whose polygon touches or contains `point`, in index order.
    pub fn at_point(&self, level_path: LevelPath, point: Point<f64>) -> Vec<usize> {
        let mut hits: Vec<usize> = self.rtree.locate_in_envelope_intersecting(&envelope(&point.bounding_rect()))
            .map(BoundingBox::idx)
            .filter(|&i| self.dgos[i].level_path == level_path && self.dgos[i].geometry.intersects(&point))
            .collect();
        hits.sort_unstable();
        hits
    }
}
