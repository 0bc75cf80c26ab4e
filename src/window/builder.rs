use ahash::AHashSet;
use geoprim::RepairOutcome;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{network::{Dgo, Igo}, vector::Fid};
use super::{DgoIndex, DistanceFilter, Window, WindowLengths, WindowStrategy};

/// Per-IGO failures while building a window. The run loop logs and skips these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WindowError {
    #[error("IGO {igo}: no window length configured for stream size {stream_size:?}")]
    UnknownStreamSize { igo: Fid, stream_size: Option<i64> },
    #[error("IGO {igo}: negative distance {seg_distance}")]
    NegativeDistance { igo: Fid, seg_distance: f64 },
}

/// Builds the window polygon and DGO totals for an IGO.
#[derive(Debug, Clone)]
pub struct WindowBuilder<'a> {
    index: &'a DgoIndex,
    lengths: &'a WindowLengths,
    strategy: WindowStrategy,
    filter: DistanceFilter,
    widen_sparse: bool,
}

impl<'a> WindowBuilder<'a> {
    pub fn new(index: &'a DgoIndex, lengths: &'a WindowLengths) -> Self {
        Self {
            index,
            lengths,
            strategy: WindowStrategy::default(),
            filter: DistanceFilter::default(),
            widen_sparse: false,
        }
    }

    pub fn with_strategy(mut self, strategy: WindowStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_distance_filter(mut self, filter: DistanceFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Build distance-range windows through [`WindowBuilder::member_ids`],
    /// doubling the window length on sparsely segmented level paths.
    pub fn widen_sparse(mut self, widen: bool) -> Self {
        self.widen_sparse = widen;
        self
    }

    #[inline] pub fn strategy(&self) -> WindowStrategy { self.strategy }

    /// Nominal window length for an IGO's stream size.
    pub fn window_length(&self, igo: &Igo) -> Result<f64, WindowError> {
        igo.stream_size
            .and_then(|class| self.lengths.get(class))
            .ok_or(WindowError::UnknownStreamSize { igo: igo.fid, stream_size: igo.stream_size })
    }

    fn check_distance(igo: &Igo) -> Result<(), WindowError> {
        if igo.seg_distance < 0.0 {
            return Err(WindowError::NegativeDistance { igo: igo.fid, seg_distance: igo.seg_distance });
        }
        Ok(())
    }

    /// Build the window for `igo` with the configured strategy.
    pub fn build(&self, igo: &Igo) -> Result<Window, WindowError> {
        match self.strategy {
            WindowStrategy::ByDistanceRange if self.widen_sparse => {
                let (length, members) = self.widened_members(igo)?;
                Ok(self.assemble(igo, length, members))
            }
            WindowStrategy::ByDistanceRange => {
                let length = self.window_length(igo)?;
                self.build_by_distance(igo, length)
            }
            WindowStrategy::ByDgoIntersection => self.build_by_intersection(igo),
        }
    }

    /// Window of every same-level-path DGO whose distance lies within
    /// `length / 2` of the IGO distance (bounds per the distance filter).
    pub fn build_by_distance(&self, igo: &Igo, length: f64) -> Result<Window, WindowError> {
        Self::check_distance(igo)?;
        let members = self.range_members(igo, length);
        Ok(self.assemble(igo, length, members))
    }

    fn range_members(&self, igo: &Igo, length: f64) -> Vec<usize> {
        let (min, max) = self.filter.bounds(igo.seg_distance, length);
        self.index.in_range(igo.level_path, min, max).to_vec()
    }

    /// Distance-range membership as DGO ids.
    ///
    /// When the gap between the first two DGOs of the level path is wider
    /// than half the window, the window length is doubled so that sparse
    /// segmentations still yield more than a single DGO.
    pub fn member_ids(&self, igo: &Igo) -> Result<Vec<Fid>, WindowError> {
        let (_, members) = self.widened_members(igo)?;
        Ok(members.into_iter().map(|i| self.index.get(i).fid).collect())
    }

    fn widened_members(&self, igo: &Igo) -> Result<(f64, Vec<usize>), WindowError> {
        Self::check_distance(igo)?;
        let mut length = self.window_length(igo)?;
        if self.index.first_spacing(igo.level_path).is_some_and(|spacing| spacing > 0.5 * length) {
            debug!(igo = igo.fid, level_path = %igo.level_path, length, "widening window on sparse level path");
            length *= 2.0;
        }
        Ok((length, self.range_members(igo, length)))
    }

    /// Window grown outward through intersecting DGOs, starting at the DGO
    /// under the IGO point.
    ///
    /// The seed is the same-level-path DGO touching the point whose distance
    /// is closest to the IGO's (then the lowest id). Each round adds every
    /// DGO touching the current window until the accumulated centerline
    /// length reaches the window length or nothing new touches it.
    pub fn build_by_intersection(&self, igo: &Igo) -> Result<Window, WindowError> {
        let length = self.window_length(igo)?;
        let Some(point) = igo.point else {
            warn!(igo = igo.fid, "IGO has no point geometry; window is empty");
            return Ok(Window::empty(igo.fid, igo.level_path, length));
        };

        let seed = self.index.at_point(igo.level_path, point).into_iter()
            .min_by(|&a, &b| {
                let (da, db) = (self.index.get(a), self.index.get(b));
                (da.seg_distance - igo.seg_distance).abs()
                    .total_cmp(&(db.seg_distance - igo.seg_distance).abs())
                    .then(da.fid.cmp(&db.fid))
            });
        let Some(seed) = seed else {
            warn!(igo = igo.fid, level_path = %igo.level_path, "no DGO under IGO; window is empty");
            return Ok(Window::empty(igo.fid, igo.level_path, length));
        };

        let mut members = vec![seed];
        let mut seen: AHashSet<usize> = AHashSet::from_iter([seed]);
        let mut total = self.index.get(seed).centerline_length;
        let mut shape = self.index.get(seed).geometry.clone();

        while total < length {
            let ring: Vec<usize> = self.index.intersecting(igo.level_path, &shape).into_iter()
                .filter(|i| seen.insert(*i))
                .collect();
            if ring.is_empty() {
                break;
            }
            total += ring.iter().map(|&i| self.index.get(i).centerline_length).sum::<f64>();
            members.extend(ring);
            shape = geoprim::union_all(members.iter().flat_map(|&i| self.index.get(i).geometry.0.iter().cloned()));
        }

        members.sort_by(|&a, &b| self.index.get(a).seg_distance.total_cmp(&self.index.get(b).seg_distance));
        Ok(self.assemble(igo, length, members))
    }

    /// Union member polygons and sum their totals.
    fn assemble(&self, igo: &Igo, length: f64, members: Vec<usize>) -> Window {
        if members.is_empty() {
            debug!(igo = igo.fid, level_path = %igo.level_path, "no DGOs in window");
            return Window::empty(igo.fid, igo.level_path, length);
        }

        let dgos: Vec<&Dgo> = members.iter().map(|&i| self.index.get(i)).collect();
        let union = geoprim::union_all(dgos.iter().flat_map(|dgo| dgo.geometry.0.iter().cloned()));
        let (polygon, outcome) = geoprim::repair(union);
        match outcome {
            RepairOutcome::AlreadyValid => {}
            RepairOutcome::Repaired => debug!(igo = igo.fid, "repaired window polygon"),
            RepairOutcome::Failed => warn!(igo = igo.fid, "window polygon is invalid and could not be repaired"),
        }

        Window {
            igo: igo.fid,
            level_path: igo.level_path,
            length,
            polygon,
            centerline_length: dgos.iter().map(|dgo| dgo.centerline_length).sum(),
            segment_area: dgos.iter().map(|dgo| dgo.segment_area).sum(),
            members: dgos.iter().map(|dgo| dgo.fid).collect(),
        }
    }
}
