use std::sync::OnceLock;

use anyhow::Result;
use geo::{Coord, MultiLineString, MultiPolygon};
use smallvec::SmallVec;

use crate::{geom::MetricTransform, raster::RasterSampler};

/// Segments per quarter circle when buffering endpoints for elevation sampling.
const BUFFER_QUAD_SEGS: usize = 8;

/// Raster and buffer radius used to sample endpoint elevations.
#[derive(Clone, Copy)]
pub struct ElevationSource<'a> {
    pub raster: &'a dyn RasterSampler,
    /// Buffer radius around each endpoint, in raster CRS units.
    pub buffer: f64,
}

/// Lowest and highest endpoint elevation of a line.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Elevations {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Elevations {
    /// Elevation drop per unit length. `None` when either elevation is
    /// missing or the length is not positive.
    pub fn gradient_over(&self, length: f64) -> Option<f64> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if length > 0.0 => Some((max - min) / length),
            _ => None,
        }
    }
}

/// The part of a network line that falls inside one window.
///
/// Length, endpoints and elevations are computed on first use and kept for
/// the lifetime of the value.
pub struct AnalysisLine<'a> {
    line: MultiLineString<f64>,
    transform: &'a MetricTransform,
    dem: Option<ElevationSource<'a>>,
    length: OnceLock<f64>,
    endpoints: OnceLock<SmallVec<[Coord<f64>; 2]>>,
    elevations: OnceLock<Elevations>,
}

impl<'a> AnalysisLine<'a> {
    /// Clip a full level-path line to `window` (see [`geoprim::clip_line`]).
    pub fn clip(
        line: &MultiLineString<f64>,
        window: &MultiPolygon<f64>,
        precision: u32,
        transform: &'a MetricTransform,
        dem: Option<ElevationSource<'a>>,
    ) -> Self {
        Self::new(geoprim::clip_line(window, line, precision), transform, dem)
    }

    /// Wrap an already clipped line.
    pub fn new(line: MultiLineString<f64>, transform: &'a MetricTransform, dem: Option<ElevationSource<'a>>) -> Self {
        Self {
            line,
            transform,
            dem,
            length: OnceLock::new(),
            endpoints: OnceLock::new(),
            elevations: OnceLock::new(),
        }
    }

    #[inline] pub fn geometry(&self) -> &MultiLineString<f64> { &self.line }

    #[inline] pub fn is_empty(&self) -> bool { self.line.0.iter().all(|part| part.0.len() < 2) }

    /// Length in metres after projecting with the level path's transform.
    pub fn length(&self) -> Result<f64> {
        if let Some(&length) = self.length.get() {
            return Ok(length);
        }
        let length = self.transform.length(&self.line)?;
        Ok(*self.length.get_or_init(|| length))
    }

    /// Degree-1 coordinates of the clipped line, in line order.
    pub fn endpoints(&self) -> &[Coord<f64>] {
        self.endpoints.get_or_init(|| geoprim::endpoints(&self.line).into_iter().collect())
    }

    /// Minimum raster value under a buffer around each endpoint.
    ///
    /// A pair of endpoints is sorted ascending; if one of the pair has no
    /// sample the maximum is left unset. Any other endpoint count falls back
    /// to the extremes of whatever samples exist.
    pub fn elevations(&self) -> Elevations {
        *self.elevations.get_or_init(|| {
            let Some(dem) = self.dem else { return Elevations::default() };
            let samples: SmallVec<[Option<f64>; 2]> = self.endpoints().iter()
                .map(|&end| {
                    let buffer = MultiPolygon::new(vec![geoprim::buffer_point(end, dem.buffer, BUFFER_QUAD_SEGS)]);
                    dem.raster.mask(&buffer).min
                })
                .collect();

            match samples.as_slice() {
                [Some(a), Some(b)] => Elevations { min: Some(a.min(*b)), max: Some(a.max(*b)) },
                [a, b] => Elevations { min: a.or(*b), max: None },
                _ => {
                    let known = samples.iter().flatten().copied();
                    Elevations {
                        min: known.clone().reduce(f64::min),
                        max: known.reduce(f64::max),
                    }
                }
            }
        })
    }

    /// Elevation drop over clipped length.
    pub fn gradient(&self) -> Result<Option<f64>> {
        Ok(self.elevations().gradient_over(self.length()?))
    }

    /// Metric coordinates of the first and last endpoint, if there are at least two.
    fn metric_ends(&self) -> Result<Option<(Coord<f64>, Coord<f64>)>> {
        let ends = self.endpoints();
        if ends.len() < 2 {
            return Ok(None);
        }
        let first = self.transform.project_coord(ends[0])?;
        let last = self.transform.project_coord(ends[ends.len() - 1])?;
        Ok(Some((first, last)))
    }

    /// Clipped length over straight-line endpoint distance. Requires exactly
    /// two distinct endpoints.
    pub fn sinuosity(&self) -> Result<Option<f64>> {
        if self.endpoints().len() != 2 {
            return Ok(None);
        }
        let Some((first, last)) = self.metric_ends()? else { return Ok(None) };
        let distance = geoprim::distance(first, last);
        if distance <= 0.0 {
            return Ok(None);
        }
        Ok(Some(self.length()? / distance))
    }

    /// Compass bearing in degrees `[0, 360)` from the first to the last endpoint.
    pub fn azimuth(&self) -> Result<Option<f64>> {
        Ok(self.metric_ends()?
            .filter(|(first, last)| first != last)
            .map(|(first, last)| geoprim::azimuth(first, last)))
    }
}
