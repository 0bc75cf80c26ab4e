use std::{fmt, hash::Hash, sync::Arc};

use ahash::AHashMap;
use anyhow::{anyhow, Context, Result};
use geo::{Area, Coord, Euclidean, Length, MapCoords, MultiLineString, MultiPolygon};
use proj4rs::{proj::Proj as Proj4, transform::transform};

/// Geographic (lon/lat) CRS codes that need projecting before measuring.
const GEOGRAPHIC_EPSG: &[u32] = &[4258, 4267, 4269, 4326, 4617, 4937, 4979];

/// Build PROJ.4 string for a geographic source CRS (degrees → radians handled in code).
#[inline]
fn source_geog_proj4(epsg: u32) -> &'static str {
    match epsg {
        4269 | 4937 | 4617 => "+proj=longlat +datum=NAD83 +no_defs +type=crs",
        4267 => "+proj=longlat +datum=NAD27 +no_defs +type=crs",
        _ => "+proj=longlat +datum=WGS84 +no_defs +type=crs",
    }
}

/// UTM zone number for a longitude in degrees.
#[inline]
pub fn utm_zone(lon: f64) -> u32 {
    (((lon + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u32
}

/// Build PROJ.4 string for the target UTM CRS, chosen from a lon/lat center and source datum.
/// NAD83 UTM is only standard in the north; the south falls back to WGS84.
fn utm_proj4(epsg: u32, center: Coord<f64>) -> String {
    let zone = utm_zone(center.x);
    let north = center.y >= 0.0;
    let is_nad83 = matches!(epsg, 4269 | 4937 | 4617);

    let datum = if is_nad83 && north { "NAD83" } else { "WGS84" };
    let south = if north { "" } else { " +south" };

    format!("+proj=utm +zone={zone}{south} +datum={datum} +units=m +no_defs +type=crs")
}

/// Maps coordinates of one dataset into a metric CRS so that lengths and
/// areas come out in metres.
///
/// Projected inputs are assumed to be metric already and pass through
/// untouched. Geographic inputs are sent to the UTM zone of a supplied
/// center point, normally the center of the level path being measured.
pub enum MetricTransform {
    Identity,
    Utm { from: Proj4, to: Proj4, zone: u32 },
}

impl fmt::Debug for MetricTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricTransform::Identity => write!(f, "MetricTransform::Identity"),
            MetricTransform::Utm { zone, .. } => write!(f, "MetricTransform::Utm(zone {zone})"),
        }
    }
}

impl MetricTransform {
    /// Whether the EPSG code names a lon/lat CRS.
    #[inline]
    pub fn is_geographic(epsg: Option<u32>) -> bool {
        epsg.is_some_and(|code| GEOGRAPHIC_EPSG.contains(&code))
    }

    /// Choose a transform for data in `epsg` located around `center` (in the data CRS).
    pub fn from_epsg(epsg: Option<u32>, center: Coord<f64>) -> Result<Self> {
        let Some(code) = epsg.filter(|_| Self::is_geographic(epsg)) else {
            return Ok(MetricTransform::Identity);
        };

        let from = {
            let proj_string = source_geog_proj4(code);
            Proj4::from_proj_string(proj_string)
                .with_context(|| anyhow!("failed to build source PROJ.4: {proj_string}"))?
        };

        let to = {
            let proj_string = utm_proj4(code, center);
            Proj4::from_proj_string(&proj_string)
                .with_context(|| anyhow!("failed to build target PROJ.4: {proj_string}"))?
        };

        Ok(MetricTransform::Utm { from, to, zone: utm_zone(center.x) })
    }

    #[inline] pub fn is_identity(&self) -> bool { matches!(self, MetricTransform::Identity) }

    /// Reproject a geometry into the metric CRS.
    pub fn project<G>(&self, geom: &G) -> Result<G>
    where
        G: MapCoords<f64, f64, Output = G>,
    {
        match self {
            MetricTransform::Identity => Ok(geom.map_coords(|coord| coord)),
            MetricTransform::Utm { from, to, .. } => geom
                .try_map_coords(|coord: Coord<f64>| {
                    let mut point = (coord.x.to_radians(), coord.y.to_radians(), 0.0);
                    transform(from, to, &mut point)?;
                    Ok::<_, proj4rs::errors::Error>(Coord { x: point.0, y: point.1 })
                })
                .context("CRS transform failed"),
        }
    }

    /// Reproject a single coordinate into the metric CRS.
    pub fn project_coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        Ok(self.project(&geo::Point::from(coord))?.0)
    }

    /// Length of a (multi)line in metres.
    pub fn length(&self, lines: &MultiLineString<f64>) -> Result<f64> {
        Ok(Euclidean.length(&self.project(lines)?))
    }

    /// Area of a (multi)polygon in square metres.
    pub fn area(&self, shape: &MultiPolygon<f64>) -> Result<f64> {
        Ok(self.project(shape)?.unsigned_area())
    }
}

/// Lazily builds one [`MetricTransform`] per key (typically a level path)
/// and hands out shared references on later requests.
#[derive(Debug)]
pub struct TransformCache<K> {
    epsg: Option<u32>,
    transforms: AHashMap<K, Arc<MetricTransform>>,
}

impl<K: Hash + Eq + Clone> TransformCache<K> {
    pub fn new(epsg: Option<u32>) -> Self {
        Self { epsg, transforms: AHashMap::new() }
    }

    #[inline] pub fn epsg(&self) -> Option<u32> { self.epsg }

    /// Number of transforms built so far.
    #[inline] pub fn len(&self) -> usize { self.transforms.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.transforms.is_empty() }

    /// Fetch the transform for `key`, building it from `center` on first use.
    /// `center` is only evaluated when the transform does not exist yet.
    pub fn get_or_build(&mut self, key: &K, center: impl FnOnce() -> Coord<f64>) -> Result<Arc<MetricTransform>> {
        if let Some(existing) = self.transforms.get(key) {
            return Ok(Arc::clone(existing));
        }
        let built = Arc::new(MetricTransform::from_epsg(self.epsg, center())?);
        self.transforms.insert(key.clone(), Arc::clone(&built));
        Ok(built)
    }
}
