use anyhow::{ensure, Result};
use geo::{BoundingRect, Coord, Intersects, MultiPolygon, Point};
use ndarray::Array2;

use super::{CellStats, GeoTransform};

/// Masked sampling of a raster under a polygon.
pub trait RasterSampler {
    /// Summarize the valid cells whose centers fall inside `shape`.
    /// Nodata and NaN cells are skipped; an empty result is not an error.
    fn mask(&self, shape: &MultiPolygon<f64>) -> CellStats;
}

/// A single-band, north-up grid held in memory.
#[derive(Debug, Clone)]
pub struct Raster {
    /// Cell values in row-major order (row, col)
    data: Array2<f64>,
    transform: GeoTransform,
    epsg: Option<u32>,
    nodata: Option<f64>,
}

impl Raster {
    pub fn new(data: Array2<f64>, transform: GeoTransform, nodata: Option<f64>) -> Self {
        Self { data, transform, epsg: None, nodata }
    }

    /// Create a raster from row-major values.
    pub fn from_vec(values: Vec<f64>, rows: usize, cols: usize, transform: GeoTransform, nodata: Option<f64>) -> Result<Self> {
        ensure!(values.len() == rows * cols, "Raster has {} values, expected {rows} x {cols}", values.len());
        Ok(Self::new(Array2::from_shape_vec((rows, cols), values)?, transform, nodata))
    }

    /// Tag the raster with the EPSG code of its CRS.
    pub fn with_epsg(mut self, epsg: Option<u32>) -> Self {
        self.epsg = epsg;
        self
    }

    #[inline] pub fn rows(&self) -> usize { self.data.nrows() }

    #[inline] pub fn cols(&self) -> usize { self.data.ncols() }

    #[inline] pub fn transform(&self) -> &GeoTransform { &self.transform }

    #[inline] pub fn epsg(&self) -> Option<u32> { self.epsg }

    #[inline] pub fn nodata(&self) -> Option<f64> { self.nodata }

    #[inline]
    fn is_valid(&self, value: f64) -> bool {
        !value.is_nan() && self.nodata.is_none_or(|nodata| value != nodata)
    }

    /// Value of the cell containing `coord`, if inside the grid and not nodata.
    pub fn value_at(&self, coord: Coord<f64>) -> Option<f64> {
        let (row, col) = self.transform.to_pixel(coord);
        if row < 0.0 || col < 0.0 {
            return None;
        }
        self.data.get((row.floor() as usize, col.floor() as usize))
            .copied()
            .filter(|&value| self.is_valid(value))
    }
}

impl RasterSampler for Raster {
    fn mask(&self, shape: &MultiPolygon<f64>) -> CellStats {
        let Some(rect) = shape.bounding_rect() else { return CellStats::default() };
        let (rows, cols) = self.transform.window(&rect, self.rows(), self.cols());

        let mut stats = CellStats::default();
        for row in rows {
            for col in cols.clone() {
                let value = self.data[(row, col)];
                if self.is_valid(value) && shape.intersects(&Point::from(self.transform.cell_center(row, col))) {
                    stats.push(value);
                }
            }
        }
        stats
    }
}
