use anyhow::{ensure, Result};
use geo::{Coord, Rect};

/// North-up affine transform from grid cells to map coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Cell size in X direction
    pub pixel_width: f64,
    /// Cell size in Y direction, negative for north-up grids
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self { origin_x, origin_y, pixel_width, pixel_height }
    }

    /// Create from a GDAL-style array `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
    /// Rotated grids are rejected.
    pub fn from_gdal(coeffs: [f64; 6]) -> Result<Self> {
        ensure!(coeffs[2] == 0.0 && coeffs[4] == 0.0, "Rotated geotransforms are not supported: {coeffs:?}");
        ensure!(coeffs[1] != 0.0 && coeffs[5] != 0.0, "Degenerate geotransform: {coeffs:?}");
        Ok(Self::new(coeffs[0], coeffs[3], coeffs[1], coeffs[5]))
    }

    /// Map coordinates of the center of cell (`row`, `col`).
    #[inline]
    pub fn cell_center(&self, row: usize, col: usize) -> Coord<f64> {
        Coord {
            x: self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            y: self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        }
    }

    /// Fractional (row, col) position of a map coordinate.
    #[inline]
    pub fn to_pixel(&self, coord: Coord<f64>) -> (f64, f64) {
        ((coord.y - self.origin_y) / self.pixel_height, (coord.x - self.origin_x) / self.pixel_width)
    }

    /// Half-open row and column ranges of cells overlapping `rect`, clamped to a `rows` x `cols` grid.
    pub fn window(&self, rect: &Rect<f64>, rows: usize, cols: usize) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
        let (r0, c0) = self.to_pixel(rect.min());
        let (r1, c1) = self.to_pixel(rect.max());
        let clamp = |lo: f64, hi: f64, n: usize| {
            let start = lo.min(hi).floor().max(0.0).min(n as f64) as usize;
            let end = lo.max(hi).ceil().max(0.0).min(n as f64) as usize;
            start..end
        };
        (clamp(r0, r1, rows), clamp(c0, c1, cols))
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use geo::coord;

    use super::*;

    #[test]
    fn center_and_pixel_agree() {
        let gt = GeoTransform::new(100.0, 200.0, 10.0, -10.0);
        let center = gt.cell_center(10, 5);
        assert_eq!(center, coord! { x: 155.0, y: 95.0 });
        assert_eq!(gt.to_pixel(center), (10.5, 5.5));
    }

    #[test]
    fn window_is_clamped() {
        let gt = GeoTransform::new(0.0, 10.0, 1.0, -1.0);
        let rect = Rect::new(coord! { x: -5.0, y: 8.5 }, coord! { x: 2.5, y: 20.0 });
        let (rows, cols) = gt.window(&rect, 10, 10);
        assert_eq!(rows, 0..2);
        assert_eq!(cols, 0..3);
    }

    #[test]
    fn rotated_gdal_transform_is_rejected() {
        assert!(GeoTransform::from_gdal([0.0, 1.0, 0.1, 0.0, 0.0, -1.0]).is_err());
        assert_eq!(
            GeoTransform::from_gdal([5.0, 2.0, 0.0, 9.0, 0.0, -2.0]).unwrap(),
            GeoTransform::new(5.0, 9.0, 2.0, -2.0),
        );
    }
}
