use geo::{Coord, LineString, MapCoords};

/// Round a coordinate onto a grid of `decimals` decimal places.
#[inline]
pub fn round_coord(coord: Coord<f64>, decimals: u32) -> Coord<f64> {
    let scale = 10f64.powi(decimals as i32);
    Coord {
        x: (coord.x * scale).round() / scale,
        y: (coord.y * scale).round() / scale,
    }
}

/// Snap every coordinate of `geom` onto a grid of `decimals` decimal places.
///
/// Rounding can collapse neighbouring vertices onto each other; use
/// [`dedup_line`] afterwards when a line must not carry repeated vertices.
pub fn reduce_precision<G>(geom: &G, decimals: u32) -> G
where
    G: MapCoords<f64, f64, Output = G>,
{
    geom.map_coords(|coord| round_coord(coord, decimals))
}

/// Drop consecutive repeated vertices from a line.
pub(crate) fn dedup_line(line: &LineString<f64>) -> LineString<f64> {
    let mut coords = line.0.clone();
    coords.dedup();
    LineString(coords)
}
