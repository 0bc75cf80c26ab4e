use std::f64::consts::PI;

use geo::{Coord, Distance, Euclidean, LineString, Point, Polygon};

/// Planar distance between two coordinates.
#[inline]
pub fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    Euclidean.distance(Point::from(a), Point::from(b))
}

/// Compass bearing from `from` to `to` in degrees, clockwise from north, in `[0, 360)`.
pub fn azimuth(from: Coord<f64>, to: Coord<f64>) -> f64 {
    let degrees = (to.x - from.x).atan2(to.y - from.y).to_degrees();
    let bearing = degrees.rem_euclid(360.0);
    if bearing >= 360.0 { 0.0 } else { bearing }
}

/// Approximate a disc of `radius` around `center` with a closed polygon.
/// `quad_segs` vertices are used per quarter circle.
pub fn buffer_point(center: Coord<f64>, radius: f64, quad_segs: usize) -> Polygon<f64> {
    let n = 4 * quad_segs.max(1);
    let mut ring: Vec<Coord<f64>> = (0..n)
        .map(|i| {
            let theta = 2.0 * PI * (i as f64) / (n as f64);
            Coord { x: center.x + radius * theta.cos(), y: center.y + radius * theta.sin() }
        })
        .collect();
    ring.push(ring[0]);
    Polygon::new(LineString(ring), Vec::new())
}
