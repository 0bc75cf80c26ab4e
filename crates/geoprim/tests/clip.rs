// Integration tests for line clipping against window polygons:
//   single pass-through, lines entirely outside, re-entrant lines and
//   the endpoint count each case hands to the elevation logic.

use geo::{coord, line_string, polygon, Euclidean, Length, MultiLineString, MultiPolygon};
use geoprim::{clip_line, endpoints, single_line, DEFAULT_PRECISION};

fn window(x0: f64, x1: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon![
        (x: x0, y: -10.0),
        (x: x1, y: -10.0),
        (x: x1, y: 10.0),
        (x: x0, y: 10.0),
        (x: x0, y: -10.0),
    ]])
}

#[test]
fn straight_line_is_cut_at_window_edges() {
    let line = MultiLineString::new(vec![line_string![(x: -50.0, y: 0.0), (x: 50.0, y: 0.0)]]);
    let clipped = clip_line(&window(-5.0, 5.0), &line, DEFAULT_PRECISION);

    let single = single_line(&clipped).expect("one part expected");
    assert!((Euclidean.length(single) - 10.0).abs() < 1e-9);

    let mut ends = endpoints(&clipped);
    ends.sort_by(|a, b| a.x.total_cmp(&b.x));
    assert!((ends[0].x + 5.0).abs() < 1e-9);
    assert!((ends[1].x - 5.0).abs() < 1e-9);
}

#[test]
fn line_outside_window_clips_to_nothing() {
    let line = MultiLineString::new(vec![line_string![(x: 100.0, y: 0.0), (x: 200.0, y: 0.0)]]);
    let clipped = clip_line(&window(-5.0, 5.0), &line, DEFAULT_PRECISION);
    assert!(clipped.0.iter().all(|part| part.0.len() < 2));
    assert!(endpoints(&clipped).is_empty());
}

#[test]
fn re_entrant_line_keeps_disjoint_parts() {
    // Leaves the window through the top edge and comes back in.
    let line = MultiLineString::new(vec![line_string![
        (x: -4.0, y: 0.0),
        (x: -2.0, y: 20.0),
        (x: 2.0, y: 20.0),
        (x: 4.0, y: 0.0),
    ]]);
    let clipped = clip_line(&window(-5.0, 5.0), &line, DEFAULT_PRECISION);
    assert_eq!(clipped.0.len(), 2);
    assert_eq!(endpoints(&clipped).len(), 4);
}

#[test]
fn two_part_line_is_stitched_after_clip() {
    // The source line arrives as two parts meeting inside the window.
    let shape = MultiPolygon::new(vec![
        polygon![(x: 0.0, y: -1.0), (x: 10.0, y: -1.0), (x: 10.0, y: 1.0), (x: 0.0, y: 1.0), (x: 0.0, y: -1.0)],
    ]);
    let line = MultiLineString::new(vec![
        line_string![(x: -5.0, y: 0.0), (x: 5.0, y: 0.0)],
        line_string![(x: 5.0, y: 0.0), (x: 15.0, y: 0.0)],
    ]);
    let clipped = clip_line(&shape, &line, DEFAULT_PRECISION);
    let single = single_line(&clipped).expect("adjacent parts should be stitched");
    assert!((Euclidean.length(single) - 10.0).abs() < 1e-9);
    let mut ends = endpoints(&clipped);
    ends.sort_by(|a, b| a.x.total_cmp(&b.x));
    assert_eq!(ends, vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 10.0, y: 0.0 }]);
}
