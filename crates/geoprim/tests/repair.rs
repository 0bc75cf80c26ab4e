// Integration tests for polygon repair and union:
//   self-intersecting rings, overlapping parts and validity of the result.

use geo::{polygon, Area, MultiPolygon, Validation};
use geoprim::{repair, union_all, RepairOutcome};

#[test]
fn bowtie_is_split_into_valid_lobes() {
    let bowtie = polygon![
        (x: 0.0, y: 0.0),
        (x: 2.0, y: 2.0),
        (x: 2.0, y: 0.0),
        (x: 0.0, y: 2.0),
        (x: 0.0, y: 0.0),
    ];
    let shape = MultiPolygon::new(vec![bowtie]);
    assert!(!shape.is_valid());

    let (repaired, outcome) = repair(shape);
    assert_eq!(outcome, RepairOutcome::Repaired);
    assert!(repaired.is_valid());
    // Two triangles of area 1 each.
    assert!((repaired.unsigned_area() - 2.0).abs() < 1e-9);
}

#[test]
fn overlapping_union_is_valid_and_counts_overlap_once() {
    let a = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0), (x: 0.0, y: 0.0)];
    let b = polygon![(x: 1.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 2.0), (x: 1.0, y: 2.0), (x: 1.0, y: 0.0)];
    let merged = union_all(vec![a, b]);
    assert!(merged.is_valid());
    assert!((merged.unsigned_area() - 6.0).abs() < 1e-9);
}

#[test]
fn disjoint_union_keeps_both_parts() {
    let a = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0), (x: 0.0, y: 0.0)];
    let b = polygon![(x: 5.0, y: 0.0), (x: 6.0, y: 0.0), (x: 6.0, y: 1.0), (x: 5.0, y: 1.0), (x: 5.0, y: 0.0)];
    let merged = union_all(vec![a, b]);
    assert_eq!(merged.0.len(), 2);
    assert!(merged.unsigned_area() >= 0.0);
}
