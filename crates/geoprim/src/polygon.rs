use geo::{BooleanOps, Geometry, MultiPolygon, Polygon, Rect, Validation};

/// How [`repair`] treated its input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepairOutcome {
    /// The input was already valid and is returned untouched.
    AlreadyValid,
    /// The input was invalid and the rebuilt shape is valid.
    Repaired,
    /// The input was invalid and could not be rebuilt; it is returned as-is.
    Failed,
}

/// Collect every polygon part of `geom`, descending into multipolygons and
/// geometry collections. Non-areal parts are ignored.
pub fn flatten_polygons(geom: &Geometry<f64>) -> Vec<Polygon<f64>> {
    fn walk(geom: &Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
        match geom {
            Geometry::Polygon(polygon) => out.push(polygon.clone()),
            Geometry::MultiPolygon(multi) => out.extend(multi.0.iter().cloned()),
            Geometry::Rect(rect) => out.push(rect.to_polygon()),
            Geometry::Triangle(triangle) => out.push(triangle.to_polygon()),
            Geometry::GeometryCollection(collection) => {
                collection.0.iter().for_each(|child| walk(child, out))
            }
            _ => {}
        }
    }

    let mut parts = Vec::new();
    walk(geom, &mut parts);
    parts
}

/// Union a set of polygons into a single multipolygon.
/// Empty input yields an empty multipolygon.
pub fn union_all(polygons: impl IntoIterator<Item = Polygon<f64>>) -> MultiPolygon<f64> {
    polygons.into_iter()
        .filter(|polygon| !polygon.exterior().0.is_empty())
        .map(MultiPolygon::from)
        .reduce(|a, b| a.union(&b))
        .unwrap_or_else(|| MultiPolygon::new(Vec::new()))
}

/// Repair an invalid multipolygon by rebuilding it through the overlay engine.
///
/// Self-intersections are resolved into the areas they enclose. When the
/// rebuilt shape is still invalid the input is handed back with
/// [`RepairOutcome::Failed`] so the caller can decide whether to carry on.
pub fn repair(shape: MultiPolygon<f64>) -> (MultiPolygon<f64>, RepairOutcome) {
    if shape.is_valid() {
        return (shape, RepairOutcome::AlreadyValid);
    }

    let rebuilt = shape.union(&MultiPolygon::new(Vec::new()));
    if rebuilt.is_valid() {
        (rebuilt, RepairOutcome::Repaired)
    } else {
        (shape, RepairOutcome::Failed)
    }
}

/// Convert an axis-aligned envelope into a closed polygon.
#[inline]
pub fn envelope_to_polygon(envelope: &Rect<f64>) -> Polygon<f64> {
    envelope.to_polygon()
}
