use std::{fs, path::Path};

use anyhow::{Context, Result};
use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use shapefile::{dbase::{FieldValue as DbfValue, Record}, PolygonRing, Reader, Shape};
use tracing::debug;

use crate::vector::{Feature, FeatureLayer, FieldValue, Fid};

/// Collect shapefile points of any flavour (plain, M, Z) into planar coordinates.
macro_rules! coords {
    ($points:expr) => {
        $points.iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect::<Vec<_>>()
    };
}

/// Group shapefile rings into polygons: each outer ring owns the inner rings that follow it.
macro_rules! rings_to_multipolygon {
    ($rings:expr) => {{
        let mut polygons: Vec<Polygon<f64>> = Vec::new();
        let mut exterior: Option<LineString<f64>> = None;
        let mut holes: Vec<LineString<f64>> = Vec::new();
        for ring in $rings.iter() {
            let ls = LineString::new(coords!(ring.points()));
            match ring {
                PolygonRing::Outer(_) => {
                    if let Some(ext) = exterior.replace(ls) {
                        polygons.push(Polygon::new(ext, std::mem::take(&mut holes)));
                    }
                }
                PolygonRing::Inner(_) => holes.push(ls),
            }
        }
        if let Some(ext) = exterior {
            polygons.push(Polygon::new(ext, holes));
        }
        MultiPolygon::new(polygons)
    }};
}

/// Convert a shapefile shape into a `geo` geometry. Null shapes and multipatches yield `None`.
fn shape_to_geometry(shape: &Shape) -> Option<Geometry<f64>> {
    let geometry: Geometry<f64> = match shape {
        Shape::NullShape | Shape::Multipatch(_) => return None,
        Shape::Point(pt) => Point::new(pt.x, pt.y).into(),
        Shape::PointM(pt) => Point::new(pt.x, pt.y).into(),
        Shape::PointZ(pt) => Point::new(pt.x, pt.y).into(),
        Shape::Polyline(line) => MultiLineString::new(line.parts().iter().map(|part| LineString::new(coords!(part))).collect()).into(),
        Shape::PolylineM(line) => MultiLineString::new(line.parts().iter().map(|part| LineString::new(coords!(part))).collect()).into(),
        Shape::PolylineZ(line) => MultiLineString::new(line.parts().iter().map(|part| LineString::new(coords!(part))).collect()).into(),
        Shape::Polygon(poly) => rings_to_multipolygon!(poly.rings()).into(),
        Shape::PolygonM(poly) => rings_to_multipolygon!(poly.rings()).into(),
        Shape::PolygonZ(poly) => rings_to_multipolygon!(poly.rings()).into(),
        Shape::Multipoint(points) => MultiPoint::from(coords!(points.points())).into(),
        Shape::MultipointM(points) => MultiPoint::from(coords!(points.points())).into(),
        Shape::MultipointZ(points) => MultiPoint::from(coords!(points.points())).into(),
    };
    Some(geometry)
}

/// Convert a dBase value into an attribute value.
fn dbf_to_field(value: DbfValue) -> FieldValue {
    match value {
        DbfValue::Character(Some(s)) | DbfValue::Memo(s) => FieldValue::Text(s.trim_end().to_string()),
        DbfValue::Numeric(Some(v)) | DbfValue::Double(v) | DbfValue::Currency(v) => FieldValue::Real(v),
        DbfValue::Float(Some(v)) => FieldValue::Real(v as f64),
        DbfValue::Integer(v) => FieldValue::Integer(v as i64),
        DbfValue::Logical(Some(v)) => FieldValue::Bool(v),
        _ => FieldValue::Null,
    }
}

/// Guess the EPSG code from the WKT stored in a `.prj` sidecar.
///
/// The CRS-level `AUTHORITY` is the last one in a WKT1 string; ESRI-flavoured
/// files without authorities are matched on the datum of a bare geographic CRS.
fn sniff_epsg(wkt: &str) -> Option<u32> {
    let tag = "AUTHORITY[\"EPSG\",\"";
    if let Some(start) = wkt.rfind(tag) {
        let rest = &wkt[start + tag.len()..];
        return rest.split('"').next().and_then(|code| code.parse().ok());
    }
    if wkt.trim_start().starts_with("PROJCS") {
        return None;
    }
    match () {
        _ if wkt.contains("North_American_1983") => Some(4269),
        _ if wkt.contains("North_American_1927") => Some(4267),
        _ if wkt.contains("WGS_1984") => Some(4326),
        _ => None,
    }
}

/// Read a `.shp` file (with its `.dbf` and optional `.prj`) into an in-memory layer.
/// Features are numbered by record position.
pub fn read_shapefile_layer(path: &Path) -> Result<FeatureLayer> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open shapefile: {}", path.display()))?;

    let mut features = Vec::with_capacity(reader.shape_count()?);
    for (i, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record): (Shape, Record) = result.context("Error reading shape+record")?;
        let mut feature = Feature::new(i as Fid, shape_to_geometry(&shape));
        for (field, value) in record {
            feature.set(&field, dbf_to_field(value));
        }
        features.push(feature);
    }

    let epsg = fs::read_to_string(path.with_extension("prj")).ok()
        .as_deref()
        .and_then(sniff_epsg);

    let name = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or("layer");
    debug!(path = %path.display(), features = features.len(), ?epsg, "read shapefile");
    Ok(FeatureLayer::new(name, epsg, features))
}
