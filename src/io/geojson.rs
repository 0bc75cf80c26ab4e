//! GeoJSON reading and writing for feature layers.

use std::{fs, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde_json::{json, Map, Value};

use crate::vector::{Feature, FeatureLayer, FieldValue, Fid};

/// Parse a `[x, y, ...]` position.
fn parse_coord(value: &Value) -> Result<Coord<f64>> {
    let pos = value.as_array()
        .filter(|pos| pos.len() >= 2)
        .ok_or_else(|| anyhow!("[io::geojson] Invalid position: {value}"))?;
    let x = pos[0].as_f64().ok_or_else(|| anyhow!("[io::geojson] Invalid coordinate: x must be a number"))?;
    let y = pos[1].as_f64().ok_or_else(|| anyhow!("[io::geojson] Invalid coordinate: y must be a number"))?;
    Ok(Coord { x, y })
}

fn as_array<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    value.as_array().ok_or_else(|| anyhow!("[io::geojson] {what} must be an array"))
}

fn parse_line(value: &Value) -> Result<LineString<f64>> {
    as_array(value, "LineString coordinates")?.iter()
        .map(parse_coord)
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

/// Parse polygon rings; `Polygon::new` closes them if needed.
fn parse_polygon(value: &Value) -> Result<Option<Polygon<f64>>> {
    let mut rings = as_array(value, "Polygon coordinates")?.iter()
        .map(parse_line)
        .collect::<Result<Vec<_>>>()?
        .into_iter();
    let Some(exterior) = rings.next() else { return Ok(None) };
    Ok(Some(Polygon::new(exterior, rings.collect())))
}

/// Convert a GeoJSON geometry object into a `geo` geometry. `null` geometry yields `None`.
pub fn geometry_from_geojson(value: &Value) -> Result<Option<Geometry<f64>>> {
    if value.is_null() {
        return Ok(None);
    }
    let kind = value["type"].as_str()
        .ok_or_else(|| anyhow!("[io::geojson] Geometry is missing its type"))?;
    let coords = &value["coordinates"];

    let geometry = match kind {
        "Point" => Geometry::Point(Point::from(parse_coord(coords)?)),
        "LineString" => Geometry::LineString(parse_line(coords)?),
        "Polygon" => match parse_polygon(coords)? {
            Some(polygon) => Geometry::Polygon(polygon),
            None => Geometry::MultiPolygon(MultiPolygon::new(vec![])),
        },
        "MultiPoint" => Geometry::MultiPoint(MultiPoint::new(
            as_array(coords, "MultiPoint coordinates")?.iter()
                .map(|c| parse_coord(c).map(Point::from))
                .collect::<Result<_>>()?,
        )),
        "MultiLineString" => Geometry::MultiLineString(MultiLineString::new(
            as_array(coords, "MultiLineString coordinates")?.iter()
                .map(parse_line)
                .collect::<Result<_>>()?,
        )),
        "MultiPolygon" => Geometry::MultiPolygon(MultiPolygon::new(
            as_array(coords, "MultiPolygon coordinates")?.iter()
                .filter_map(|p| parse_polygon(p).transpose())
                .collect::<Result<_>>()?,
        )),
        "GeometryCollection" => Geometry::GeometryCollection(GeometryCollection(
            as_array(&value["geometries"], "GeometryCollection geometries")?.iter()
                .filter_map(|g| geometry_from_geojson(g).transpose())
                .collect::<Result<_>>()?,
        )),
        other => bail!("[io::geojson] Unsupported geometry type {other}"),
    };
    Ok(Some(geometry))
}

fn coord_json(coord: &Coord<f64>) -> Value {
    json!([coord.x, coord.y])
}

fn line_json(line: &LineString<f64>) -> Value {
    Value::Array(line.0.iter().map(coord_json).collect())
}

fn polygon_json(polygon: &Polygon<f64>) -> Value {
    Value::Array(std::iter::once(polygon.exterior()).chain(polygon.interiors()).map(line_json).collect())
}

/// Convert a `geo` geometry into a GeoJSON geometry object.
pub fn geometry_to_geojson(geometry: &Geometry<f64>) -> Value {
    match geometry {
        Geometry::Point(point) => json!({ "type": "Point", "coordinates": coord_json(&point.0) }),
        Geometry::Line(line) => json!({ "type": "LineString", "coordinates": [coord_json(&line.start), coord_json(&line.end)] }),
        Geometry::LineString(line) => json!({ "type": "LineString", "coordinates": line_json(line) }),
        Geometry::Polygon(polygon) => json!({ "type": "Polygon", "coordinates": polygon_json(polygon) }),
        Geometry::Rect(rect) => geometry_to_geojson(&Geometry::Polygon(rect.to_polygon())),
        Geometry::Triangle(triangle) => geometry_to_geojson(&Geometry::Polygon(triangle.to_polygon())),
        Geometry::MultiPoint(points) => json!({
            "type": "MultiPoint",
            "coordinates": points.0.iter().map(|p| coord_json(&p.0)).collect::<Vec<_>>(),
        }),
        Geometry::MultiLineString(lines) => json!({
            "type": "MultiLineString",
            "coordinates": lines.0.iter().map(line_json).collect::<Vec<_>>(),
        }),
        Geometry::MultiPolygon(polygons) => json!({
            "type": "MultiPolygon",
            "coordinates": polygons.0.iter().map(polygon_json).collect::<Vec<_>>(),
        }),
        Geometry::GeometryCollection(collection) => json!({
            "type": "GeometryCollection",
            "geometries": collection.0.iter().map(geometry_to_geojson).collect::<Vec<_>>(),
        }),
    }
}

fn value_to_field(value: &Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::Bool(v) => FieldValue::Bool(*v),
        Value::Number(n) => n.as_i64().map_or_else(|| n.as_f64().map_or(FieldValue::Null, FieldValue::Real), FieldValue::Integer),
        Value::String(s) => FieldValue::Text(s.clone()),
        other => FieldValue::Text(other.to_string()),
    }
}

fn field_to_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Integer(v) => json!(v),
        FieldValue::Real(v) if v.is_finite() => json!(v),
        FieldValue::Text(s) => json!(s),
        FieldValue::Bool(v) => json!(v),
        FieldValue::Real(_) | FieldValue::Null => Value::Null,
    }
}

/// EPSG code from a legacy named `crs` member (`EPSG:26912`, `urn:ogc:def:crs:EPSG::4269`).
/// `CRS84` maps to 4326.
fn parse_crs(collection: &Value) -> Option<u32> {
    let name = collection["crs"]["properties"]["name"].as_str()?;
    if name.ends_with("CRS84") {
        return Some(4326);
    }
    name.rsplit(':').next().and_then(|code| code.parse().ok())
}

/// Build a layer from a parsed FeatureCollection.
///
/// Feature ids come from the feature `id`, then an integer `fid` property,
/// then the position in the collection.
pub fn layer_from_geojson(name: &str, collection: &Value) -> Result<FeatureLayer> {
    if collection["type"].as_str() != Some("FeatureCollection") {
        bail!("[io::geojson] Expected a FeatureCollection");
    }

    let features = as_array(&collection["features"], "FeatureCollection features")?.iter()
        .enumerate()
        .map(|(i, feature)| -> Result<Feature> {
            let properties = feature["properties"].as_object();
            let fid = feature["id"].as_i64()
                .or_else(|| properties.and_then(|props| props.get("fid")).and_then(Value::as_i64))
                .unwrap_or(i as Fid);
            let geometry = geometry_from_geojson(&feature["geometry"])
                .with_context(|| format!("[io::geojson] Invalid geometry on feature {fid}"))?;

            let mut out = Feature::new(fid, geometry);
            for (key, value) in properties.into_iter().flatten() {
                out.set(key, value_to_field(value));
            }
            Ok(out)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(FeatureLayer::new(name, parse_crs(collection), features))
}

/// Read a GeoJSON FeatureCollection file into a layer named after the file stem.
pub fn read_geojson_layer(path: &Path) -> Result<FeatureLayer> {
    let bytes = fs::read(path)
        .with_context(|| format!("[io::geojson] Failed to read {}", path.display()))?;
    let collection: Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("[io::geojson] Failed to parse {}", path.display()))?;
    let name = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or("layer");
    layer_from_geojson(name, &collection)
}

/// Export a layer as a GeoJSON FeatureCollection.
pub fn layer_to_geojson(layer: &FeatureLayer) -> Value {
    let features = layer.features().iter()
        .map(|feature| {
            let properties: Map<String, Value> = feature.attributes.iter()
                .map(|(key, value)| (key.clone(), field_to_value(value)))
                .collect();
            json!({
                "type": "Feature",
                "id": feature.fid,
                "geometry": feature.geometry.as_ref().map_or(Value::Null, geometry_to_geojson),
                "properties": properties,
            })
        })
        .collect::<Vec<_>>();

    let mut collection = json!({
        "type": "FeatureCollection",
        "name": layer.name(),
        "features": features,
    });
    if let Some(epsg) = layer.epsg() {
        collection["crs"] = json!({ "type": "name", "properties": { "name": format!("urn:ogc:def:crs:EPSG::{epsg}") } });
    }
    collection
}

/// Write a layer to a GeoJSON file, creating parent directories as needed.
pub fn write_geojson_layer(layer: &FeatureLayer, path: &Path) -> Result<()> {
    crate::common::ensure_parent_exists(path)?;
    let bytes = serde_json::to_vec(&layer_to_geojson(layer))
        .context("[io::geojson] Failed to serialize GeoJSON")?;
    fs::write(path, bytes)
        .with_context(|| format!("[io::geojson] Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use geo::{line_string, polygon};

    use super::*;

    fn collection() -> Value {
        json!({
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::26912" } },
            "features": [
                {
                    "type": "Feature",
                    "id": 7,
                    "geometry": { "type": "Point", "coordinates": [1.0, 2.0] },
                    "properties": { "level_path": 100, "seg_distance": 50.5, "name": "Bear Creek" }
                },
                {
                    "type": "Feature",
                    "geometry": null,
                    "properties": { "fid": 9, "stream_size": null }
                },
                {
                    "type": "Feature",
                    "geometry": { "type": "MultiLineString", "coordinates": [[[0, 0], [1, 1]], [[2, 2], [3, 3]]] },
                    "properties": {}
                }
            ]
        })
    }

    #[test]
    fn reads_features_ids_and_crs() {
        let layer = layer_from_geojson("igos", &collection()).unwrap();
        assert_eq!(layer.epsg(), Some(26912));
        assert_eq!(layer.len(), 3);

        let first = layer.feature(7).unwrap();
        assert_eq!(first.get_i64("level_path"), Some(100));
        assert_eq!(first.get_f64("seg_distance"), Some(50.5));
        assert!(matches!(first.geometry, Some(Geometry::Point(_))));

        let second = layer.feature(9).unwrap();
        assert!(second.geometry.is_none());
        assert!(second.get("stream_size").is_some_and(FieldValue::is_null));

        let Some(Geometry::MultiLineString(lines)) = &layer.feature(2).unwrap().geometry else { panic!("expected lines") };
        assert_eq!(lines.0.len(), 2);
    }

    #[test]
    fn missing_crs_is_unknown() {
        let mut value = collection();
        value.as_object_mut().unwrap().remove("crs");
        assert_eq!(layer_from_geojson("igos", &value).unwrap().epsg(), None);
    }

    #[test]
    fn polygon_geometry_round_trips() {
        let shape: Geometry<f64> = polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 0.0)].into();
        let back = geometry_from_geojson(&geometry_to_geojson(&shape)).unwrap();
        assert_eq!(back, Some(shape));
    }

    #[test]
    fn unsupported_type_is_an_error() {
        assert!(geometry_from_geojson(&json!({ "type": "Circle", "coordinates": [0, 0] })).is_err());
    }

    #[test]
    fn layer_written_to_disk_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/windows.geojson");
        let layer = FeatureLayer::new("windows", Some(4269), vec![
            Feature::new(3, Some(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)].into()))
                .with("centerline_length", 150.0)
                .with("note", FieldValue::Null),
        ]);
        write_geojson_layer(&layer, &path).unwrap();

        let back = read_geojson_layer(&path).unwrap();
        assert_eq!(back.name(), "windows");
        assert_eq!(back.epsg(), Some(4269));
        assert_eq!(back.feature(3).and_then(|f| f.get_f64("centerline_length")), Some(150.0));
    }
}
