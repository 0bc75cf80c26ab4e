//! WKB writing operations.

use geo::{BoundingRect, Coord, Geometry, LineString, Polygon};

use super::{WkbType, GPKG_MAGIC, WKB_LE};

/// Little-endian 2D WKB encoder.
#[derive(Default)]
struct WkbWriter {
    out: Vec<u8>,
}

impl WkbWriter {
    fn u32(&mut self, v: u32) {
        self.out.extend_from_slice(&v.to_le_bytes());
    }

    fn coord(&mut self, coord: &Coord<f64>) {
        self.out.extend_from_slice(&coord.x.to_le_bytes());
        self.out.extend_from_slice(&coord.y.to_le_bytes());
    }

    fn header(&mut self, kind: WkbType) {
        self.out.push(WKB_LE);
        self.u32(kind as u32);
    }

    fn ring(&mut self, ring: &LineString<f64>) {
        self.u32(ring.0.len() as u32);
        ring.0.iter().for_each(|c| self.coord(c));
    }

    fn polygon_body(&mut self, polygon: &Polygon<f64>) {
        self.u32(1 + polygon.interiors().len() as u32);
        self.ring(polygon.exterior());
        polygon.interiors().iter().for_each(|ring| self.ring(ring));
    }

    fn geometry(&mut self, geometry: &Geometry<f64>) {
        match geometry {
            Geometry::Point(point) => {
                self.header(WkbType::Point);
                self.coord(&point.0);
            }
            Geometry::Line(line) => {
                self.header(WkbType::LineString);
                self.u32(2);
                self.coord(&line.start);
                self.coord(&line.end);
            }
            Geometry::LineString(line) => {
                self.header(WkbType::LineString);
                self.ring(line);
            }
            Geometry::Polygon(polygon) => {
                self.header(WkbType::Polygon);
                self.polygon_body(polygon);
            }
            Geometry::Rect(rect) => self.geometry(&Geometry::Polygon(rect.to_polygon())),
            Geometry::Triangle(triangle) => self.geometry(&Geometry::Polygon(triangle.to_polygon())),
            Geometry::MultiPoint(points) => {
                self.header(WkbType::MultiPoint);
                self.u32(points.0.len() as u32);
                for point in &points.0 {
                    self.header(WkbType::Point);
                    self.coord(&point.0);
                }
            }
            Geometry::MultiLineString(lines) => {
                self.header(WkbType::MultiLineString);
                self.u32(lines.0.len() as u32);
                for line in &lines.0 {
                    self.header(WkbType::LineString);
                    self.ring(line);
                }
            }
            Geometry::MultiPolygon(polygons) => {
                self.header(WkbType::MultiPolygon);
                self.u32(polygons.0.len() as u32);
                for polygon in &polygons.0 {
                    self.header(WkbType::Polygon);
                    self.polygon_body(polygon);
                }
            }
            Geometry::GeometryCollection(collection) => {
                self.header(WkbType::GeometryCollection);
                self.u32(collection.0.len() as u32);
                collection.0.iter().for_each(|member| self.geometry(member));
            }
        }
    }
}

/// Encode a geometry as little-endian 2D ISO WKB.
pub fn geometry_to_wkb(geometry: &Geometry<f64>) -> Vec<u8> {
    let mut writer = WkbWriter::default();
    writer.geometry(geometry);
    writer.out
}

/// Encode a geometry as a GeoPackage blob with an XY envelope.
/// `None` (or a geometry without extent) is written with the empty flag set.
pub fn geometry_to_gpkg_blob(geometry: Option<&Geometry<f64>>, srs_id: i32) -> Vec<u8> {
    let extent = geometry.and_then(|g| g.bounding_rect().map(|rect| (g, rect)));

    let mut out = Vec::from(GPKG_MAGIC);
    out.push(0); // version 1
    match extent {
        Some((geometry, rect)) => {
            out.push(0x01 | (1 << 1)); // little endian, xy envelope
            out.extend_from_slice(&srs_id.to_le_bytes());
            for v in [rect.min().x, rect.max().x, rect.min().y, rect.max().y] {
                out.extend_from_slice(&v.to_le_bytes());
            }
            out.extend(geometry_to_wkb(geometry));
        }
        None => {
            out.push(0x01 | 0x10); // little endian, empty
            out.extend_from_slice(&srs_id.to_le_bytes());
            out.extend(geometry_to_wkb(&Geometry::GeometryCollection(Default::default())));
        }
    }
    out
}
