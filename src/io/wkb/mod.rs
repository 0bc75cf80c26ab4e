//! Well-Known Binary geometry codec, including the GeoPackage blob wrapper.
//!
//! Reading accepts ISO and EWKB type codes in either byte order and drops
//! Z/M ordinates. Writing always produces little-endian 2D ISO WKB.

mod read;
mod write;

use anyhow::{bail, Result};
use geo::Geometry;

pub use read::*;
pub use write::*;

/// WKB byte order: little endian
const WKB_LE: u8 = 1;

/// EWKB dimension and SRID flags.
const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;
const EWKB_SRID: u32 = 0x2000_0000;

/// Magic bytes opening a GeoPackage geometry blob.
const GPKG_MAGIC: &[u8] = b"GP";

/// Base WKB geometry types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WkbType {
    Point = 1,
    LineString = 2,
    Polygon = 3,
    MultiPoint = 4,
    MultiLineString = 5,
    MultiPolygon = 6,
    GeometryCollection = 7,
}

impl TryFrom<u32> for WkbType {
    type Error = anyhow::Error;

    fn try_from(code: u32) -> Result<Self> {
        Ok(match code {
            1 => WkbType::Point,
            2 => WkbType::LineString,
            3 => WkbType::Polygon,
            4 => WkbType::MultiPoint,
            5 => WkbType::MultiLineString,
            6 => WkbType::MultiPolygon,
            7 => WkbType::GeometryCollection,
            _ => bail!("[io::wkb] Unsupported WKB geometry type {code}"),
        })
    }
}

/// Geometry decoded from a GeoPackage blob.
#[derive(Debug, Clone, PartialEq)]
pub struct GpkgGeometry {
    /// Spatial reference id from the blob header.
    pub srs_id: i32,
    /// `None` when the blob carries the empty-geometry flag.
    pub geometry: Option<Geometry<f64>>,
}

#[cfg(test)]
mod tests {
    use geo::{line_string, point, polygon, GeometryCollection, MultiPolygon};

    use super::*;

    #[test]
    fn polygon_with_hole_round_trips() {
        let shape: Geometry<f64> = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0), (x: 0.0, y: 0.0)],
            interiors: [[(x: 2.0, y: 2.0), (x: 4.0, y: 2.0), (x: 4.0, y: 4.0), (x: 2.0, y: 2.0)]],
        ).into();
        assert_eq!(geometry_from_wkb(&geometry_to_wkb(&shape)).unwrap(), shape);
    }

    #[test]
    fn nested_collection_round_trips() {
        let collection = Geometry::GeometryCollection(GeometryCollection(vec![
            point!(x: 1.5, y: -2.0).into(),
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)].into(),
            MultiPolygon::new(vec![polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 0.0, y: 1.0), (x: 0.0, y: 0.0)]]).into(),
        ]));
        assert_eq!(geometry_from_wkb(&geometry_to_wkb(&collection)).unwrap(), collection);
    }

    #[test]
    fn big_endian_point_z_drops_z() {
        // ISO PointZ (1001), big endian: x = 1, y = 2, z = 3
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(&1001u32.to_be_bytes());
        for v in [1.0f64, 2.0, 3.0] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        assert_eq!(geometry_from_wkb(&bytes).unwrap(), Geometry::Point(point!(x: 1.0, y: 2.0)));
    }

    #[test]
    fn ewkb_with_srid_is_accepted() {
        let mut bytes = vec![WKB_LE];
        bytes.extend_from_slice(&(2u32 | EWKB_SRID).to_le_bytes());
        bytes.extend_from_slice(&4326u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&5.0f64.to_le_bytes());
        bytes.extend_from_slice(&6.0f64.to_le_bytes());
        let Geometry::LineString(line) = geometry_from_wkb(&bytes).unwrap() else { panic!("expected line") };
        assert_eq!(line.0.len(), 1);
    }

    #[test]
    fn truncated_input_is_an_error() {
        let bytes = geometry_to_wkb(&Geometry::Point(point!(x: 1.0, y: 2.0)));
        assert!(geometry_from_wkb(&bytes[..bytes.len() - 1]).is_err());
        assert!(geometry_from_wkb(&[WKB_LE, 99, 0, 0, 0]).is_err());
    }

    #[test]
    fn gpkg_blob_round_trips_with_envelope() {
        let line: Geometry<f64> = line_string![(x: -111.0, y: 41.0), (x: -110.5, y: 41.5)].into();
        let blob = geometry_to_gpkg_blob(Some(&line), 4326);
        assert_eq!(&blob[..2], b"GP");
        assert_eq!((blob[3] >> 1) & 0x07, 1);

        let decoded = geometry_from_gpkg_blob(&blob).unwrap();
        assert_eq!(decoded.srs_id, 4326);
        assert_eq!(decoded.geometry, Some(line));
    }

    #[test]
    fn empty_gpkg_blob() {
        let decoded = geometry_from_gpkg_blob(&geometry_to_gpkg_blob(None, 26912)).unwrap();
        assert_eq!(decoded, GpkgGeometry { srs_id: 26912, geometry: None });
    }
}
