//! WKB reading operations.

use anyhow::{anyhow, bail, ensure, Context, Result};
use geo::{Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};

use super::{GpkgGeometry, WkbType, EWKB_M, EWKB_SRID, EWKB_Z, GPKG_MAGIC, WKB_LE};

/// Cursor over a WKB byte buffer. Byte order is tracked per nested geometry.
struct WkbReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> WkbReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let chunk = self.bytes.get(self.pos..end)
            .ok_or_else(|| anyhow!("[io::wkb::read] Unexpected end of input at byte {}", self.pos))?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(chunk);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    fn u32(&mut self, le: bool) -> Result<u32> {
        let raw = self.take::<4>()?;
        Ok(if le { u32::from_le_bytes(raw) } else { u32::from_be_bytes(raw) })
    }

    fn f64(&mut self, le: bool) -> Result<f64> {
        let raw = self.take::<8>()?;
        Ok(if le { f64::from_le_bytes(raw) } else { f64::from_be_bytes(raw) })
    }

    /// Read one coordinate, discarding Z and M ordinates.
    fn coord(&mut self, le: bool, extra: usize) -> Result<Coord<f64>> {
        let x = self.f64(le)?;
        let y = self.f64(le)?;
        for _ in 0..extra {
            self.f64(le)?;
        }
        Ok(Coord { x, y })
    }

    fn line_string(&mut self, le: bool, extra: usize) -> Result<LineString<f64>> {
        let n = self.u32(le)? as usize;
        // Each coordinate takes at least 16 bytes.
        ensure!(n <= self.remaining() / 16, "[io::wkb::read] Point count {n} exceeds remaining input");
        (0..n).map(|_| self.coord(le, extra)).collect::<Result<Vec<_>>>().map(LineString::new)
    }

    fn polygon(&mut self, le: bool, extra: usize) -> Result<Option<Polygon<f64>>> {
        let rings = self.u32(le)? as usize;
        let mut parsed = (0..rings).map(|_| self.line_string(le, extra)).collect::<Result<Vec<_>>>()?.into_iter();
        let Some(exterior) = parsed.next() else { return Ok(None) };
        Ok(Some(Polygon::new(exterior, parsed.collect())))
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// Read a geometry header, returning byte order, base type and extra ordinate count.
    fn header(&mut self) -> Result<(bool, WkbType, usize)> {
        let le = match self.u8()? {
            WKB_LE => true,
            0 => false,
            other => bail!("[io::wkb::read] Invalid byte order marker {other}"),
        };
        let code = self.u32(le)?;

        // EWKB flags in the high bits, ISO dimensions as thousands.
        let mut has_z = code & EWKB_Z != 0;
        let mut has_m = code & EWKB_M != 0;
        if code & EWKB_SRID != 0 {
            self.u32(le)?;
        }
        let iso = code & 0x0FFF_FFFF;
        match iso / 1000 {
            0 => {}
            1 => has_z = true,
            2 => has_m = true,
            3 => { has_z = true; has_m = true; }
            _ => bail!("[io::wkb::read] Unsupported geometry type code {code}"),
        }
        let kind = WkbType::try_from(iso % 1000)?;
        Ok((le, kind, has_z as usize + has_m as usize))
    }

    fn geometry(&mut self) -> Result<Geometry<f64>> {
        let (le, kind, extra) = self.header()?;
        let geometry = match kind {
            WkbType::Point => {
                let coord = self.coord(le, extra)?;
                if coord.x.is_nan() && coord.y.is_nan() {
                    Geometry::MultiPoint(MultiPoint::new(vec![]))
                } else {
                    Geometry::Point(Point::from(coord))
                }
            }
            WkbType::LineString => Geometry::LineString(self.line_string(le, extra)?),
            WkbType::Polygon => match self.polygon(le, extra)? {
                Some(polygon) => Geometry::Polygon(polygon),
                None => Geometry::MultiPolygon(MultiPolygon::new(vec![])),
            },
            WkbType::MultiPoint => {
                let n = self.u32(le)?;
                let mut points = Vec::with_capacity(n.min(1 << 16) as usize);
                for _ in 0..n {
                    match self.geometry()? {
                        Geometry::Point(point) => points.push(point),
                        Geometry::MultiPoint(empty) if empty.0.is_empty() => {}
                        other => bail!("[io::wkb::read] MultiPoint member is not a point: {other:?}"),
                    }
                }
                Geometry::MultiPoint(MultiPoint::new(points))
            }
            WkbType::MultiLineString => {
                let n = self.u32(le)?;
                let mut lines = Vec::with_capacity(n.min(1 << 16) as usize);
                for _ in 0..n {
                    match self.geometry()? {
                        Geometry::LineString(line) => lines.push(line),
                        other => bail!("[io::wkb::read] MultiLineString member is not a line: {other:?}"),
                    }
                }
                Geometry::MultiLineString(MultiLineString::new(lines))
            }
            WkbType::MultiPolygon => {
                let n = self.u32(le)?;
                let mut polygons = Vec::with_capacity(n.min(1 << 16) as usize);
                for _ in 0..n {
                    match self.geometry()? {
                        Geometry::Polygon(polygon) => polygons.push(polygon),
                        Geometry::MultiPolygon(empty) if empty.0.is_empty() => {}
                        other => bail!("[io::wkb::read] MultiPolygon member is not a polygon: {other:?}"),
                    }
                }
                Geometry::MultiPolygon(MultiPolygon::new(polygons))
            }
            WkbType::GeometryCollection => {
                let n = self.u32(le)?;
                let members = (0..n).map(|_| self.geometry()).collect::<Result<Vec<_>>>()?;
                Geometry::GeometryCollection(GeometryCollection(members))
            }
        };
        Ok(geometry)
    }
}

/// Decode a WKB (ISO or EWKB) buffer into a geometry. Z and M values are dropped.
pub fn geometry_from_wkb(bytes: &[u8]) -> Result<Geometry<f64>> {
    let mut reader = WkbReader::new(bytes);
    let geometry = reader.geometry()?;
    ensure!(reader.remaining() == 0, "[io::wkb::read] {} trailing bytes after geometry", reader.remaining());
    Ok(geometry)
}

/// Decode a GeoPackage geometry blob (`GP` header, optional envelope, WKB body).
pub fn geometry_from_gpkg_blob(bytes: &[u8]) -> Result<GpkgGeometry> {
    ensure!(bytes.len() >= 8, "[io::wkb::read] GeoPackage blob shorter than its header");
    ensure!(&bytes[..2] == GPKG_MAGIC, "[io::wkb::read] Missing GeoPackage magic bytes");
    ensure!(bytes[2] == 0, "[io::wkb::read] Unsupported GeoPackage blob version {}", bytes[2]);

    let flags = bytes[3];
    let header_le = flags & 0x01 != 0;
    let empty = flags & 0x10 != 0;
    let envelope_len = match (flags >> 1) & 0x07 {
        0 => 0,
        1 => 32,
        2 | 3 => 48,
        4 => 64,
        other => bail!("[io::wkb::read] Invalid GeoPackage envelope indicator {other}"),
    };

    let srs_raw = [bytes[4], bytes[5], bytes[6], bytes[7]];
    let srs_id = if header_le { i32::from_le_bytes(srs_raw) } else { i32::from_be_bytes(srs_raw) };

    let body = bytes.get(8 + envelope_len..)
        .context("[io::wkb::read] GeoPackage envelope runs past the end of the blob")?;
    let geometry = if empty { None } else { Some(geometry_from_wkb(body)?) };
    Ok(GpkgGeometry { srs_id, geometry })
}
