use std::{fs, path::Path};

use anyhow::{anyhow, bail, ensure, Context, Result};

use super::{GeoTransform, Raster};

/// Read an Esri ASCII grid (`.asc`) into a raster.
///
/// Both `xllcorner`/`yllcorner` and `xllcenter`/`yllcenter` headers are
/// accepted. Header keys are case-insensitive.
pub fn read_ascii_grid(path: &Path) -> Result<Raster> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read ASCII grid {}", path.display()))?;
    parse_ascii_grid(&text).with_context(|| format!("Invalid ASCII grid {}", path.display()))
}

fn parse_ascii_grid(text: &str) -> Result<Raster> {
    let mut rows = None;
    let mut cols = None;
    let mut cellsize = None;
    let mut nodata = None;
    let mut corner = (None, None);
    let mut center = (None, None);
    let mut values = Vec::new();

    for line in text.lines() {
        let mut parts = line.split_whitespace();
        let Some(first) = parts.next() else { continue };

        if first.starts_with(|c: char| c.is_ascii_alphabetic()) {
            let value: f64 = parts.next()
                .ok_or_else(|| anyhow!("Header {first} has no value"))?
                .parse()
                .with_context(|| format!("Header {first} is not a number"))?;
            match first.to_ascii_lowercase().as_str() {
                "nrows" => rows = Some(value as usize),
                "ncols" => cols = Some(value as usize),
                "cellsize" => cellsize = Some(value),
                "nodata_value" => nodata = Some(value),
                "xllcorner" => corner.0 = Some(value),
                "yllcorner" => corner.1 = Some(value),
                "xllcenter" => center.0 = Some(value),
                "yllcenter" => center.1 = Some(value),
                other => bail!("Unknown header {other}"),
            }
        } else {
            for token in std::iter::once(first).chain(parts) {
                values.push(token.parse::<f64>().with_context(|| format!("Bad cell value {token}"))?);
            }
        }
    }

    let rows = rows.context("Missing nrows")?;
    let cols = cols.context("Missing ncols")?;
    let cellsize = cellsize.context("Missing cellsize")?;
    ensure!(cellsize > 0.0, "cellsize must be positive");

    let (west, south) = match (corner, center) {
        ((Some(x), Some(y)), _) => (x, y),
        (_, (Some(x), Some(y))) => (x - 0.5 * cellsize, y - 0.5 * cellsize),
        _ => bail!("Missing lower-left corner or center"),
    };
    let north = south + rows as f64 * cellsize;
    Raster::from_vec(values, rows, cols, GeoTransform::new(west, north, cellsize, -cellsize), nodata)
}

#[cfg(test)]
mod tests {
    use geo::Coord;

    use super::*;

    const GRID: &str = "ncols 3\nnrows 2\nxllcorner 100.0\nyllcorner 200.0\ncellsize 10\nNODATA_value -9999\n1 2 3\n4 -9999 6\n";

    #[test]
    fn parses_header_and_values() {
        let raster = parse_ascii_grid(GRID).unwrap();
        assert_eq!((raster.rows(), raster.cols()), (2, 3));
        assert_eq!(raster.transform().origin_y, 220.0);
        assert_eq!(raster.value_at(Coord { x: 105.0, y: 215.0 }), Some(1.0));
        assert_eq!(raster.value_at(Coord { x: 115.0, y: 205.0 }), None);
    }

    #[test]
    fn center_registration_shifts_origin() {
        let text = GRID.replace("xllcorner 100.0", "xllcenter 105.0").replace("yllcorner 200.0", "yllcenter 205.0");
        assert_eq!(parse_ascii_grid(&text).unwrap().transform().origin_x, 100.0);
    }

    #[test]
    fn short_data_is_an_error() {
        assert!(parse_ascii_grid(&GRID.replace("4 -9999 6\n", "")).is_err());
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dem.asc");
        fs::write(&path, GRID).unwrap();
        assert_eq!(read_ascii_grid(&path).unwrap().cols(), 3);
    }
}
