use anyhow::Result;
use geo::{Centroid, Geometry, LineString, MultiLineString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    geom::TransformCache,
    network::{Dgo, LevelPath},
    store::AttributeWriter,
    vector::FeatureLayer,
};

/// How line values are reduced onto a polygon they cross.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMethod {
    /// Length-weighted average
    #[default]
    Lwa,
    /// Value with the most accumulated length
    Longest,
}

/// Reduce `(value, length)` pieces to one value.
///
/// `Longest` sums lengths per distinct value; on a tie the value met first
/// wins. Returns `None` when there is no length to weigh by.
pub fn transfer_value(pieces: &[(f64, f64)], method: TransferMethod) -> Option<f64> {
    match method {
        TransferMethod::Lwa => {
            let total: f64 = pieces.iter().map(|&(_, length)| length).sum();
            (total > 0.0).then(|| pieces.iter().map(|&(value, length)| value * length).sum::<f64>() / total)
        }
        TransferMethod::Longest => {
            let mut totals: Vec<(f64, f64)> = Vec::new();
            for &(value, length) in pieces {
                match totals.iter_mut().find(|(v, _)| *v == value) {
                    Some((_, total)) => *total += length,
                    None => totals.push((value, length)),
                }
            }
            let mut best: Option<(f64, f64)> = None;
            for (value, total) in totals {
                if total > 0.0 && best.is_none_or(|(_, longest)| total > longest) {
                    best = Some((value, total));
                }
            }
            best.map(|(value, _)| value)
        }
    }
}

/// Copy a numeric line attribute onto every DGO the lines cross.
///
/// Each intersecting line is clipped to the DGO polygon and weighed by its
/// clipped length, measured with the DGO level path's metric transform.
/// DGOs without any crossing get a null. Returns the number of DGOs given a value.
pub fn line_attributes_to_dgo(
    dgos: &[Dgo],
    lines: &FeatureLayer,
    field: &str,
    method: TransferMethod,
    transforms: &mut TransformCache<LevelPath>,
    precision: u32,
    writer: &mut dyn AttributeWriter,
) -> Result<usize> {
    writer.add_field(field)?;

    let mut written = 0;
    for dgo in dgos {
        let Some(center) = dgo.geometry.centroid() else {
            writer.update(dgo.fid, field, None)?;
            continue;
        };
        let transform = transforms.get_or_build(&dgo.level_path, || center.0)?;

        let mut pieces = Vec::new();
        for (feature, _) in lines.iterate_features(None, Some(&dgo.geometry)) {
            let Some(value) = feature.get_f64(field) else { continue };
            let line = match &feature.geometry {
                Some(Geometry::LineString(line)) => MultiLineString::new(vec![line.clone()]),
                Some(Geometry::MultiLineString(multi)) => multi.clone(),
                Some(Geometry::Line(line)) => MultiLineString::new(vec![LineString::from(vec![line.start, line.end])]),
                _ => {
                    warn!(layer = lines.name(), fid = feature.fid, "skipping non-line feature");
                    continue;
                }
            };
            let length = transform.length(&geoprim::clip_line(&dgo.geometry, &line, precision))?;
            pieces.push((value, length));
        }

        let value = transfer_value(&pieces, method);
        debug!(dgo = dgo.fid, field, pieces = pieces.len(), ?value, "transferred line attribute");
        if writer.update(dgo.fid, field, value)? && value.is_some() {
            written += 1;
        }
    }
    Ok(written)
}
