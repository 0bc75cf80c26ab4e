use std::sync::Arc;

use anyhow::Result;
use geo::{BooleanOps, BoundingRect, Contains, Geometry, Intersects, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Rect};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    geom::MetricTransform,
    store::{AttributeWriter, StoreError},
    vector::{FeatureLayer, Fid},
    window::Window,
};

/// What is measured for an infrastructure source inside a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    /// Clipped line length, written to `<Label>_len`
    Length,
    /// Contained point count, written to `<Label>_ct`
    Count,
    /// Intersected polygon area, written to `<Label>_area`
    Area,
}

impl Measure {
    pub fn suffix(&self) -> &'static str {
        match self {
            Measure::Length => "len",
            Measure::Count => "ct",
            Measure::Area => "area",
        }
    }
}

/// Denominator for infrastructure densities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityBasis {
    #[default]
    SegmentArea,
    CenterlineLength,
}

impl DensityBasis {
    #[inline]
    pub fn of(&self, window: &Window) -> f64 {
        match self {
            DensityBasis::SegmentArea => window.segment_area,
            DensityBasis::CenterlineLength => window.centerline_length,
        }
    }
}

/// A labelled infrastructure dataset, e.g. roads or diversion points.
/// `layer` is `None` when the dataset is absent from the project.
#[derive(Debug, Clone)]
pub struct InfrastructureSource {
    pub label: String,
    pub measure: Measure,
    pub layer: Option<Arc<FeatureLayer>>,
}

impl InfrastructureSource {
    pub fn lines(label: &str, layer: Option<Arc<FeatureLayer>>) -> Self {
        Self { label: label.to_string(), measure: Measure::Length, layer }
    }

    pub fn points(label: &str, layer: Option<Arc<FeatureLayer>>) -> Self {
        Self { label: label.to_string(), measure: Measure::Count, layer }
    }

    pub fn polygons(label: &str, layer: Option<Arc<FeatureLayer>>) -> Self {
        Self { label: label.to_string(), measure: Measure::Area, layer }
    }

    /// Raw total field name.
    pub fn total_field(&self) -> String {
        format!("{}_{}", self.label, self.measure.suffix())
    }

    pub fn density_field(&self) -> String {
        format!("{}_dens", self.label)
    }
}

/// A source's features merged into one geometry.
#[derive(Debug, Clone)]
enum Combined {
    Lines(MultiLineString<f64>),
    Points(MultiPoint<f64>),
    Polygons(MultiPolygon<f64>),
}

#[derive(Debug, Clone)]
struct Prepared {
    label: String,
    total_field: String,
    density_field: String,
    combined: Option<(Combined, Rect<f64>)>,
}

/// Infrastructure totals of one source inside one window.
#[derive(Debug, Clone, PartialEq)]
pub struct InfrastructureSummary {
    pub total_field: String,
    pub density_field: String,
    pub total: f64,
    /// `None` when the density basis of the window is zero
    pub density: Option<f64>,
}

/// Measures infrastructure inside windows. Every source is combined once up
/// front rather than per window.
#[derive(Debug, Clone)]
pub struct InfrastructureAggregator {
    sources: Vec<Prepared>,
    basis: DensityBasis,
    precision: u32,
}

impl InfrastructureAggregator {
    pub fn prepare(sources: &[InfrastructureSource], basis: DensityBasis, precision: u32) -> Self {
        let sources = sources.iter()
            .map(|source| Prepared {
                label: source.label.clone(),
                total_field: source.total_field(),
                density_field: source.density_field(),
                combined: combine(source),
            })
            .collect();
        Self { sources, basis, precision }
    }

    #[inline] pub fn len(&self) -> usize { self.sources.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.sources.is_empty() }

    #[inline] pub fn basis(&self) -> DensityBasis { self.basis }

    /// Total and density field names of every source, missing ones included.
    pub fn output_fields(&self) -> Vec<String> {
        self.sources.iter()
            .flat_map(|source| [source.total_field.clone(), source.density_field.clone()])
            .collect()
    }

    pub fn add_fields(&self, writer: &mut dyn AttributeWriter) -> Result<(), StoreError> {
        self.output_fields().iter().try_for_each(|field| writer.add_field(field))
    }

    /// Measure every available source inside `window`. Missing sources are
    /// left out.
    pub fn summarize(&self, window: &Window, transform: &MetricTransform) -> Result<Vec<InfrastructureSummary>> {
        let basis = self.basis.of(window);
        let window_rect = window.polygon.bounding_rect();

        let mut summaries = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let Some((combined, rect)) = &source.combined else { continue };

            let overlaps = window_rect.is_some_and(|window_rect| window_rect.intersects(rect));
            let total = match combined {
                _ if !overlaps => 0.0,
                Combined::Lines(lines) => {
                    transform.length(&geoprim::clip_line(&window.polygon, lines, self.precision))?
                }
                Combined::Points(points) => {
                    points.iter().filter(|&point| window.polygon.contains(point)).count() as f64
                }
                Combined::Polygons(polygons) => {
                    transform.area(&window.polygon.intersection(polygons))?
                }
            };

            debug!(label = %source.label, igo = window.igo, total, "infrastructure total");
            summaries.push(InfrastructureSummary {
                total_field: source.total_field.clone(),
                density_field: source.density_field.clone(),
                total,
                density: (basis != 0.0).then(|| total / basis),
            });
        }
        Ok(summaries)
    }

    /// Write summaries onto the record `id`. Densities are only written when defined.
    pub fn write(&self, id: Fid, summaries: &[InfrastructureSummary], writer: &mut dyn AttributeWriter) -> Result<(), StoreError> {
        for summary in summaries {
            writer.update(id, &summary.total_field, Some(summary.total))?;
            if let Some(density) = summary.density {
                writer.update(id, &summary.density_field, Some(density))?;
            }
        }
        Ok(())
    }

    /// Zero-fill the raw total fields once every window is written. Density
    /// fields keep their nulls.
    pub fn finish(&self, writer: &mut dyn AttributeWriter) -> Result<usize, StoreError> {
        let mut filled = 0;
        for source in &self.sources {
            filled += writer.fill_nulls(&source.total_field, 0.0)?;
        }
        Ok(filled)
    }
}

/// Merge a source's features into one geometry of its measure's kind.
fn combine(source: &InfrastructureSource) -> Option<(Combined, Rect<f64>)> {
    let Some(layer) = source.layer.as_ref().filter(|layer| !layer.is_empty()) else {
        info!(label = %source.label, "infrastructure dataset missing or empty; skipping");
        return None;
    };

    let mut lines: Vec<LineString<f64>> = Vec::new();
    let mut points: Vec<Point<f64>> = Vec::new();
    let mut polygons = Vec::new();
    let mut mismatched = 0;

    for feature in layer.features() {
        let Some(geometry) = &feature.geometry else { continue };
        match (source.measure, geometry) {
            (Measure::Length, Geometry::LineString(line)) => lines.push(line.clone()),
            (Measure::Length, Geometry::MultiLineString(multi)) => lines.extend(multi.0.iter().cloned()),
            (Measure::Length, Geometry::Line(line)) => lines.push(LineString::from(vec![line.start, line.end])),
            (Measure::Count, Geometry::Point(point)) => points.push(*point),
            (Measure::Count, Geometry::MultiPoint(multi)) => points.extend(multi.0.iter().copied()),
            (Measure::Area, Geometry::Polygon(_) | Geometry::MultiPolygon(_) | Geometry::Rect(_) | Geometry::Triangle(_)) => {
                polygons.extend(geoprim::flatten_polygons(geometry))
            }
            _ => mismatched += 1,
        }
    }
    if mismatched > 0 {
        warn!(label = %source.label, mismatched, measure = ?source.measure, "skipping features of the wrong geometry type");
    }

    let combined = match source.measure {
        Measure::Length if !lines.is_empty() => Combined::Lines(MultiLineString::new(lines)),
        Measure::Count if !points.is_empty() => Combined::Points(MultiPoint::new(points)),
        Measure::Area if !polygons.is_empty() => Combined::Polygons(geoprim::union_all(polygons)),
        _ => {
            info!(label = %source.label, "infrastructure dataset has no usable geometry; skipping");
            return None;
        }
    };

    let rect = match &combined {
        Combined::Lines(lines) => lines.bounding_rect(),
        Combined::Points(points) => points.bounding_rect(),
        Combined::Polygons(polygons) => polygons.bounding_rect(),
    }?;
    Some((combined, rect))
}
