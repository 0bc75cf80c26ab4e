use std::path::Path;

use anyhow::{Context, Result};
use geo::{Centroid, Coord};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    analysis::{AnalysisLine, ElevationSource, WindowMetrics},
    config::RunConfig,
    geom::{MetricTransform, TransformCache},
    io::write_geojson_layer,
    network::{Igo, LevelPath, NetworkLines},
    raster::RasterSampler,
    store::AttributeWriter,
    vector::{FeatureLayer, Fid},
    window::{DgoIndex, Window, WindowBuilder},
    zonal::{InfrastructureAggregator, RasterSummary},
};

/// Log a progress line every this many IGOs.
const PROGRESS_INTERVAL: usize = 1000;

/// Outcome counts of a moving-window run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// IGOs whose metrics were written
    pub processed: usize,
    /// Processed IGOs whose window had no DGOs
    pub empty_windows: usize,
    /// IGOs skipped after an error
    pub failed: usize,
    /// Processed IGOs with no matching output record
    pub unmatched: usize,
}

/// Builds one window per IGO and writes its metrics onto the IGO's record.
///
/// A failing IGO is logged and counted, and the run moves on to the next one.
pub struct MovingWindowRun<'a> {
    config: &'a RunConfig,
    index: &'a DgoIndex,
    epsg: Option<u32>,
    flowlines: Option<&'a NetworkLines>,
    centerlines: Option<&'a NetworkLines>,
    dem: Option<&'a dyn RasterSampler>,
    infrastructure: Option<&'a InfrastructureAggregator>,
    rasters: &'a [RasterSummary],
}

impl<'a> MovingWindowRun<'a> {
    /// `epsg` is the CRS shared by every input layer.
    pub fn new(config: &'a RunConfig, index: &'a DgoIndex, epsg: Option<u32>) -> Self {
        Self {
            config,
            index,
            epsg,
            flowlines: None,
            centerlines: None,
            dem: None,
            infrastructure: None,
            rasters: &[],
        }
    }

    pub fn with_flowlines(mut self, flowlines: &'a NetworkLines) -> Self {
        self.flowlines = Some(flowlines);
        self
    }

    pub fn with_centerlines(mut self, centerlines: &'a NetworkLines) -> Self {
        self.centerlines = Some(centerlines);
        self
    }

    pub fn with_dem(mut self, dem: &'a dyn RasterSampler) -> Self {
        self.dem = Some(dem);
        self
    }

    pub fn with_infrastructure(mut self, infrastructure: &'a InfrastructureAggregator) -> Self {
        self.infrastructure = Some(infrastructure);
        self
    }

    pub fn with_rasters(mut self, rasters: &'a [RasterSummary]) -> Self {
        self.rasters = rasters;
        self
    }

    fn builder(&self) -> WindowBuilder<'a> {
        WindowBuilder::new(self.index, &self.config.window_lengths)
            .with_strategy(self.config.strategy)
            .with_distance_filter(self.config.distance_filter)
            .widen_sparse(self.config.widen_sparse_windows)
    }

    /// Every field the run writes.
    pub fn output_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = WindowMetrics::FIELDS.iter().map(|field| field.to_string()).collect();
        if let Some(infrastructure) = self.infrastructure {
            fields.extend(infrastructure.output_fields());
        }
        fields.extend(self.rasters.iter().map(RasterSummary::field));
        fields
    }

    /// Point used to pick a level path's metric transform.
    fn center(&self, level_path: LevelPath, igo: &Igo, window: &Window) -> Coord<f64> {
        self.flowlines.and_then(|lines| lines.center(level_path))
            .or_else(|| self.centerlines.and_then(|lines| lines.center(level_path)))
            .or_else(|| igo.point.map(|point| point.0))
            .or_else(|| window.polygon.centroid().map(|point| point.0))
            .unwrap_or_default()
    }

    /// Process every IGO inside a single transaction on `writer`.
    ///
    /// Per-IGO failures are counted in the summary; only writer failures
    /// outside a single IGO abort the run, rolling it back.
    pub fn run(&self, igos: &[Igo], writer: &mut dyn AttributeWriter) -> Result<RunSummary> {
        for field in self.output_fields() {
            writer.add_field(&field)?;
        }

        writer.start_transaction()?;
        match self.process_all(igos, writer) {
            Ok(summary) => {
                writer.commit_transaction()?;
                info!(
                    processed = summary.processed,
                    empty_windows = summary.empty_windows,
                    failed = summary.failed,
                    "moving window run complete"
                );
                Ok(summary)
            }
            Err(err) => {
                writer.rollback_transaction()?;
                Err(err)
            }
        }
    }

    fn process_all(&self, igos: &[Igo], writer: &mut dyn AttributeWriter) -> Result<RunSummary> {
        let builder = self.builder();
        let mut transforms = TransformCache::new(self.epsg);
        let mut summary = RunSummary::default();

        for (i, igo) in igos.iter().enumerate() {
            match self.process(&builder, igo, &mut transforms, writer) {
                Ok((window, matched)) => {
                    summary.processed += 1;
                    summary.empty_windows += window.is_empty() as usize;
                    summary.unmatched += !matched as usize;
                }
                Err(err) => {
                    warn!(igo = igo.fid, level_path = %igo.level_path, "skipping IGO: {err:#}");
                    summary.failed += 1;
                }
            }
            if (i + 1) % PROGRESS_INTERVAL == 0 {
                info!(done = i + 1, total = igos.len(), "moving window progress");
            }
        }

        if let Some(infrastructure) = self.infrastructure {
            let filled = infrastructure.finish(writer)?;
            debug!(filled, "zero-filled infrastructure totals");
        }
        Ok(summary)
    }

    /// Build, measure and write one IGO. Nothing is written unless every
    /// measurement succeeds.
    fn process(
        &self,
        builder: &WindowBuilder,
        igo: &Igo,
        transforms: &mut TransformCache<LevelPath>,
        writer: &mut dyn AttributeWriter,
    ) -> Result<(Window, bool)> {
        let window = builder.build(igo)?;
        let transform = transforms.get_or_build(&igo.level_path, || self.center(igo.level_path, igo, &window))?;

        let metrics = self.measure(&window, &transform)?;
        let infrastructure = self.infrastructure
            .map(|aggregator| aggregator.summarize(&window, &transform))
            .transpose()?;
        let rasters: Vec<(String, Option<f64>)> = self.rasters.iter()
            .map(|summary| (summary.field(), summary.summarize(&window)))
            .collect();

        let matched = writer.update_many(igo.fid, &metrics.values())?;
        if !matched {
            warn!(igo = igo.fid, "no output record for IGO");
            return Ok((window, false));
        }
        if let (Some(aggregator), Some(summaries)) = (self.infrastructure, &infrastructure) {
            aggregator.write(igo.fid, summaries, writer)?;
        }
        for (field, value) in rasters {
            writer.update(igo.fid, &field, value)?;
        }
        debug!(igo = igo.fid, level_path = %igo.level_path, members = window.members.len(), "window written");
        Ok((window, true))
    }

    fn measure(&self, window: &Window, transform: &MetricTransform) -> Result<WindowMetrics> {
        let dem = self.dem.map(|raster| ElevationSource { raster, buffer: self.config.buffer_elevation });
        let precision = self.config.precision;
        let flowline = self.flowlines.and_then(|lines| lines.get(window.level_path))
            .map(|line| AnalysisLine::clip(line, &window.polygon, precision, transform, dem));
        let centerline = self.centerlines.and_then(|lines| lines.get(window.level_path))
            .map(|line| AnalysisLine::clip(line, &window.polygon, precision, transform, dem));
        WindowMetrics::compute(window, flowline.as_ref(), centerline.as_ref(), transform)
    }

    /// Build every window without measuring anything, as a layer keyed by IGO id.
    /// IGOs whose window cannot be built are logged and left out.
    pub fn windows_layer(&self, igos: &[Igo]) -> FeatureLayer {
        let builder = self.builder();
        let features = igos.iter()
            .filter_map(|igo| match builder.build(igo) {
                Ok(window) => Some(window.to_feature()),
                Err(err) => {
                    warn!(igo = igo.fid, "no window: {err}");
                    None
                }
            })
            .collect();
        FeatureLayer::new("windows", self.epsg, features)
    }

    /// Write every window polygon to a GeoJSON file.
    pub fn export_windows(&self, igos: &[Igo], path: &Path) -> Result<usize> {
        let layer = self.windows_layer(igos);
        write_geojson_layer(&layer, path)
            .with_context(|| format!("[run] Failed to export windows to {}", path.display()))?;
        Ok(layer.len())
    }
}

/// Ids of every IGO, for seeding an output table.
pub fn igo_ids(igos: &[Igo]) -> impl Iterator<Item = Fid> + '_ {
    igos.iter().map(|igo| igo.fid)
}

#[cfg(test)]
mod tests {
    use geo::{line_string, polygon, MultiPolygon, Point};

    use super::*;
    use crate::{
        network::Dgo,
        store::{AttributeTable, Record},
        vector::Feature,
        window::WindowLengths,
        zonal::{DensityBasis, InfrastructureSource},
    };

    fn dgo(fid: Fid, seg_distance: f64) -> Dgo {
        let x = seg_distance;
        Dgo {
            fid,
            level_path: LevelPath(100),
            seg_distance,
            centerline_length: 50.0,
            segment_area: 500.0,
            geometry: MultiPolygon::new(vec![polygon![
                (x: x, y: 0.0), (x: x + 50.0, y: 0.0), (x: x + 50.0, y: 10.0), (x: x, y: 10.0), (x: x, y: 0.0),
            ]]),
        }
    }

    fn igo(fid: Fid, seg_distance: f64, stream_size: Option<i64>) -> Igo {
        Igo {
            fid,
            level_path: LevelPath(100),
            seg_distance,
            stream_size,
            point: Some(Point::new(seg_distance + 25.0, 5.0)),
        }
    }

    fn config() -> RunConfig {
        RunConfig { window_lengths: WindowLengths::new([(0, 100.0)]), ..RunConfig::default() }
    }

    #[test]
    fn failures_are_counted_and_skipped() {
        let config = config();
        let index = DgoIndex::new(vec![dgo(1, 0.0), dgo(2, 50.0), dgo(3, 100.0)]);
        let flowlines = NetworkLines::from_layer(&FeatureLayer::new("flowlines", None, vec![
            Feature::new(1, Some(line_string![(x: 0.0, y: 5.0), (x: 150.0, y: 5.0)].into())).with("level_path", 100i64),
        ]), "level_path");
        let roads = InfrastructureAggregator::prepare(
            &[InfrastructureSource::lines("Road", Some(std::sync::Arc::new(FeatureLayer::new("roads", None, vec![
                Feature::new(1, Some(line_string![(x: 60.0, y: -5.0), (x: 60.0, y: 15.0)].into())),
            ]))))],
            DensityBasis::SegmentArea,
            6,
        );

        let igos = vec![igo(10, 50.0, Some(0)), igo(11, 0.0, Some(9)), igo(12, 500.0, Some(0)), igo(13, 0.0, Some(0))];
        let mut table = AttributeTable::new("igo_id");
        table.insert_rows(igo_ids(&igos).filter(|&id| id != 13).map(Record::new)).unwrap();

        let run = MovingWindowRun::new(&config, &index, None)
            .with_flowlines(&flowlines)
            .with_infrastructure(&roads);
        let summary = run.run(&igos, &mut table).unwrap();

        assert_eq!(summary, RunSummary { processed: 3, empty_windows: 1, failed: 1, unmatched: 1 });
        assert!((table.value(10, "flowline_length").unwrap() - 150.0).abs() < 1e-9);
        assert_eq!(table.value(10, "integrated_width"), Some(10.0));
        assert!((table.value(10, "Road_len").unwrap() - 10.0).abs() < 1e-9);
        // Unknown stream size leaves the record untouched apart from the zero fill.
        assert_eq!(table.value(11, "flowline_length"), None);
        assert_eq!(table.value(11, "Road_len"), Some(0.0));
        assert_eq!(table.value(12, "Road_dens"), None);
    }

    #[test]
    fn windows_export_as_geojson() {
        let config = config();
        let index = DgoIndex::new(vec![dgo(1, 0.0), dgo(2, 50.0)]);
        let igos = vec![igo(10, 0.0, Some(0)), igo(11, 0.0, None)];
        let run = MovingWindowRun::new(&config, &index, None);

        let layer = run.windows_layer(&igos);
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.feature(10).and_then(|f| f.get_i64("dgo_count")), Some(2));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("windows.geojson");
        assert_eq!(run.export_windows(&igos, &path).unwrap(), 1);
        assert!(path.exists());
    }
}
