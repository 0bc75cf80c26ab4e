use anyhow::Result;

use crate::{geom::MetricTransform, window::Window};
use super::AnalysisLine;

/// Line and polygon metrics of one window, written onto its IGO.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowMetrics {
    /// Flowline elevation drop over flowline length
    pub stream_gradient: Option<f64>,
    /// Flowline elevation drop over centerline length
    pub valley_gradient: Option<f64>,
    pub sinuosity: Option<f64>,
    pub azimuth: Option<f64>,
    pub flowline_length: Option<f64>,
    pub centerline_length: Option<f64>,
    /// Window polygon area in square metres
    pub window_area: Option<f64>,
    /// DGO segment area over DGO centerline length
    pub integrated_width: Option<f64>,
}

impl WindowMetrics {
    /// Output field names, in the order of [`WindowMetrics::values`].
    pub const FIELDS: [&'static str; 8] = [
        "stream_gradient",
        "valley_gradient",
        "sinuosity",
        "azimuth",
        "flowline_length",
        "centerline_length",
        "window_area",
        "integrated_width",
    ];

    /// Measure a window from its clipped flowline and valley centerline.
    pub fn compute(
        window: &Window,
        flowline: Option<&AnalysisLine>,
        centerline: Option<&AnalysisLine>,
        transform: &MetricTransform,
    ) -> Result<Self> {
        let flowline = flowline.filter(|line| !line.is_empty());
        let centerline = centerline.filter(|line| !line.is_empty());

        let mut metrics = Self::default();
        if let Some(flowline) = flowline {
            let length = flowline.length()?;
            metrics.flowline_length = Some(length);
            metrics.stream_gradient = flowline.gradient()?;
            metrics.sinuosity = flowline.sinuosity()?;
            metrics.azimuth = flowline.azimuth()?;
        }
        if let Some(centerline) = centerline {
            let length = centerline.length()?;
            metrics.centerline_length = Some(length);
            metrics.valley_gradient = flowline.and_then(|flowline| flowline.elevations().gradient_over(length));
        }
        if !window.is_empty() {
            metrics.window_area = Some(transform.area(&window.polygon)?);
            if window.centerline_length > 0.0 {
                metrics.integrated_width = Some(window.segment_area / window.centerline_length);
            }
        }
        Ok(metrics)
    }

    /// `(field, value)` pairs in [`WindowMetrics::FIELDS`] order.
    pub fn values(&self) -> [(&'static str, Option<f64>); 8] {
        let values = [
            self.stream_gradient,
            self.valley_gradient,
            self.sinuosity,
            self.azimuth,
            self.flowline_length,
            self.centerline_length,
            self.window_area,
            self.integrated_width,
        ];
        std::array::from_fn(|i| (Self::FIELDS[i], values[i]))
    }
}

#[cfg(test)]
mod tests {
    use geo::{line_string, polygon, MultiLineString, MultiPolygon};

    use super::*;
    use crate::{
        analysis::ElevationSource,
        network::LevelPath,
        raster::{GeoTransform, Raster},
    };

    /// 200 x 20 grid of 1 m cells; elevation rises 0.5 m per metre eastward.
    fn dem() -> Raster {
        let values = (0..4000).map(|i| (i % 200) as f64 * 0.5).collect();
        Raster::from_vec(values, 20, 200, GeoTransform::new(0.0, 20.0, 1.0, -1.0), None).unwrap()
    }

    fn window() -> Window {
        Window {
            igo: 1,
            level_path: LevelPath(100),
            length: 100.0,
            polygon: MultiPolygon::new(vec![polygon![
                (x: 0.0, y: 0.0), (x: 200.0, y: 0.0), (x: 200.0, y: 20.0), (x: 0.0, y: 20.0), (x: 0.0, y: 0.0),
            ]]),
            centerline_length: 200.0,
            segment_area: 4000.0,
            members: vec![1, 2],
        }
    }

    #[test]
    fn valley_gradient_uses_centerline_length() {
        let transform = MetricTransform::Identity;
        let raster = dem();
        let source = ElevationSource { raster: &raster, buffer: 0.5 };

        // Flowline meanders, so it is longer than the straight centerline.
        let flowline = AnalysisLine::new(MultiLineString::new(vec![line_string![
            (x: 20.5, y: 10.5), (x: 60.5, y: 40.5), (x: 100.5, y: 10.5),
        ]]), &transform, Some(source));
        let centerline = AnalysisLine::new(MultiLineString::new(vec![line_string![
            (x: 20.5, y: 10.5), (x: 100.5, y: 10.5),
        ]]), &transform, Some(source));

        let metrics = WindowMetrics::compute(&window(), Some(&flowline), Some(&centerline), &transform).unwrap();

        // Endpoint cells 20 and 100 hold 10 m and 50 m.
        assert_eq!(metrics.flowline_length, Some(100.0));
        assert_eq!(metrics.centerline_length, Some(80.0));
        assert_eq!(metrics.stream_gradient, Some(0.4));
        assert_eq!(metrics.valley_gradient, Some(0.5));
        assert_eq!(metrics.sinuosity, Some(1.25));
        assert_eq!(metrics.window_area, Some(4000.0));
        assert_eq!(metrics.integrated_width, Some(20.0));
    }

    #[test]
    fn missing_lines_leave_metrics_null() {
        let transform = MetricTransform::Identity;
        let empty = AnalysisLine::new(MultiLineString::new(vec![]), &transform, None);
        let metrics = WindowMetrics::compute(&window(), Some(&empty), None, &transform).unwrap();
        assert_eq!(metrics.flowline_length, None);
        assert_eq!(metrics.valley_gradient, None);
        assert_eq!(metrics.window_area, Some(4000.0));

        let empty_window = Window::empty(2, LevelPath(100), 100.0);
        let metrics = WindowMetrics::compute(&empty_window, None, None, &transform).unwrap();
        assert_eq!(metrics, WindowMetrics::default());
        assert!(metrics.values().iter().all(|(_, value)| value.is_none()));
        assert_eq!(metrics.values()[3].0, "azimuth");
    }
}
