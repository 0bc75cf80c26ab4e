use std::sync::Arc;

use crate::{
    raster::{RasterSampler, Statistic},
    store::{AttributeWriter, StoreError},
    window::Window,
};

/// A masked raster statistic reported per window, e.g. mean vegetation cover.
#[derive(Clone)]
pub struct RasterSummary {
    pub label: String,
    pub raster: Arc<dyn RasterSampler>,
    pub statistic: Statistic,
}

impl RasterSummary {
    pub fn new(label: &str, raster: Arc<dyn RasterSampler>, statistic: Statistic) -> Self {
        Self { label: label.to_string(), raster, statistic }
    }

    /// Output field, `<label>_<stat>`.
    pub fn field(&self) -> String {
        format!("{}_{}", self.label, self.statistic.name())
    }

    /// Statistic of the cells under the window polygon. Empty windows give `None`.
    pub fn summarize(&self, window: &Window) -> Option<f64> {
        if window.is_empty() {
            return None;
        }
        self.statistic.apply(&self.raster.mask(&window.polygon))
    }

    pub fn write(&self, window: &Window, writer: &mut dyn AttributeWriter) -> Result<bool, StoreError> {
        writer.update(window.igo, &self.field(), self.summarize(window))
    }
}
