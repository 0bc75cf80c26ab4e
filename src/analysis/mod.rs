//! Clipped network lines and the metrics measured along them.

mod line;
mod metrics;

pub use line::{AnalysisLine, ElevationSource, Elevations};
pub use metrics::WindowMetrics;
