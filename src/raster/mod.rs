mod ascii;
mod geotransform;
mod grid;
mod stats;

pub use ascii::read_ascii_grid;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterSampler};
pub use stats::{CellStats, Statistic};
