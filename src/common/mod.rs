mod fs;
mod shp;

pub(crate) use fs::*;
pub(crate) use shp::*;
pub use shp::read_shapefile_layer;
