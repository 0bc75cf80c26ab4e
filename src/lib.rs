#![doc = "Riverscape moving-window public API"]
mod common;
mod config;
mod geom;
mod run;

pub mod analysis;
pub mod io;
pub mod network;
pub mod raster;
pub mod store;
pub mod vector;
pub mod window;
pub mod zonal;

#[doc(inline)]
pub use config::RunConfig;

#[doc(inline)]
pub use geom::{utm_zone, MetricTransform, TransformCache};

#[doc(inline)]
pub use run::{igo_ids, MovingWindowRun, RunSummary};

#[doc(inline)]
pub use common::read_shapefile_layer;
