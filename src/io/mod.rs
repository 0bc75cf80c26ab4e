//! IO module for format-specific reading and writing operations.
//!
//! # Format Modules
//!
//! - `csv` - CSV format for attribute tables
//! - `parquet` - Parquet format for attribute tables (requires `parquet` feature)
//! - `wkb` - Well-Known Binary and GeoPackage blob geometry codec
//! - `geojson` - GeoJSON feature collections

pub(crate) mod csv;
pub(crate) mod geojson;
pub mod wkb;

#[cfg(feature = "parquet")]
pub(crate) mod parquet;

pub use geojson::{
    geometry_from_geojson, geometry_to_geojson, layer_from_geojson, layer_to_geojson,
    read_geojson_layer, write_geojson_layer,
};
