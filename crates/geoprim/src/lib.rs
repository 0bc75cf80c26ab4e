pub mod line;
pub mod point;
pub mod polygon;
pub mod precision;

pub use line::{clip_line, endpoints, merge_lines, single_line};
pub use point::{azimuth, buffer_point, distance};
pub use polygon::{envelope_to_polygon, flatten_polygons, repair, union_all, RepairOutcome};
pub use precision::{reduce_precision, round_coord};

/// Decimal places used when collapsing multi-part clip results.
pub const DEFAULT_PRECISION: u32 = 6;
