mod bbox;
mod proj;

pub(crate) use bbox::{envelope, BoundingBox};
pub use proj::{utm_zone, MetricTransform, TransformCache};
