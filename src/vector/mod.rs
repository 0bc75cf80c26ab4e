mod feature;
mod filter;
mod layer;
mod registry;

pub use feature::{Feature, FieldValue, Fid};
pub use filter::AttributeFilter;
pub use layer::{FeatureLayer, Progress};
pub use registry::{Dataset, DatasetRegistry, LayerHandle};
