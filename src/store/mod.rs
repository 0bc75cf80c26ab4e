mod error;
mod layer;
mod table;
mod writer;

pub use error::StoreError;
pub use layer::LayerWriter;
pub use table::AttributeTable;
pub use writer::{AttributeWriter, Record};
