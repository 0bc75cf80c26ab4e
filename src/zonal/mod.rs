mod infrastructure;
mod raster;
mod transfer;

pub use infrastructure::{
    DensityBasis, InfrastructureAggregator, InfrastructureSource, InfrastructureSummary, Measure,
};
pub use raster::RasterSummary;
pub use transfer::{line_attributes_to_dgo, transfer_value, TransferMethod};
