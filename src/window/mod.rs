mod builder;
mod config;
mod index;
mod window;

pub use builder::{WindowBuilder, WindowError};
pub use config::{DistanceFilter, WindowLengths, WindowStrategy};
pub use index::DgoIndex;
pub use window::Window;
