mod fields;
mod lines;
mod model;

pub use fields::{DgoFields, IgoFields, NetworkFields};
pub use lines::NetworkLines;
pub use model::{read_dgos, read_igos, Dgo, Igo, LevelPath};
