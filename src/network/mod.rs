pub mod network;
pub mod spec;

pub use network::{ForwardCache, Gradients, RoadNet};
pub use spec::ModelGeometry;
