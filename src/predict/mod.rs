pub mod predictor;
pub mod reconstruct;
pub mod visualize;

pub use predictor::TrainedModel;
pub use reconstruct::LabelMap;
pub use visualize::{concatenate, float_to_u8, overlay};
