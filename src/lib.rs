pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod train;
pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod predict;
pub mod report;
pub mod pipeline;

// Convenience re-exports
pub use config::RunConfig;
pub use data::{Dataset, Image, Label, LabelAssigner};
pub use error::{Result, RoadSegError};
pub use eval::{ConfusionCounts, F1Score};
pub use math::{Matrix, Tensor};
pub use network::{ModelGeometry, RoadNet};
pub use predict::{LabelMap, TrainedModel};
pub use train::{BatchingStrategy, Trainer, TrainerState};
