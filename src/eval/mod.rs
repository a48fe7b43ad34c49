pub mod metrics;

pub use metrics::{accuracy, predict_labels, ConfusionCounts, F1Score};
