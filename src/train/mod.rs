pub mod batching;
pub mod checkpoint;
pub mod epoch_stats;
pub mod train_config;
pub mod loop_fn;

pub use batching::BatchingStrategy;
pub use checkpoint::{CheckpointStore, JsonCheckpointStore};
pub use epoch_stats::EvalRecord;
pub use train_config::TrainConfig;
pub use loop_fn::{Trainer, TrainerState, TrainingReport};
