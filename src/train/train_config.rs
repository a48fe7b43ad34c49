use crate::config::RunConfig;
use crate::train::batching::BatchingStrategy;

/// Configuration for a `Trainer` run.
///
/// # Fields
/// - `epochs`         : total number of passes over the balanced training set
/// - `batch_size`     : samples per mini-batch, also the evaluation chunk size
/// - `recording_step` : evaluate train/validation accuracy every k steps;
///                      `0` evaluates after every step
/// - `batching`       : how batches are cut from each epoch's shuffled order
/// - `weight_decay`   : L2 coefficient on the fully-connected parameters
/// - `seed`           : seeds the per-epoch shuffles
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub recording_step: usize,
    pub batching: BatchingStrategy,
    pub learning_rate: f32,
    pub weight_decay: f32,
    pub seed: u64,
}

impl TrainConfig {
    /// Creates a `TrainConfig` with Adam at 0.001 and weight decay 5e-4.
    pub fn new(epochs: usize, batch_size: usize) -> Self {
        TrainConfig {
            epochs,
            batch_size,
            recording_step: 0,
            batching: BatchingStrategy::WrapAround,
            learning_rate: 0.001,
            weight_decay: 5e-4,
            seed: 78456,
        }
    }

    pub fn from_run(cfg: &RunConfig) -> Self {
        TrainConfig {
            epochs: cfg.num_epochs,
            batch_size: cfg.batch_size,
            recording_step: cfg.recording_step,
            batching: cfg.batching,
            learning_rate: cfg.learning_rate,
            weight_decay: cfg.weight_decay,
            seed: cfg.data_seed,
        }
    }

    pub fn should_record(&self, step: usize) -> bool {
        self.recording_step == 0 || step % self.recording_step == 0
    }
}
