use serde::{Serialize, Deserialize};

/// One periodic evaluation emitted by the trainer.
///
/// Recorded every `recording_step` optimization steps. Accuracies are
/// percentages over the whole balanced training set and the whole
/// validation set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalRecord {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Share of the epoch consumed when this record was taken, `step * B / n`.
    pub epoch_fraction: f32,
    /// 0-based step within the epoch.
    pub step: usize,
    /// Loss of the mini-batch just trained on, weight decay included.
    pub minibatch_loss: f32,
    pub train_accuracy: f32,
    pub val_accuracy: f32,
    /// Wall-clock time spent in the evaluation, in milliseconds.
    pub elapsed_ms: u64,
}
