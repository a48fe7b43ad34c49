use std::time::Instant;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::dataset::Split;
use crate::data::labels::Label;
use crate::error::{config, Result, RoadSegError};
use crate::eval::metrics::accuracy;
use crate::loss::cross_entropy::SoftmaxCrossEntropy;
use crate::loss::weight_decay::{add_l2_gradient, l2_penalty};
use crate::math::tensor::Tensor;
use crate::network::{ModelGeometry, RoadNet};
use crate::optim::adam::Adam;
use crate::train::checkpoint::CheckpointStore;
use crate::train::epoch_stats::EvalRecord;
use crate::train::train_config::TrainConfig;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Where a `Trainer` is in its lifecycle.
///
/// ```text
/// Uninitialized ─train→ Training ⇄ Evaluating → Saved ─(next epoch)→ Training
///                                               Saved ─(last epoch)→ Terminal
/// Restored ─finish→ Terminal
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    Uninitialized,
    Training { epoch: usize, step: usize },
    Evaluating { epoch: usize, step: usize },
    Saved { epoch: usize },
    Restored,
    Terminal,
}

/// Outcome of a finished `Trainer::train` call.
#[derive(Debug, Clone, Default)]
pub struct TrainingReport {
    pub records: Vec<EvalRecord>,
    /// Loss of the final optimization step, if any step ran.
    pub last_loss: Option<f32>,
    pub total_steps: usize,
}

impl TrainingReport {
    pub fn train_accuracies(&self) -> Vec<f32> {
        self.records.iter().map(|r| r.train_accuracy).collect()
    }

    pub fn val_accuracies(&self) -> Vec<f32> {
        self.records.iter().map(|r| r.val_accuracy).collect()
    }
}

// ---------------------------------------------------------------------------
// Trainer
// ---------------------------------------------------------------------------

/// Mini-batch Adam training of a `RoadNet` with weight decay on the
/// fully-connected layers and periodic accuracy evaluation.
pub struct Trainer {
    network: RoadNet,
    optimizer: Adam,
    config: TrainConfig,
    rng: StdRng,
    state: TrainerState,
}

impl Trainer {
    pub fn new(network: RoadNet, config: TrainConfig) -> Trainer {
        Trainer {
            optimizer: Adam::new(config.learning_rate),
            rng: StdRng::seed_from_u64(config.seed),
            network,
            config,
            state: TrainerState::Uninitialized,
        }
    }

    /// Loads a previously saved network instead of training one.
    pub fn restore(
        store: &dyn CheckpointStore,
        geometry: &ModelGeometry,
        config: TrainConfig,
    ) -> Result<Trainer> {
        let network = store.restore(geometry)?;
        info!("Model restored.");
        let mut trainer = Trainer::new(network, config);
        trainer.state = TrainerState::Restored;
        Ok(trainer)
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    pub fn network(&self) -> &RoadNet {
        &self.network
    }

    /// Consumes the trainer, handing back the network.
    pub fn finish(mut self) -> RoadNet {
        self.state = TrainerState::Terminal;
        self.network
    }

    /// Trains for `config.epochs` epochs on `train`, scoring `train` and
    /// `validation` every `recording_step` steps and saving a checkpoint
    /// after every epoch.
    ///
    /// Each epoch draws a fresh permutation of the training set and cuts
    /// `floor(n / B)` batches from it according to `config.batching`.
    ///
    /// # Errors
    /// - `Config` if the trainer has already trained or was restored, or if
    ///   the training set is smaller than one batch.
    /// - `EmptyDataset` if `train` has no samples.
    /// - `Shape` if the patches do not match the network geometry.
    /// - Whatever the checkpoint store reports on save.
    pub fn train(
        &mut self,
        train: &Split,
        validation: &Split,
        store: &dyn CheckpointStore,
    ) -> Result<TrainingReport> {
        if self.state != TrainerState::Uninitialized {
            return Err(config(format!("cannot train from state {:?}", self.state)));
        }
        let n = train.len();
        let batch_size = self.config.batch_size;
        if n == 0 {
            return Err(RoadSegError::EmptyDataset("training split has no patches".into()));
        }
        if batch_size == 0 || n < batch_size {
            return Err(config(format!(
                "batch size {} does not fit a training set of {} patches",
                batch_size, n
            )));
        }
        self.network.check_input(&train.patches)?;
        if !validation.is_empty() {
            self.network.check_input(&validation.patches)?;
        }

        let mut report = TrainingReport::default();
        info!("Total number of iterations = {}", self.config.epochs * n / batch_size);

        for epoch in 1..=self.config.epochs {
            let mut order: Vec<usize> = (0..n).collect();
            order.shuffle(&mut self.rng);

            let offsets = self.config.batching.epoch_offsets(n, batch_size);
            for (step, offset) in offsets.into_iter().enumerate() {
                self.state = TrainerState::Training { epoch, step };
                let indices = &order[offset..offset + batch_size];
                let batch = train.patches.gather(indices);
                let labels: Vec<Label> = indices.iter().map(|&i| train.labels[i]).collect();

                let loss = self.step(&batch, &labels);
                report.last_loss = Some(loss);
                report.total_steps += 1;

                if self.config.should_record(step) {
                    self.state = TrainerState::Evaluating { epoch, step };
                    let record = self.evaluate(epoch, step, n, loss, train, validation);
                    info!(
                        "Epoch {} {:.2} | Minibatch loss: {:.3} | Train accuracy: {:.2}% | Validation accuracy: {:.2}%",
                        record.epoch,
                        record.epoch_fraction,
                        record.minibatch_loss,
                        record.train_accuracy,
                        record.val_accuracy
                    );
                    report.records.push(record);
                }
            }

            let path = store.save(&self.network)?;
            self.state = TrainerState::Saved { epoch };
            info!("Model saved in file: {}", path.display());
        }

        self.state = TrainerState::Terminal;
        Ok(report)
    }

    /// One Adam update on `batch`. Returns the mini-batch loss including
    /// the L2 penalty.
    pub fn step(&mut self, batch: &Tensor, labels: &[Label]) -> f32 {
        let wd = self.config.weight_decay;
        let (logits, cache) = self.network.forward_cached(batch);
        let loss = SoftmaxCrossEntropy::loss(&logits, labels)
            + l2_penalty(wd, &self.network.regularized());

        let grad_logits = SoftmaxCrossEntropy::derivative(&logits, labels);
        let mut grads = self.network.backward(&cache, &grad_logits);
        for (grad, param) in grads.regularized_mut().into_iter().zip(self.network.regularized()) {
            add_l2_gradient(wd, param, grad);
        }

        self.optimizer.step(self.network.parameters_mut(), grads.slices());
        loss
    }

    fn evaluate(
        &self,
        epoch: usize,
        step: usize,
        n: usize,
        loss: f32,
        train: &Split,
        validation: &Split,
    ) -> EvalRecord {
        let t_start = Instant::now();
        let strategy = self.config.batching;
        let train_accuracy = accuracy(&self.network, train, self.config.batch_size, strategy);
        let val_accuracy = accuracy(&self.network, validation, self.config.batch_size, strategy);
        let elapsed_ms = t_start.elapsed().as_millis() as u64;
        debug!("evaluation at epoch {} step {} took {} ms", epoch, step, elapsed_ms);

        EvalRecord {
            epoch,
            epoch_fraction: (step * self.config.batch_size) as f32 / n as f32,
            step,
            minibatch_loss: loss,
            train_accuracy,
            val_accuracy,
            elapsed_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::train::batching::BatchingStrategy;
    use crate::train::checkpoint::JsonCheckpointStore;

    fn geometry() -> ModelGeometry {
        ModelGeometry { channels: 3, patch_total: 8, filter_size: 3 }
    }

    /// Bright patches are roads, dark ones background.
    fn toy_split(n: usize) -> Split {
        let mut data = Vec::with_capacity(n * 8 * 8 * 3);
        let mut labels = Vec::with_capacity(n);
        for i in 0..n {
            let road = i % 2 == 0;
            let level = if road { 1.0 } else { -1.0 };
            data.extend((0..8 * 8 * 3).map(|j| level + 0.01 * (j % 7) as f32));
            labels.push(if road { Label::Road } else { Label::Background });
        }
        Split { patches: Tensor::from_data([n, 8, 8, 3], data), labels, image_ids: vec![1] }
    }

    fn config(epochs: usize) -> TrainConfig {
        let mut cfg = TrainConfig::new(epochs, 4);
        cfg.recording_step = 2;
        cfg
    }

    #[test]
    fn step_lowers_the_loss_on_a_fixed_batch() {
        let split = toy_split(4);
        let mut trainer = Trainer::new(RoadNet::new(geometry(), 1).unwrap(), config(1));
        let first = trainer.step(&split.patches, &split.labels);
        let mut last = first;
        for _ in 0..15 {
            last = trainer.step(&split.patches, &split.labels);
        }
        assert!(last < first, "loss went from {} to {}", first, last);
    }

    #[test]
    fn train_records_and_checkpoints_every_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path());
        let split = toy_split(12);
        let mut trainer = Trainer::new(RoadNet::new(geometry(), 1).unwrap(), config(2));

        let report = trainer.train(&split, &split, &store).unwrap();

        // 12 / 4 = 3 steps per epoch, recorded at steps 0 and 2.
        assert_eq!(report.total_steps, 6);
        assert_eq!(report.records.len(), 4);
        assert_eq!(report.records[1].epoch, 1);
        assert_eq!(report.records[1].step, 2);
        assert!((report.records[1].epoch_fraction - 8.0 / 12.0).abs() < 1e-6);
        assert!(report.records.iter().all(|r| (0.0..=100.0).contains(&r.val_accuracy)));
        assert_eq!(trainer.state(), TrainerState::Terminal);
        assert!(store.model_path().is_file());

        // A second call is refused.
        assert!(matches!(trainer.train(&split, &split, &store), Err(RoadSegError::Config(_))));
    }

    #[test]
    fn same_seeds_train_identically() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path());
        let split = toy_split(8);
        let run = || {
            let mut trainer = Trainer::new(RoadNet::new(geometry(), 9).unwrap(), config(1));
            trainer.train(&split, &split, &store).unwrap();
            trainer.finish()
        };
        assert_eq!(run().fc2.weights, run().fc2.weights);
    }

    #[test]
    fn train_set_smaller_than_a_batch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path());
        let split = toy_split(3);
        let mut trainer = Trainer::new(RoadNet::new(geometry(), 1).unwrap(), config(1));
        assert!(matches!(trainer.train(&split, &split, &store), Err(RoadSegError::Config(_))));
    }

    #[test]
    fn mismatched_patches_fail_before_training() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path());
        let split = Split {
            patches: Tensor::zeros([4, 16, 16, 3]),
            labels: vec![Label::Road; 4],
            image_ids: vec![1],
        };
        let mut trainer = Trainer::new(RoadNet::new(geometry(), 1).unwrap(), config(1));
        assert!(matches!(trainer.train(&split, &split, &store), Err(RoadSegError::Shape(_))));
        assert!(!store.model_path().exists());
    }

    #[test]
    fn restore_marks_the_trainer_restored() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path());
        assert!(matches!(
            Trainer::restore(&store, &geometry(), config(1)),
            Err(RoadSegError::MissingCheckpoint { .. })
        ));

        store.save(&RoadNet::new(geometry(), 2).unwrap()).unwrap();
        let trainer = Trainer::restore(&store, &geometry(), config(1)).unwrap();
        assert_eq!(trainer.state(), TrainerState::Restored);
    }

    #[test]
    fn drop_last_runs_the_same_number_of_steps() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path());
        let split = toy_split(10);
        let mut cfg = config(1);
        cfg.batching = BatchingStrategy::DropLast;
        let mut trainer = Trainer::new(RoadNet::new(geometry(), 1).unwrap(), cfg);
        let report = trainer.train(&split, &split, &store).unwrap();
        assert_eq!(report.total_steps, 2);
    }
}
