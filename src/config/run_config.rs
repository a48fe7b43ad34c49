use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::labels::{ForegroundScore, LabelAssigner};
use crate::error::{config, Result, RoadSegError};
use crate::train::batching::BatchingStrategy;

/// Configuration for a full training + prediction run.
///
/// Built once at process start (usually from a JSON file) and passed by
/// reference to every stage; nothing in the crate reads global state.
/// Every field has a default, so a config file only needs the overrides.
///
/// # Fields
/// - `training_size`   : number of `satImage_###` pairs to load (1-based ids)
/// - `testing_size`    : number of `test_K/test_K.png` images to predict
/// - `train_fraction`  : share of images used for training; `>= 1.0` means
///                       no held-out set (validation is a copy of training)
/// - `data_seed`       : seeds the image split and per-epoch shuffles
/// - `model_seed`      : seeds weight initialization
/// - `recording_step`  : evaluate every k steps; `0` evaluates every step
/// - `batching`        : `wrap_around` (modular offset arithmetic) or `drop_last`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub training_size: usize,
    pub testing_size: usize,
    pub train_fraction: f64,
    pub data_seed: u64,
    pub model_seed: u64,
    pub batch_size: usize,
    pub num_epochs: usize,
    pub restore_model: bool,
    pub recording_step: usize,
    pub filter_size: usize,
    pub patch_size: usize,
    pub border: usize,
    pub predict_f1: bool,
    pub predict_images: bool,
    pub log_params: bool,
    pub batching: BatchingStrategy,
    pub foreground: ForegroundScore,
    pub foreground_threshold: f32,
    pub learning_rate: f32,
    pub weight_decay: f32,
    pub data_dir: PathBuf,
    pub test_dir: PathBuf,
    pub prediction_dir: PathBuf,
    pub train_dir: PathBuf,
    pub log_file: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            training_size: 10,
            testing_size: 50,
            train_fraction: 1.0,
            data_seed: 78456,
            model_seed: 66478,
            batch_size: 16,
            num_epochs: 1,
            restore_model: false,
            recording_step: 0,
            filter_size: 3,
            patch_size: 16,
            border: 0,
            predict_f1: true,
            predict_images: true,
            log_params: true,
            batching: BatchingStrategy::WrapAround,
            foreground: ForegroundScore::Mean,
            foreground_threshold: 0.25,
            learning_rate: 0.001,
            weight_decay: 5e-4,
            data_dir: PathBuf::from("training"),
            test_dir: PathBuf::from("test_set_images"),
            prediction_dir: PathBuf::from("predictions_testing"),
            train_dir: PathBuf::from("/tmp/segment_aerial_images"),
            log_file: PathBuf::from("log_file.txt"),
        }
    }
}

impl RunConfig {
    /// Deserializes a `RunConfig` from a JSON file and validates it.
    pub fn load_json(path: &Path) -> Result<RunConfig> {
        let file = std::fs::File::open(path).map_err(|source| RoadSegError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = std::io::BufReader::new(file);
        let cfg: RunConfig = serde_json::from_reader(reader).map_err(|source| RoadSegError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects settings that would only fail later, after data loading.
    pub fn validate(&self) -> Result<()> {
        if self.patch_size == 0 {
            return Err(config("patch_size must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(config("batch_size must be at least 1"));
        }
        if self.filter_size == 0 || self.filter_size % 2 == 0 {
            return Err(config(format!(
                "filter_size must be odd for same padding, got {}",
                self.filter_size
            )));
        }
        if !(self.train_fraction > 0.0 && self.train_fraction <= 1.0) {
            return Err(config(format!(
                "train_fraction must lie in (0, 1], got {}",
                self.train_fraction
            )));
        }
        if !self.foreground_threshold.is_finite() {
            return Err(config("foreground_threshold must be finite"));
        }
        if !(self.learning_rate > 0.0) {
            return Err(config("learning_rate must be positive"));
        }
        Ok(())
    }

    /// Edge length of a patch including its border context.
    pub fn patch_total(&self) -> usize {
        self.patch_size + 2 * self.border
    }

    /// True when every image is used for training and validation reuses it.
    pub fn no_holdout(&self) -> bool {
        self.train_fraction >= 1.0
    }

    pub fn label_assigner(&self) -> LabelAssigner {
        LabelAssigner::new(self.foreground, self.foreground_threshold)
    }

    pub fn image_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    pub fn groundtruth_dir(&self) -> PathBuf {
        self.data_dir.join("groundtruth")
    }

    /// `test_set_images/test_K/test_K.png` for a 1-based `k`.
    pub fn test_image_path(&self, k: usize) -> PathBuf {
        self.test_dir
            .join(format!("test_{}", k))
            .join(format!("test_{}.png", k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.patch_total(), 16);
        assert!(cfg.no_holdout());
        assert_eq!(cfg.batching, BatchingStrategy::WrapAround);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, r#"{{"border": 2, "train_fraction": 0.8, "batching": "drop_last"}}"#).unwrap();
        drop(f);

        let cfg = RunConfig::load_json(&path).unwrap();
        assert_eq!(cfg.border, 2);
        assert_eq!(cfg.patch_total(), 20);
        assert!(!cfg.no_holdout());
        assert_eq!(cfg.batching, BatchingStrategy::DropLast);
        assert_eq!(cfg.batch_size, 16);
    }

    #[test]
    fn even_filter_size_is_rejected() {
        let cfg = RunConfig { filter_size: 4, ..RunConfig::default() };
        assert!(matches!(cfg.validate(), Err(RoadSegError::Config(_))));
    }

    #[test]
    fn zero_train_fraction_is_rejected() {
        let cfg = RunConfig { train_fraction: 0.0, ..RunConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_image_paths_are_one_based() {
        let cfg = RunConfig::default();
        assert_eq!(
            cfg.test_image_path(3),
            PathBuf::from("test_set_images/test_3/test_3.png")
        );
    }
}
