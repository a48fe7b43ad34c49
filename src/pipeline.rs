//! End-to-end run: dataset → balance → train or restore → F1 → test
//! predictions → run log.
use std::path::PathBuf;

use image::{DynamicImage, RgbImage};
use log::{info, warn};

use crate::config::RunConfig;
use crate::data::balance::{balance_classes, class_counts};
use crate::data::dataset::{self, Dataset, DatasetOptions, Split};
use crate::data::io::{load_if_present, load_rgb, satellite_image_path, save_png};
use crate::error::{Result, RoadSegError};
use crate::eval::metrics::{predict_labels, ConfusionCounts, F1Score};
use crate::network::{ModelGeometry, RoadNet};
use crate::predict::TrainedModel;
use crate::report::RunLog;
use crate::train::{JsonCheckpointStore, TrainConfig, Trainer, TrainingReport};

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Empty when the model was restored.
    pub training: TrainingReport,
    pub f1: Option<F1Score>,
    /// `prediction_K.png` files written.
    pub predictions: Vec<PathBuf>,
    pub log: RunLog,
}

/// Executes one full run as configured.
pub fn run(cfg: &RunConfig) -> Result<RunSummary> {
    cfg.validate()?;
    let geometry = ModelGeometry::from_config(cfg);
    geometry.validate()?;

    info!("Building dataset from {}", cfg.data_dir.display());
    let data = dataset::build(&cfg.image_dir(), &cfg.groundtruth_dir(), &DatasetOptions::from_config(cfg))?;
    let train = balanced_train(&data)?;

    let store = JsonCheckpointStore::new(&cfg.train_dir);
    let train_config = TrainConfig::from_run(cfg);
    let (network, training) = if cfg.restore_model {
        let trainer = Trainer::restore(&store, &geometry, train_config)?;
        (trainer.finish(), TrainingReport::default())
    } else {
        let mut trainer = Trainer::new(RoadNet::new(geometry, cfg.model_seed)?, train_config);
        let report = trainer.train(&train, &data.validation, &store)?;
        (trainer.finish(), report)
    };
    let model = TrainedModel::new(network, cfg.patch_size, cfg.border)?;

    let mut log = RunLog::new();
    log.push_list("Average_acc_train", &training.train_accuracies());
    log.push_list("Average_acc_test", &training.val_accuracies());
    log.push("Batch_size", cfg.batch_size);
    log.push("N_epochs", cfg.num_epochs);
    log.push("Filter_size", cfg.filter_size);
    log.push("Img_patch_size", cfg.patch_size);
    log.push("Border", cfg.border);

    let f1 = if cfg.predict_f1 {
        let score = validation_f1(&model, &data.validation, cfg.batch_size);
        match score {
            F1Score::Defined(v) => {
                info!("F1 score on validation set = {:.4}", v);
                log.push("f1", v);
            }
            F1Score::Undefined(reason) => warn!("F1 score on validation set is undefined: {}", reason),
        }
        Some(score)
    } else {
        None
    };

    let predictions = if cfg.predict_images {
        predict_test_images(cfg, &model)?
    } else {
        Vec::new()
    };

    if cfg.log_params {
        log.append_to(&cfg.log_file)?;
        info!("Run parameters appended to {}", cfg.log_file.display());
    }

    Ok(RunSummary { training, f1, predictions, log })
}

/// Logs the class counts of the training split and returns it balanced.
pub fn balanced_train(data: &Dataset) -> Result<Split> {
    let (c0, c1) = data.train.class_counts();
    info!("Number of data points per class: c0 = {} c1 = {}", c0, c1);
    info!("Balancing training data...");
    let (patches, labels) = balance_classes(&data.train.patches, &data.train.labels)?;
    let (c0, c1) = class_counts(&labels);
    info!("Number of data points per class: c0 = {} c1 = {}", c0, c1);
    if labels.is_empty() {
        return Err(RoadSegError::EmptyDataset(
            "balancing left no training patches; one class is absent".into(),
        ));
    }
    Ok(Split {
        patches,
        labels,
        image_ids: data.train.image_ids.clone(),
    })
}

/// Road-class F1 of `model` over the whole validation split.
pub fn validation_f1(model: &TrainedModel, validation: &Split, batch_size: usize) -> F1Score {
    let predicted = predict_labels(model.network(), &validation.patches, batch_size);
    ConfusionCounts::from_labels(&predicted, &validation.labels).f1()
}

/// Writes `prediction_K.png` and `overlay_K.png` for every test image that
/// exists. Returns the prediction paths written.
pub fn predict_test_images(cfg: &RunConfig, model: &TrainedModel) -> Result<Vec<PathBuf>> {
    info!("Running prediction on test set");
    std::fs::create_dir_all(&cfg.prediction_dir).map_err(|source| RoadSegError::Io {
        path: cfg.prediction_dir.clone(),
        source,
    })?;

    let mut written = Vec::new();
    for k in 1..=cfg.testing_size {
        let image = match load_if_present(&cfg.test_image_path(k), load_rgb)? {
            Some(image) => image,
            None => continue,
        };
        let map = model.predict_image(&image)?;

        let prediction_path = cfg.prediction_dir.join(format!("prediction_{}.png", k));
        save_png(&DynamicImage::ImageLuma8(map.to_gray()), &prediction_path)?;
        let overlay = crate::predict::overlay(&image, &map)?;
        save_png(
            &DynamicImage::ImageRgba8(overlay),
            &cfg.prediction_dir.join(format!("overlay_{}.png", k)),
        )?;
        info!("Generated image prediction_{}.png", k);
        written.push(prediction_path);
    }
    Ok(written)
}

/// Training image `id` next to its predicted label map, or `None` if the
/// image file is missing.
pub fn predict_training_image(
    cfg: &RunConfig,
    model: &TrainedModel,
    id: usize,
) -> Result<Option<RgbImage>> {
    match load_if_present(&satellite_image_path(&cfg.image_dir(), id), load_rgb)? {
        Some(image) => model.predict_with_groundtruth(&image).map(Some),
        None => Ok(None),
    }
}
