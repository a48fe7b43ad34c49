use std::path::Path;

use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::RunConfig;
use crate::data::balance::class_counts;
use crate::data::image::Image;
use crate::data::io::{load_if_present, load_mask, load_rgb, satellite_image_path};
use crate::data::labels::{Label, LabelAssigner};
use crate::data::normalize::normalize_per_channel;
use crate::data::patches::extract_patches;
use crate::error::{shape, Result, RoadSegError};
use crate::math::tensor::Tensor;

/// Satellite image and its ground-truth mask, keyed by 1-based id.
#[derive(Debug, Clone)]
pub struct ImagePair {
    pub id: usize,
    pub image: Image,
    pub mask: Image,
}

/// Normalized patches with one label each, in image-then-grid order.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub patches: Tensor,
    pub labels: Vec<Label>,
    /// Ids of the source images, in the order their patches appear.
    pub image_ids: Vec<usize>,
}

impl Split {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `(background, road)` counts.
    pub fn class_counts(&self) -> (usize, usize) {
        class_counts(&self.labels)
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub train: Split,
    pub validation: Split,
    /// Set when every image went to training; `validation` is then a copy
    /// of `train` and validation accuracy is only a proxy.
    pub no_holdout: bool,
}

/// Inputs of the dataset builder that do not come from the filesystem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetOptions {
    pub n_images: usize,
    pub train_fraction: f64,
    pub patch_size: usize,
    pub border: usize,
    pub seed: u64,
    pub assigner: LabelAssigner,
}

impl DatasetOptions {
    pub fn from_config(cfg: &RunConfig) -> DatasetOptions {
        DatasetOptions {
            n_images: cfg.training_size,
            train_fraction: cfg.train_fraction,
            patch_size: cfg.patch_size,
            border: cfg.border,
            seed: cfg.data_seed,
            assigner: cfg.label_assigner(),
        }
    }
}

/// Image indices for each side of the split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
    pub no_holdout: bool,
}

/// Draws one seeded permutation of `0..n` and cuts it at
/// `floor(n * train_fraction)`. With `train_fraction >= 1` the validation
/// side repeats the training indices.
pub fn split_indices(n: usize, train_fraction: f64, seed: u64) -> SplitPlan {
    let mut perm: Vec<usize> = (0..n).collect();
    perm.shuffle(&mut StdRng::seed_from_u64(seed));

    if train_fraction >= 1.0 {
        return SplitPlan {
            validation: perm.clone(),
            train: perm,
            no_holdout: true,
        };
    }
    let cut = ((n as f64) * train_fraction).floor() as usize;
    let validation = perm.split_off(cut);
    SplitPlan {
        train: perm,
        validation,
        no_holdout: false,
    }
}

/// Loads `satImage_001..=n_images` from both directories. A pair with a
/// missing image or mask is logged and skipped; decode errors are fatal.
pub fn load_pairs(image_dir: &Path, mask_dir: &Path, n_images: usize) -> Result<Vec<ImagePair>> {
    let mut pairs = Vec::with_capacity(n_images);
    for id in 1..=n_images {
        let image = load_if_present(&satellite_image_path(image_dir, id), load_rgb)?;
        let mask = load_if_present(&satellite_image_path(mask_dir, id), load_mask)?;
        if let (Some(image), Some(mask)) = (image, mask) {
            pairs.push(ImagePair { id, image, mask });
        }
    }
    info!("Loaded {} of {} training image pairs", pairs.len(), n_images);
    Ok(pairs)
}

/// Full dataset construction from the training directory layout.
pub fn build(image_dir: &Path, mask_dir: &Path, opts: &DatasetOptions) -> Result<Dataset> {
    let pairs = load_pairs(image_dir, mask_dir, opts.n_images)?;
    from_pairs(&pairs, opts)
}

/// Splits already-loaded pairs, extracts and normalizes patches, and labels
/// them from the mask cores.
pub fn from_pairs(pairs: &[ImagePair], opts: &DatasetOptions) -> Result<Dataset> {
    if pairs.is_empty() {
        return Err(RoadSegError::EmptyDataset("no training images could be loaded".into()));
    }
    let plan = split_indices(pairs.len(), opts.train_fraction, opts.seed);
    if plan.train.is_empty() {
        return Err(RoadSegError::EmptyDataset(format!(
            "train_fraction {} leaves no training image out of {}",
            opts.train_fraction,
            pairs.len()
        )));
    }

    let train = build_split(pairs, &plan.train, opts)?;
    let validation = if plan.no_holdout {
        train.clone()
    } else {
        build_split(pairs, &plan.validation, opts)?
    };

    Ok(Dataset {
        train,
        validation,
        no_holdout: plan.no_holdout,
    })
}

fn build_split(pairs: &[ImagePair], indices: &[usize], opts: &DatasetOptions) -> Result<Split> {
    let side = opts.patch_size + 2 * opts.border;
    let mut data = Vec::new();
    let mut labels = Vec::new();
    let mut image_ids = Vec::with_capacity(indices.len());
    let mut channels = None;

    for &i in indices {
        let pair = &pairs[i];
        if (pair.image.width, pair.image.height) != (pair.mask.width, pair.mask.height) {
            return Err(shape(format!(
                "image {} is {}x{} but its mask is {}x{}",
                pair.id, pair.image.width, pair.image.height, pair.mask.width, pair.mask.height
            )));
        }
        match channels {
            None => channels = Some(pair.image.channels),
            Some(c) if c != pair.image.channels => {
                return Err(shape(format!(
                    "image {} has {} channels, expected {}",
                    pair.id, pair.image.channels, c
                )))
            }
            Some(_) => {}
        }

        let before = labels.len();
        let mut n_patches = 0;
        for patch in extract_patches(&pair.image, opts.patch_size, opts.border)? {
            data.extend_from_slice(&patch.pixels.data);
            n_patches += 1;
        }
        // Labels always come from the mask core, never from border context.
        labels.extend(extract_patches(&pair.mask, opts.patch_size, 0)?.map(|p| opts.assigner.assign(&p.pixels)));
        if labels.len() - before != n_patches {
            return Err(RoadSegError::LabelMismatch {
                patches: n_patches,
                labels: labels.len() - before,
            });
        }
        image_ids.push(pair.id);
    }

    let channels = channels.unwrap_or(3);
    let mut patches = Tensor::from_data([labels.len(), side, side, channels], data);
    normalize_per_channel(&mut patches)?;
    Ok(Split { patches, labels, image_ids })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 8x8 RGB image whose left half is a road in the mask.
    fn pair(id: usize) -> ImagePair {
        let image_data = (0..8 * 8 * 3).map(|v| ((v * 13 + id * 7) % 17) as f32 / 17.0).collect();
        let mask_data = (0..64).map(|i| if i % 8 < 4 { 1.0 } else { 0.0 }).collect();
        ImagePair {
            id,
            image: Image::new(8, 8, 3, image_data),
            mask: Image::new(8, 8, 1, mask_data),
        }
    }

    fn opts(n: usize, train_fraction: f64) -> DatasetOptions {
        DatasetOptions {
            n_images: n,
            train_fraction,
            patch_size: 4,
            border: 0,
            seed: 78456,
            assigner: LabelAssigner::default(),
        }
    }

    #[test]
    fn eighty_twenty_split_is_disjoint() {
        let plan = split_indices(10, 0.8, 1);
        assert_eq!(plan.train.len(), 8);
        assert_eq!(plan.validation.len(), 2);
        assert!(!plan.no_holdout);
        assert!(plan.validation.iter().all(|v| !plan.train.contains(v)));
    }

    #[test]
    fn full_fraction_reuses_training_images() {
        let pairs: Vec<ImagePair> = (1..=3).map(pair).collect();
        let ds = from_pairs(&pairs, &opts(3, 1.0)).unwrap();
        assert!(ds.no_holdout);
        assert_eq!(ds.train, ds.validation);
        assert_eq!(ds.train.len(), 3 * 4);
    }

    #[test]
    fn holdout_images_never_appear_in_training() {
        let pairs: Vec<ImagePair> = (1..=10).map(pair).collect();
        let ds = from_pairs(&pairs, &opts(10, 0.8)).unwrap();
        assert_eq!(ds.train.image_ids.len(), 8);
        assert_eq!(ds.validation.image_ids.len(), 2);
        assert!(ds.validation.image_ids.iter().all(|id| !ds.train.image_ids.contains(id)));
        assert_eq!(ds.train.patches.shape, [32, 4, 4, 3]);
    }

    #[test]
    fn labels_follow_mask_grid() {
        let pairs = vec![pair(1)];
        let ds = from_pairs(&pairs, &opts(1, 1.0)).unwrap();
        assert_eq!(ds.train.labels, vec![Label::Road, Label::Background, Label::Road, Label::Background]);
    }

    #[test]
    fn border_widens_patches_but_not_labels() {
        let pairs = vec![pair(1)];
        let o = DatasetOptions { border: 2, ..opts(1, 1.0) };
        let ds = from_pairs(&pairs, &o).unwrap();
        assert_eq!(ds.train.patches.shape, [4, 8, 8, 3]);
        assert_eq!(ds.train.class_counts(), (2, 2));
    }

    #[test]
    fn same_seed_same_split() {
        assert_eq!(split_indices(20, 0.5, 9), split_indices(20, 0.5, 9));
    }

    #[test]
    fn mismatched_mask_is_a_shape_error() {
        let mut p = pair(1);
        p.mask = Image::zeros(4, 4, 1);
        assert!(matches!(from_pairs(&[p], &opts(1, 1.0)), Err(RoadSegError::Shape(_))));
    }
}
