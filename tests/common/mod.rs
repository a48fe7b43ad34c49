#![allow(dead_code)]

use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use roadseg::RunConfig;

pub const SIDE: u32 = 32;
pub const PATCH: usize = 8;

/// Road occupies patch row 1 and patch column 2 of an 8px grid.
pub fn is_road(x: u32, y: u32) -> bool {
    (8..16).contains(&y) || (16..24).contains(&x)
}

/// Gray asphalt on the roads, textured green elsewhere.
pub fn aerial(seed: u32) -> RgbImage {
    RgbImage::from_fn(SIDE, SIDE, |x, y| {
        let noise = ((x * 7 + y * 13 + seed * 29) % 23) as u8;
        if is_road(x, y) {
            Rgb([120 + noise, 120 + noise, 125 + noise])
        } else {
            Rgb([40 + noise, 110 + noise, 30 + noise])
        }
    })
}

pub fn mask() -> GrayImage {
    GrayImage::from_fn(SIDE, SIDE, |x, y| Luma([if is_road(x, y) { 255 } else { 0 }]))
}

fn save(image: DynamicImage, path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    image.save_with_format(path, image::ImageFormat::Png).unwrap();
}

/// Writes `training/images`, `training/groundtruth` for ids `1..=n_train`
/// and `test_set_images/test_K/test_K.png` for `k` in `test_ids`.
pub fn write_corpus(root: &Path, n_train: usize, test_ids: &[usize]) {
    for id in 1..=n_train {
        let name = format!("satImage_{:03}.png", id);
        save(DynamicImage::ImageRgb8(aerial(id as u32)), &root.join("training/images").join(&name));
        save(DynamicImage::ImageLuma8(mask()), &root.join("training/groundtruth").join(&name));
    }
    for &k in test_ids {
        let path = root.join(format!("test_set_images/test_{k}/test_{k}.png"));
        save(DynamicImage::ImageRgb8(aerial(100 + k as u32)), &path);
    }
}

/// A small, fast run rooted at `root`.
pub fn config(root: &Path, training_size: usize, testing_size: usize) -> RunConfig {
    RunConfig {
        training_size,
        testing_size,
        batch_size: 4,
        num_epochs: 1,
        recording_step: 2,
        patch_size: PATCH,
        data_dir: root.join("training"),
        test_dir: root.join("test_set_images"),
        prediction_dir: root.join("predictions_testing"),
        train_dir: root.join("model"),
        log_file: root.join("log_file.txt"),
        ..RunConfig::default()
    }
}

pub fn prediction_path(root: &Path, k: usize) -> PathBuf {
    root.join(format!("predictions_testing/prediction_{}.png", k))
}
