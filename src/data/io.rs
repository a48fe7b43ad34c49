//! PNG reading and writing for the aerial corpus.
//!
//! - `load_rgb` / `load_mask`: decode a file into an `Image` with values in [0, 1].
//! - `load_if_present`: same, but a missing file is logged and reported as `None`.
//! - `save_png`: encode a `DynamicImage`, mapping codec errors to `RoadSegError`.
use std::path::{Path, PathBuf};

use image::DynamicImage;
use log::{debug, warn};

use crate::data::image::Image;
use crate::error::{Result, RoadSegError};

/// File stem of the 1-based training image `i`, e.g. `satImage_007`.
pub fn satellite_image_id(i: usize) -> String {
    format!("satImage_{:03}", i)
}

pub fn satellite_image_path(dir: &Path, i: usize) -> PathBuf {
    dir.join(format!("{}.png", satellite_image_id(i)))
}

fn open(path: &Path) -> Result<DynamicImage> {
    debug!("Loading {}", path.display());
    image::open(path).map_err(|source| RoadSegError::Image {
        path: path.to_path_buf(),
        source,
    })
}

/// Decodes an image as 3-channel RGB; alpha is dropped.
pub fn load_rgb(path: &Path) -> Result<Image> {
    let rgb = open(path)?.into_rgb32f();
    let (w, h) = rgb.dimensions();
    Ok(Image::new(w as usize, h as usize, 3, rgb.into_raw()))
}

/// Decodes a ground-truth mask as a single intensity channel.
pub fn load_mask(path: &Path) -> Result<Image> {
    let luma = open(path)?.into_luma16();
    let (w, h) = luma.dimensions();
    let data = luma.into_raw().into_iter().map(|v| v as f32 / u16::MAX as f32).collect();
    Ok(Image::new(w as usize, h as usize, 1, data))
}

/// Runs `loader` only when `path` is a file; otherwise logs and returns `None`.
pub fn load_if_present(path: &Path, loader: fn(&Path) -> Result<Image>) -> Result<Option<Image>> {
    if path.is_file() {
        loader(path).map(Some)
    } else {
        warn!("File {} does not exist", path.display());
        Ok(None)
    }
}

pub fn save_png(image: &DynamicImage, path: &Path) -> Result<()> {
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|source| RoadSegError::Image {
            path: path.to_path_buf(),
            source,
        })
}
