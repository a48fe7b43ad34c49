use image::{GrayImage, Luma};

use crate::data::labels::Label;
use crate::data::patches::grid_dims;
use crate::error::{Result, RoadSegError};
use crate::math::matrix::Matrix;

/// Pixel-level label map: every pixel of a patch carries that patch's label.
/// Values are 0 for background and 1 for road, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl LabelMap {
    /// Paints `labels`, given in patch scan order (rows top to bottom,
    /// columns left to right), back onto a `width × height` canvas.
    pub fn from_patch_labels(
        width: usize,
        height: usize,
        patch_size: usize,
        labels: &[Label],
    ) -> Result<LabelMap> {
        let (rows, cols) = grid_dims(width, height, patch_size)?;
        if labels.len() != rows * cols {
            return Err(RoadSegError::LabelMismatch {
                patches: rows * cols,
                labels: labels.len(),
            });
        }
        let mut data = vec![0u8; width * height];
        for (idx, label) in labels.iter().enumerate() {
            if *label == Label::Background {
                continue;
            }
            let y0 = (idx / cols) * patch_size;
            let x0 = (idx % cols) * patch_size;
            for y in y0..y0 + patch_size {
                data[y * width + x0..y * width + x0 + patch_size].fill(1);
            }
        }
        Ok(LabelMap { width, height, data })
    }

    /// Same as `from_patch_labels`, from a `patches × 2` probability matrix.
    pub fn from_probabilities(
        width: usize,
        height: usize,
        patch_size: usize,
        probs: &Matrix,
    ) -> Result<LabelMap> {
        let labels: Vec<Label> = (0..probs.rows)
            .map(|r| Label::from_probabilities(probs.row(r)))
            .collect();
        LabelMap::from_patch_labels(width, height, patch_size, &labels)
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// Share of pixels labelled road.
    pub fn road_fraction(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&v| v as usize).sum::<usize>() as f32 / self.data.len() as f32
    }

    /// Road pixels white, background black.
    pub fn to_gray(&self) -> GrayImage {
        GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            Luma([self.get(x as usize, y as usize) * 255])
        })
    }
}
