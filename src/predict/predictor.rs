use image::{RgbImage, RgbaImage};

use crate::data::image::Image;
use crate::data::normalize::normalize_per_channel;
use crate::data::patches::extract_patches;
use crate::error::{shape, Result};
use crate::eval::metrics::predict_labels;
use crate::math::matrix::Matrix;
use crate::math::tensor::Tensor;
use crate::network::RoadNet;
use crate::predict::reconstruct::LabelMap;
use crate::predict::visualize::{concatenate, overlay};

/// Patches scored per forward pass during image prediction.
const PREDICT_CHUNK: usize = 256;

/// A trained network plus the patch geometry it expects.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    network: RoadNet,
    patch_size: usize,
    border: usize,
}

impl TrainedModel {
    pub fn new(network: RoadNet, patch_size: usize, border: usize) -> Result<TrainedModel> {
        if network.geometry.patch_total != patch_size + 2 * border {
            return Err(shape(format!(
                "network expects {}px inputs, patch {} with border {} gives {}px",
                network.geometry.patch_total,
                patch_size,
                border,
                patch_size + 2 * border
            )));
        }
        Ok(TrainedModel { network, patch_size, border })
    }

    pub fn network(&self) -> &RoadNet {
        &self.network
    }

    pub fn patch_size(&self) -> usize {
        self.patch_size
    }

    /// Softmax probabilities for an already normalized batch of patches.
    pub fn predict(&self, batch: &Tensor) -> Result<Matrix> {
        self.network.check_input(batch)?;
        Ok(self.network.predict_probabilities(batch))
    }

    /// Classifies every patch of `image` and paints the result back onto a
    /// label map of the same size.
    ///
    /// The patches are normalized with statistics of this image alone, not
    /// with those of the training split.
    pub fn predict_image(&self, image: &Image) -> Result<LabelMap> {
        let mut batch = extract_patches(image, self.patch_size, self.border)?.into_tensor();
        normalize_per_channel(&mut batch)?;
        self.network.check_input(&batch)?;
        let labels = predict_labels(&self.network, &batch, PREDICT_CHUNK);
        LabelMap::from_patch_labels(image.width, image.height, self.patch_size, &labels)
    }

    /// Predicted roads blended in red over `image`.
    pub fn predict_with_overlay(&self, image: &Image) -> Result<RgbaImage> {
        let map = self.predict_image(image)?;
        overlay(image, &map)
    }

    /// `image` and its predicted label map side by side.
    pub fn predict_with_groundtruth(&self, image: &Image) -> Result<RgbImage> {
        let map = self.predict_image(image)?;
        concatenate(image, &map)
    }
}
