use serde::{Serialize, Deserialize};

use crate::config::RunConfig;
use crate::error::{shape, Result};

/// Input geometry the network is built for.
///
/// The layer widths are fixed; only the patch side, channel count and
/// filter size vary. Stored in every checkpoint so a restore can refuse
/// weights trained for a different geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelGeometry {
    /// Input channels (3 for RGB patches).
    pub channels: usize,
    /// Patch side including border context.
    pub patch_total: usize,
    /// Convolution kernel side; odd.
    pub filter_size: usize,
}

impl ModelGeometry {
    pub const NUM_LABELS: usize = 2;
    pub const CONV1_DEPTH: usize = 32;
    pub const CONV2_DEPTH: usize = 64;
    pub const HIDDEN: usize = 512;
    /// Number of 2x2 pooling stages.
    pub const POOL_LAYERS: u32 = 2;

    pub fn from_config(cfg: &RunConfig) -> ModelGeometry {
        ModelGeometry {
            channels: 3,
            patch_total: cfg.patch_total(),
            filter_size: cfg.filter_size,
        }
    }

    /// The hidden layer is sized for `patch_total / 4` after two pooling
    /// stages, so the patch side must divide evenly by 4.
    pub fn validate(&self) -> Result<()> {
        let reduction = 2usize.pow(Self::POOL_LAYERS);
        if self.patch_total == 0 || self.patch_total % reduction != 0 {
            return Err(shape(format!(
                "patch side {} (patch + 2*border) must be a positive multiple of {}",
                self.patch_total, reduction
            )));
        }
        if self.filter_size == 0 || self.filter_size % 2 == 0 {
            return Err(shape(format!("filter size {} must be odd", self.filter_size)));
        }
        if self.channels == 0 {
            return Err(shape("model needs at least one input channel"));
        }
        Ok(())
    }

    /// Side length after both pooling stages.
    pub fn pooled_side(&self) -> usize {
        self.patch_total / 2usize.pow(Self::POOL_LAYERS)
    }

    pub fn fc_input_size(&self) -> usize {
        Self::CONV2_DEPTH * self.pooled_side() * self.pooled_side()
    }

    /// Shape of one input sample, `[height, width, channels]`.
    pub fn sample_shape(&self) -> [usize; 3] {
        [self.patch_total, self.patch_total, self.channels]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RoadSegError;

    #[test]
    fn default_patch_flattens_to_1024() {
        let g = ModelGeometry { channels: 3, patch_total: 16, filter_size: 3 };
        g.validate().unwrap();
        assert_eq!(g.pooled_side(), 4);
        assert_eq!(g.fc_input_size(), 64 * 16);
    }

    #[test]
    fn border_that_breaks_pooling_is_rejected_up_front() {
        // 16 + 2*1 = 18 is not divisible by 4.
        let g = ModelGeometry { channels: 3, patch_total: 18, filter_size: 3 };
        assert!(matches!(g.validate(), Err(RoadSegError::Shape(_))));
    }
}
