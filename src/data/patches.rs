use std::borrow::Cow;

use crate::data::image::Image;
use crate::error::{shape, Result};
use crate::math::tensor::Tensor;

/// One square patch cut from an image.
///
/// `row`/`col` are the pixel offsets of the patch core in the unpadded
/// image; both are multiples of the patch size. `pixels` is the core plus
/// `border` context pixels on every side.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub row: usize,
    pub col: usize,
    pub pixels: Image,
}

/// Lazy row-major walk over the patch grid of one image.
///
/// Cloning copies the current position, so a clone taken before iterating
/// replays the exact same sequence.
#[derive(Debug, Clone)]
pub struct Patches<'a> {
    source: Cow<'a, Image>,
    patch_size: usize,
    border: usize,
    grid_rows: usize,
    grid_cols: usize,
    next: usize,
}

/// Number of patch rows and columns for an image, or a shape error when
/// either dimension is not a multiple of `patch_size`.
pub fn grid_dims(width: usize, height: usize, patch_size: usize) -> Result<(usize, usize)> {
    if patch_size == 0 {
        return Err(shape("patch size must be at least 1"));
    }
    if width % patch_size != 0 || height % patch_size != 0 {
        return Err(shape(format!(
            "image {}x{} is not a multiple of patch size {}",
            width, height, patch_size
        )));
    }
    Ok((height / patch_size, width / patch_size))
}

/// Slices `image` into `patch_size` squares, scanning rows top to bottom and
/// columns left to right. The grid advances by `patch_size`, so with a
/// border the bordered views of neighbours overlap while their cores do not.
pub fn extract_patches(image: &Image, patch_size: usize, border: usize) -> Result<Patches<'_>> {
    let (grid_rows, grid_cols) = grid_dims(image.width, image.height, patch_size)?;
    let source = if border == 0 {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(image.pad_symmetric(border))
    };
    Ok(Patches {
        source,
        patch_size,
        border,
        grid_rows,
        grid_cols,
        next: 0,
    })
}

impl<'a> Patches<'a> {
    /// Edge length of every yielded patch.
    pub fn patch_total(&self) -> usize {
        self.patch_size + 2 * self.border
    }

    pub fn channels(&self) -> usize {
        self.source.channels
    }

    /// Collects the remaining patches into one NHWC batch.
    pub fn into_tensor(self) -> Tensor {
        let side = self.patch_total();
        let channels = self.channels();
        let mut data = Vec::with_capacity(self.len() * side * side * channels);
        let mut count = 0;
        for patch in self {
            data.extend_from_slice(&patch.pixels.data);
            count += 1;
        }
        Tensor::from_data([count, side, side, channels], data)
    }
}

impl<'a> Iterator for Patches<'a> {
    type Item = Patch;

    fn next(&mut self) -> Option<Patch> {
        if self.next >= self.grid_rows * self.grid_cols {
            return None;
        }
        let row = (self.next / self.grid_cols) * self.patch_size;
        let col = (self.next % self.grid_cols) * self.patch_size;
        self.next += 1;

        // In padded coordinates the bordered window starts at the core offset.
        let side = self.patch_total();
        let pixels = self.source.crop(col, row, side, side);
        Some(Patch { row, col, pixels })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.grid_rows * self.grid_cols - self.next;
        (left, Some(left))
    }
}

impl<'a> ExactSizeIterator for Patches<'a> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RoadSegError;

    fn ramp(width: usize, height: usize, channels: usize) -> Image {
        let data = (0..width * height * channels).map(|v| v as f32).collect();
        Image::new(width, height, channels, data)
    }

    #[test]
    fn patch_count_and_size_follow_grid() {
        let img = ramp(8, 12, 3);
        let patches: Vec<Patch> = extract_patches(&img, 4, 0).unwrap().collect();
        assert_eq!(patches.len(), (8 / 4) * (12 / 4));
        assert!(patches.iter().all(|p| p.pixels.width == 4 && p.pixels.height == 4 && p.pixels.channels == 3));

        let bordered: Vec<Patch> = extract_patches(&img, 4, 2).unwrap().collect();
        assert_eq!(bordered.len(), 6);
        assert!(bordered.iter().all(|p| p.pixels.width == 8 && p.pixels.height == 8));
    }

    #[test]
    fn scan_is_row_major() {
        let img = ramp(4, 4, 1);
        let coords: Vec<(usize, usize)> = extract_patches(&img, 2, 0).unwrap().map(|p| (p.row, p.col)).collect();
        assert_eq!(coords, vec![(0, 0), (0, 2), (2, 0), (2, 2)]);

        let second = extract_patches(&img, 2, 0).unwrap().nth(1).unwrap();
        assert_eq!(second.pixels.data, vec![2.0, 3.0, 6.0, 7.0]);
    }

    #[test]
    fn bordered_patch_core_matches_unbordered_patch() {
        let img = ramp(6, 6, 1);
        let plain: Vec<Patch> = extract_patches(&img, 3, 0).unwrap().collect();
        let bordered: Vec<Patch> = extract_patches(&img, 3, 1).unwrap().collect();
        for (p, b) in plain.iter().zip(&bordered) {
            assert_eq!(b.pixels.crop(1, 1, 3, 3), p.pixels);
        }
        // Top-left patch's border mirrors the image's own edge.
        assert_eq!(bordered[0].pixels.get(0, 0, 0), img.get(0, 0, 0));
        assert_eq!(bordered[0].pixels.get(0, 1, 0), img.get(0, 0, 0));
    }

    #[test]
    fn non_multiple_dimensions_are_rejected() {
        let img = ramp(10, 8, 1);
        assert!(matches!(extract_patches(&img, 4, 0), Err(RoadSegError::Shape(_))));
    }

    #[test]
    fn sequence_is_restartable() {
        let img = ramp(4, 4, 1);
        let walk = extract_patches(&img, 2, 1).unwrap();
        let first: Vec<Patch> = walk.clone().collect();
        let again: Vec<Patch> = walk.collect();
        assert_eq!(first, again);
    }

    #[test]
    fn into_tensor_stacks_in_scan_order() {
        let img = ramp(4, 2, 1);
        let t = extract_patches(&img, 2, 0).unwrap().into_tensor();
        assert_eq!(t.shape, [2, 2, 2, 1]);
        assert_eq!(t.sample(1), &[2.0, 3.0, 6.0, 7.0]);
    }
}
