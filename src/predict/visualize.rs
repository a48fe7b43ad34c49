use image::{Rgb, RgbImage, Rgba, RgbaImage};

use crate::data::image::Image;
use crate::error::{shape, Result};
use crate::predict::reconstruct::LabelMap;

/// Opacity of the red prediction layer in `overlay`.
pub const OVERLAY_ALPHA: f32 = 0.2;

/// Min-max rescales `values` onto 0..=255 with rounding. A constant input
/// maps to all zeros.
pub fn float_to_u8(values: &[f32]) -> Vec<u8> {
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if range.is_nan() || range <= 0.0 {
        return vec![0; values.len()];
    }
    values
        .iter()
        .map(|&v| ((v - min) / range * 255.0).round() as u8)
        .collect()
}

/// 8-bit RGB rendering of a float image. Single-channel images are
/// replicated across the three channels.
pub fn image_to_rgb8(image: &Image) -> Result<RgbImage> {
    let bytes = float_to_u8(&image.data);
    let c = image.channels;
    if c != 1 && c != 3 {
        return Err(shape(format!("cannot render a {}-channel image as RGB", c)));
    }
    Ok(RgbImage::from_fn(image.width as u32, image.height as u32, |x, y| {
        let base = (y as usize * image.width + x as usize) * c;
        if c == 3 {
            Rgb([bytes[base], bytes[base + 1], bytes[base + 2]])
        } else {
            Rgb([bytes[base]; 3])
        }
    }))
}

fn check_dims(image: &Image, map: &LabelMap) -> Result<()> {
    if image.width != map.width || image.height != map.height {
        return Err(shape(format!(
            "image is {}x{} but label map is {}x{}",
            image.width, image.height, map.width, map.height
        )));
    }
    Ok(())
}

/// Blends a red road mask over the image at `OVERLAY_ALPHA` opacity.
pub fn overlay(image: &Image, map: &LabelMap) -> Result<RgbaImage> {
    check_dims(image, map)?;
    let background = image_to_rgb8(image)?;
    let blend = |under: u8, over: u8| {
        (under as f32 * (1.0 - OVERLAY_ALPHA) + over as f32 * OVERLAY_ALPHA).round() as u8
    };
    Ok(RgbaImage::from_fn(background.width(), background.height(), |x, y| {
        let Rgb([r, g, b]) = *background.get_pixel(x, y);
        let red = map.get(x as usize, y as usize) * 255;
        Rgba([blend(r, red), blend(g, 0), blend(b, 0), 255])
    }))
}

/// The image on the left, the label map as grayscale on the right.
pub fn concatenate(image: &Image, map: &LabelMap) -> Result<RgbImage> {
    check_dims(image, map)?;
    let left = image_to_rgb8(image)?;
    let w = left.width();
    Ok(RgbImage::from_fn(w * 2, left.height(), |x, y| {
        if x < w {
            *left.get_pixel(x, y)
        } else {
            Rgb([map.get((x - w) as usize, y as usize) * 255; 3])
        }
    }))
}
