/// Owned floating-point image, pixels stored row-major as `(y, x, channel)`.
///
/// Satellite images have 3 channels; ground-truth masks and label maps have 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: Vec<f32>,
}

impl Image {
    pub fn new(width: usize, height: usize, channels: usize, data: Vec<f32>) -> Image {
        assert_eq!(
            data.len(),
            width * height * channels,
            "image data does not match {}x{}x{}",
            width,
            height,
            channels
        );
        Image { width, height, channels, data }
    }

    pub fn zeros(width: usize, height: usize, channels: usize) -> Image {
        Image::new(width, height, channels, vec![0.0; width * height * channels])
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, c: usize) -> f32 {
        self.data[(y * self.width + x) * self.channels + c]
    }

    /// Pads every spatial edge by `border` pixels, mirroring the image
    /// including the edge pixel itself (`abc|cba`), never zero-filling.
    pub fn pad_symmetric(&self, border: usize) -> Image {
        if border == 0 {
            return self.clone();
        }
        let (w, h) = (self.width + 2 * border, self.height + 2 * border);
        let mut data = Vec::with_capacity(w * h * self.channels);
        for y in 0..h {
            let sy = reflect(y as isize - border as isize, self.height);
            for x in 0..w {
                let sx = reflect(x as isize - border as isize, self.width);
                let src = (sy * self.width + sx) * self.channels;
                data.extend_from_slice(&self.data[src..src + self.channels]);
            }
        }
        Image::new(w, h, self.channels, data)
    }

    /// Copies the `width × height` window whose top-left corner is `(x0, y0)`.
    pub fn crop(&self, x0: usize, y0: usize, width: usize, height: usize) -> Image {
        assert!(x0 + width <= self.width && y0 + height <= self.height, "crop window out of bounds");
        let mut data = Vec::with_capacity(width * height * self.channels);
        for y in y0..y0 + height {
            let start = (y * self.width + x0) * self.channels;
            data.extend_from_slice(&self.data[start..start + width * self.channels]);
        }
        Image::new(width, height, self.channels, data)
    }

    pub fn sum(&self) -> f32 {
        self.data.iter().map(|&v| v as f64).sum::<f64>() as f32
    }

    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.sum() / self.data.len() as f32
    }
}

/// Maps an out-of-range index back into `0..n` by mirror reflection that
/// repeats the edge sample, with period `2n`.
fn reflect(i: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let pos = i.rem_euclid(period);
    if pos >= n as isize {
        (period - 1 - pos) as usize
    } else {
        pos as usize
    }
}
