use serde::{Deserialize, Serialize};

/// Batch of images in NHWC layout: `shape = [batch, height, width, channels]`.
///
/// Flattening one sample gives `(y, x, c)` row-major order, which is the
/// order the fully-connected layer consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub shape: [usize; 4],
    pub data: Vec<f32>,
}

impl Tensor {
    pub fn zeros(shape: [usize; 4]) -> Tensor {
        Tensor {
            shape,
            data: vec![0.0; shape.iter().product()],
        }
    }

    pub fn from_data(shape: [usize; 4], data: Vec<f32>) -> Tensor {
        assert_eq!(
            data.len(),
            shape.iter().product::<usize>(),
            "tensor data does not match shape {:?}",
            shape
        );
        Tensor { shape, data }
    }

    pub fn batch(&self) -> usize {
        self.shape[0]
    }

    pub fn height(&self) -> usize {
        self.shape[1]
    }

    pub fn width(&self) -> usize {
        self.shape[2]
    }

    pub fn channels(&self) -> usize {
        self.shape[3]
    }

    /// Number of values in one sample.
    pub fn sample_len(&self) -> usize {
        self.shape[1] * self.shape[2] * self.shape[3]
    }

    pub fn sample(&self, i: usize) -> &[f32] {
        let len = self.sample_len();
        &self.data[i * len..(i + 1) * len]
    }

    #[inline]
    pub fn offset(&self, n: usize, y: usize, x: usize, c: usize) -> usize {
        ((n * self.shape[1] + y) * self.shape[2] + x) * self.shape[3] + c
    }

    /// Copies the samples at `indices` (in that order) into a new batch.
    pub fn gather(&self, indices: &[usize]) -> Tensor {
        let len = self.sample_len();
        let mut data = Vec::with_capacity(indices.len() * len);
        for &i in indices {
            data.extend_from_slice(self.sample(i));
        }
        Tensor {
            shape: [indices.len(), self.shape[1], self.shape[2], self.shape[3]],
            data,
        }
    }
}
