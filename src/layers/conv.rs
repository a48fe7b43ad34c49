use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::math::init::truncated_normal;
use crate::math::tensor::Tensor;

/// 2-D convolution, stride 1, zero "same" padding.
///
/// Weights are stored `[ky][kx][in_channel][out_channel]`, so the
/// `out_channels` values for one (tap, input channel) pair are contiguous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conv2d {
    pub kernel: usize,
    pub in_channels: usize,
    pub out_channels: usize,
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct ConvGrads {
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

impl Conv2d {
    pub fn new<R: Rng + ?Sized>(
        kernel: usize,
        in_channels: usize,
        out_channels: usize,
        bias_init: f32,
        rng: &mut R,
    ) -> Conv2d {
        let len = kernel * kernel * in_channels * out_channels;
        Conv2d {
            kernel,
            in_channels,
            out_channels,
            weights: truncated_normal(len, 0.1, rng),
            biases: vec![bias_init; out_channels],
        }
    }

    /// Pre-activation output, same spatial size as `input`.
    pub fn forward(&self, input: &Tensor) -> Tensor {
        let [n, h, w, c] = input.shape;
        assert_eq!(c, self.in_channels, "conv input has {} channels, expected {}", c, self.in_channels);
        let (k, co) = (self.kernel, self.out_channels);
        let pad = (k / 2) as isize;
        let mut out = Tensor::zeros([n, h, w, co]);

        for b in 0..n {
            for y in 0..h {
                for x in 0..w {
                    let o = out.offset(b, y, x, 0);
                    let dst = &mut out.data[o..o + co];
                    dst.copy_from_slice(&self.biases);
                    for ky in 0..k {
                        let iy = y as isize + ky as isize - pad;
                        if iy < 0 || iy >= h as isize {
                            continue;
                        }
                        for kx in 0..k {
                            let ix = x as isize + kx as isize - pad;
                            if ix < 0 || ix >= w as isize {
                                continue;
                            }
                            let i = input.offset(b, iy as usize, ix as usize, 0);
                            let base = (ky * k + kx) * c * co;
                            for (ci, &v) in input.data[i..i + c].iter().enumerate() {
                                if v == 0.0 {
                                    continue;
                                }
                                let wrow = &self.weights[base + ci * co..base + (ci + 1) * co];
                                for (d, &wv) in dst.iter_mut().zip(wrow) {
                                    *d += v * wv;
                                }
                            }
                        }
                    }
                }
            }
        }
        out
    }

    /// Given ∂L/∂out (`delta`, pre-activation space), returns ∂L/∂input and
    /// the parameter gradients summed over the batch.
    pub fn backward(&self, input: &Tensor, delta: &Tensor) -> (Tensor, ConvGrads) {
        let [n, h, w, c] = input.shape;
        let (k, co) = (self.kernel, self.out_channels);
        let pad = (k / 2) as isize;
        let mut grad_in = Tensor::zeros(input.shape);
        let mut gw = vec![0.0f32; self.weights.len()];
        let mut gb = vec![0.0f32; co];

        for b in 0..n {
            for y in 0..h {
                for x in 0..w {
                    let o = delta.offset(b, y, x, 0);
                    let g = &delta.data[o..o + co];
                    for (acc, &gv) in gb.iter_mut().zip(g) {
                        *acc += gv;
                    }
                    for ky in 0..k {
                        let iy = y as isize + ky as isize - pad;
                        if iy < 0 || iy >= h as isize {
                            continue;
                        }
                        for kx in 0..k {
                            let ix = x as isize + kx as isize - pad;
                            if ix < 0 || ix >= w as isize {
                                continue;
                            }
                            let i = input.offset(b, iy as usize, ix as usize, 0);
                            let base = (ky * k + kx) * c * co;
                            for ci in 0..c {
                                let v = input.data[i + ci];
                                let widx = base + ci * co;
                                let wrow = &self.weights[widx..widx + co];
                                let gwrow = &mut gw[widx..widx + co];
                                let mut back = 0.0;
                                for j in 0..co {
                                    gwrow[j] += v * g[j];
                                    back += wrow[j] * g[j];
                                }
                                grad_in.data[i + ci] += back;
                            }
                        }
                    }
                }
            }
        }

        (grad_in, ConvGrads { weights: gw, biases: gb })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn same_padding_keeps_spatial_size() {
        let mut rng = StdRng::seed_from_u64(7);
        let conv = Conv2d::new(3, 3, 4, 0.0, &mut rng);
        let out = conv.forward(&Tensor::zeros([2, 5, 6, 3]));
        assert_eq!(out.shape, [2, 5, 6, 4]);
    }

    #[test]
    fn identity_kernel_copies_input() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut conv = Conv2d::new(3, 1, 1, 0.0, &mut rng);
        conv.weights = vec![0.0; 9];
        conv.weights[4] = 1.0;
        let input = Tensor::from_data([1, 2, 2, 1], vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(conv.forward(&input).data, input.data);
    }

    #[test]
    fn border_taps_see_zero_padding() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut conv = Conv2d::new(3, 1, 1, 0.0, &mut rng);
        conv.weights = vec![1.0; 9];
        let input = Tensor::from_data([1, 2, 2, 1], vec![1.0; 4]);
        // Every output pixel of a 2x2 image sees all four inputs.
        assert_eq!(conv.forward(&input).data, vec![4.0; 4]);
    }

    #[test]
    fn gradients_match_finite_differences() {
        let mut rng = StdRng::seed_from_u64(11);
        let conv = Conv2d::new(3, 2, 3, 0.1, &mut rng);
        let data: Vec<f32> = (0..2 * 3 * 3 * 2).map(|i| ((i * 7 % 11) as f32 - 5.0) / 5.0).collect();
        let input = Tensor::from_data([2, 3, 3, 2], data);

        let loss = |conv: &Conv2d, input: &Tensor| conv.forward(input).data.iter().sum::<f32>();
        let out = conv.forward(&input);
        let ones = Tensor::from_data(out.shape, vec![1.0; out.data.len()]);
        let (grad_in, grads) = conv.backward(&input, &ones);

        let eps = 1e-2;
        for idx in [0, 5, 17, grads.weights.len() - 1] {
            let mut plus = conv.clone();
            plus.weights[idx] += eps;
            let mut minus = conv.clone();
            minus.weights[idx] -= eps;
            let numeric = (loss(&plus, &input) - loss(&minus, &input)) / (2.0 * eps);
            assert!((numeric - grads.weights[idx]).abs() < 1e-2, "w[{}]", idx);
        }
        for idx in [0, 9, 35] {
            let mut plus = input.clone();
            plus.data[idx] += eps;
            let mut minus = input.clone();
            minus.data[idx] -= eps;
            let numeric = (loss(&conv, &plus) - loss(&conv, &minus)) / (2.0 * eps);
            assert!((numeric - grad_in.data[idx]).abs() < 1e-2, "x[{}]", idx);
        }
        // Bias gradient is the number of output pixels per sample times batch.
        assert!(grads.biases.iter().all(|&g| (g - 18.0).abs() < 1e-4));
    }
}
