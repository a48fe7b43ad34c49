use crate::math::tensor::Tensor;

/// 2x2 max pooling with stride 2 and "same" padding: odd edges keep a
/// half-size window, so the output is `ceil(h/2) × ceil(w/2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxPool2x2;

impl MaxPool2x2 {
    pub fn output_size(size: usize) -> usize {
        (size + 1) / 2
    }

    /// Returns the pooled tensor and, for every output value, the flat
    /// index of the input element it came from.
    pub fn forward(&self, input: &Tensor) -> (Tensor, Vec<usize>) {
        let [n, h, w, c] = input.shape;
        let (oh, ow) = (Self::output_size(h), Self::output_size(w));
        let mut out = Tensor::zeros([n, oh, ow, c]);
        let mut argmax = vec![0usize; out.data.len()];

        for b in 0..n {
            for y in 0..oh {
                for x in 0..ow {
                    for ch in 0..c {
                        let mut best = f32::NEG_INFINITY;
                        let mut best_idx = 0;
                        for iy in 2 * y..(2 * y + 2).min(h) {
                            for ix in 2 * x..(2 * x + 2).min(w) {
                                let i = input.offset(b, iy, ix, ch);
                                if input.data[i] > best {
                                    best = input.data[i];
                                    best_idx = i;
                                }
                            }
                        }
                        let o = out.offset(b, y, x, ch);
                        out.data[o] = best;
                        argmax[o] = best_idx;
                    }
                }
            }
        }
        (out, argmax)
    }

    /// Routes each output gradient back to the input element that won the max.
    pub fn backward(&self, input_shape: [usize; 4], argmax: &[usize], delta: &Tensor) -> Tensor {
        let mut grad_in = Tensor::zeros(input_shape);
        for (&src, &g) in argmax.iter().zip(&delta.data) {
            grad_in.data[src] += g;
        }
        grad_in
    }
}
