use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{activation::activation::ActivationFunction, math::init::truncated_normal, math::matrix::Matrix};

/// Fully-connected layer operating on a whole mini-batch at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub size: usize,
    pub input_size: usize,
    /// Shape `(input_size, size)`.
    pub weights: Matrix,
    pub biases: Vec<f32>,
    pub activator: ActivationFunction,
}

/// Gradients of the batch loss w.r.t. one dense layer's parameters.
#[derive(Debug, Clone)]
pub struct DenseGrads {
    pub weights: Matrix,
    pub biases: Vec<f32>,
}

impl Dense {
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        bias_init: f32,
        rng: &mut R,
    ) -> Dense {
        let weights = Matrix::from_data(input_size, size, truncated_normal(input_size * size, 0.1, rng));
        Dense {
            size,
            input_size,
            weights,
            biases: vec![bias_init; size],
            activator: activation,
        }
    }

    /// Returns `(z, a)`: the pre-activation `z = xW + b` and the activation.
    /// `z` is what the backward pass needs for the derivative.
    pub fn feed_from(&self, input: &Matrix) -> (Matrix, Matrix) {
        let mut z = input * &self.weights;
        for i in 0..z.rows {
            for (v, b) in z.row_mut(i).iter_mut().zip(&self.biases) {
                *v += b;
            }
        }
        let a = z.map(|x| self.activator.function(x));
        (z, a)
    }

    /// Backward pass for one batch.
    ///
    /// `delta` is ∂L/∂a for this layer's output; `inputs` and `pre` are the
    /// values seen by `feed_from`. Returns `(∂L/∂inputs, parameter grads)`.
    pub fn compute_gradients(&self, delta: &Matrix, inputs: &Matrix, pre: &Matrix) -> (Matrix, DenseGrads) {
        let act_derivative = pre.map(|x| self.activator.derivative(x));
        // δ = error ⊙ σ'(z)
        let layer_delta = hadamard(delta, &act_derivative);

        let weights = inputs.t_mul(&layer_delta);
        let mut biases = vec![0.0; self.size];
        for i in 0..layer_delta.rows {
            for (b, d) in biases.iter_mut().zip(layer_delta.row(i)) {
                *b += d;
            }
        }
        let input_delta = layer_delta.mul_t(&self.weights);

        (input_delta, DenseGrads { weights, biases })
    }
}

/// Element-wise (Hadamard) product of two same-shape matrices.
fn hadamard(a: &Matrix, b: &Matrix) -> Matrix {
    assert_eq!(a.rows, b.rows);
    assert_eq!(a.cols, b.cols);
    let data = a.data.iter().zip(b.data.iter()).map(|(x, y)| x * y).collect();
    Matrix::from_data(a.rows, a.cols, data)
}
