use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::{softmax_rows, ActivationFunction};
use crate::error::{shape, Result, RoadSegError};
use crate::layers::conv::{Conv2d, ConvGrads};
use crate::layers::dense::{Dense, DenseGrads};
use crate::layers::pool::MaxPool2x2;
use crate::math::matrix::Matrix;
use crate::math::tensor::Tensor;
use crate::network::spec::ModelGeometry;

/// The patch classifier:
///
/// ```text
/// conv1 → ReLU → conv12 → ReLU → pool
///   → conv2 → ReLU → conv22 → ReLU → pool
///   → flatten → fc1 (512, ReLU) → fc2 (2 logits)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadNet {
    pub geometry: ModelGeometry,
    pub conv1: Conv2d,
    pub conv12: Conv2d,
    pub conv2: Conv2d,
    pub conv22: Conv2d,
    pub fc1: Dense,
    pub fc2: Dense,
}

/// Intermediate values of one training forward pass, consumed by `backward`.
pub struct ForwardCache {
    input: Tensor,
    z1: Tensor,
    a1: Tensor,
    z12: Tensor,
    pool1_argmax: Vec<usize>,
    p1: Tensor,
    z2: Tensor,
    a2: Tensor,
    z22: Tensor,
    pool2_argmax: Vec<usize>,
    pool2_shape: [usize; 4],
    flat: Matrix,
    h_pre: Matrix,
    h: Matrix,
    logits_pre: Matrix,
}

/// Gradients of the batch loss for every parameter of a `RoadNet`.
#[derive(Debug, Clone)]
pub struct Gradients {
    pub conv1: ConvGrads,
    pub conv12: ConvGrads,
    pub conv2: ConvGrads,
    pub conv22: ConvGrads,
    pub fc1: DenseGrads,
    pub fc2: DenseGrads,
}

impl Gradients {
    /// Gradient slices in the same order as `RoadNet::parameters_mut`.
    pub fn slices(&self) -> Vec<&[f32]> {
        vec![
            &self.conv1.weights,
            &self.conv1.biases,
            &self.conv12.weights,
            &self.conv12.biases,
            &self.conv2.weights,
            &self.conv2.biases,
            &self.conv22.weights,
            &self.conv22.biases,
            &self.fc1.weights.data,
            &self.fc1.biases,
            &self.fc2.weights.data,
            &self.fc2.biases,
        ]
    }

    /// Mutable gradients of the fully-connected parameters, the only ones
    /// subject to weight decay. Same order as `RoadNet::regularized`.
    pub fn regularized_mut(&mut self) -> [&mut [f32]; 4] {
        [
            &mut self.fc1.weights.data,
            &mut self.fc1.biases,
            &mut self.fc2.weights.data,
            &mut self.fc2.biases,
        ]
    }
}

fn relu(z: &Tensor) -> Tensor {
    let f = ActivationFunction::ReLU;
    Tensor::from_data(z.shape, z.data.iter().map(|&x| f.function(x)).collect())
}

fn relu_backward(mut delta: Tensor, z: &Tensor) -> Tensor {
    let f = ActivationFunction::ReLU;
    for (d, &x) in delta.data.iter_mut().zip(&z.data) {
        *d *= f.derivative(x);
    }
    delta
}

impl RoadNet {
    /// Builds a freshly initialized network.
    ///
    /// Weights are truncated-normal (σ = 0.1) drawn from one generator
    /// seeded with `seed`, layer by layer. Biases of the first conv block
    /// start at 0, every other bias at 0.1. Fails if the geometry cannot
    /// feed the fully-connected layer.
    pub fn new(geometry: ModelGeometry, seed: u64) -> Result<RoadNet> {
        geometry.validate()?;
        let mut rng = StdRng::seed_from_u64(seed);
        let k = geometry.filter_size;
        let (d1, d2) = (ModelGeometry::CONV1_DEPTH, ModelGeometry::CONV2_DEPTH);

        let conv1 = Conv2d::new(k, geometry.channels, d1, 0.0, &mut rng);
        let conv12 = Conv2d::new(k, d1, d1, 0.0, &mut rng);
        let conv2 = Conv2d::new(k, d1, d2, 0.1, &mut rng);
        let conv22 = Conv2d::new(k, d2, d2, 0.1, &mut rng);
        let fc1 = Dense::new(
            ModelGeometry::HIDDEN,
            geometry.fc_input_size(),
            ActivationFunction::ReLU,
            0.1,
            &mut rng,
        );
        let fc2 = Dense::new(
            ModelGeometry::NUM_LABELS,
            ModelGeometry::HIDDEN,
            ActivationFunction::Identity,
            0.1,
            &mut rng,
        );

        Ok(RoadNet { geometry, conv1, conv12, conv2, conv22, fc1, fc2 })
    }

    /// Rejects a batch whose per-sample shape differs from the geometry.
    pub fn check_input(&self, batch: &Tensor) -> Result<()> {
        let expected = self.geometry.sample_shape();
        let got = [batch.height(), batch.width(), batch.channels()];
        if got != expected {
            return Err(shape(format!(
                "model expects samples of {:?} (h, w, c), got {:?}",
                expected, got
            )));
        }
        Ok(())
    }

    /// Forward pass that keeps every intermediate needed by `backward`.
    /// Returns the raw logits (`batch × 2`).
    pub fn forward_cached(&self, batch: &Tensor) -> (Matrix, ForwardCache) {
        let z1 = self.conv1.forward(batch);
        let a1 = relu(&z1);
        let z12 = self.conv12.forward(&a1);
        let (p1, pool1_argmax) = MaxPool2x2.forward(&relu(&z12));

        let z2 = self.conv2.forward(&p1);
        let a2 = relu(&z2);
        let z22 = self.conv22.forward(&a2);
        let (p2, pool2_argmax) = MaxPool2x2.forward(&relu(&z22));

        let pool2_shape = p2.shape;
        let flat = Matrix::from_data(p2.batch(), p2.sample_len(), p2.data);
        let (h_pre, h) = self.fc1.feed_from(&flat);
        let (logits_pre, logits) = self.fc2.feed_from(&h);

        let cache = ForwardCache {
            input: batch.clone(),
            z1,
            a1,
            z12,
            pool1_argmax,
            p1,
            z2,
            a2,
            z22,
            pool2_argmax,
            pool2_shape,
            flat,
            h_pre,
            h,
            logits_pre,
        };
        (logits, cache)
    }

    /// Inference-mode forward pass: logits only.
    pub fn forward(&self, batch: &Tensor) -> Matrix {
        let a1 = relu(&self.conv1.forward(batch));
        let (p1, _) = MaxPool2x2.forward(&relu(&self.conv12.forward(&a1)));
        let a2 = relu(&self.conv2.forward(&p1));
        let (p2, _) = MaxPool2x2.forward(&relu(&self.conv22.forward(&a2)));
        let flat = Matrix::from_data(p2.batch(), p2.sample_len(), p2.data);
        let (_, h) = self.fc1.feed_from(&flat);
        self.fc2.feed_from(&h).1
    }

    /// Softmax class probabilities, `batch × 2` with columns (background, road).
    pub fn predict_probabilities(&self, batch: &Tensor) -> Matrix {
        softmax_rows(&self.forward(batch))
    }

    /// Backpropagates `grad_logits` (∂L/∂logits) through the cached pass.
    pub fn backward(&self, cache: &ForwardCache, grad_logits: &Matrix) -> Gradients {
        let (d_h, fc2) = self.fc2.compute_gradients(grad_logits, &cache.h, &cache.logits_pre);
        let (d_flat, fc1) = self.fc1.compute_gradients(&d_h, &cache.flat, &cache.h_pre);

        let d_p2 = Tensor::from_data(cache.pool2_shape, d_flat.data);
        let d_a22 = MaxPool2x2.backward(cache.z22.shape, &cache.pool2_argmax, &d_p2);
        let (d_a2, conv22) = self.conv22.backward(&cache.a2, &relu_backward(d_a22, &cache.z22));
        let (d_p1, conv2) = self.conv2.backward(&cache.p1, &relu_backward(d_a2, &cache.z2));

        let d_a12 = MaxPool2x2.backward(cache.z12.shape, &cache.pool1_argmax, &d_p1);
        let (d_a1, conv12) = self.conv12.backward(&cache.a1, &relu_backward(d_a12, &cache.z12));
        let (_, conv1) = self.conv1.backward(&cache.input, &relu_backward(d_a1, &cache.z1));

        Gradients { conv1, conv12, conv2, conv22, fc1, fc2 }
    }

    /// Every trainable slice, in a fixed order shared with `Gradients::slices`.
    pub fn parameters_mut(&mut self) -> Vec<&mut [f32]> {
        vec![
            &mut self.conv1.weights,
            &mut self.conv1.biases,
            &mut self.conv12.weights,
            &mut self.conv12.biases,
            &mut self.conv2.weights,
            &mut self.conv2.biases,
            &mut self.conv22.weights,
            &mut self.conv22.biases,
            &mut self.fc1.weights.data,
            &mut self.fc1.biases,
            &mut self.fc2.weights.data,
            &mut self.fc2.biases,
        ]
    }

    /// Fully-connected weights and biases; the convolutions are not decayed.
    pub fn regularized(&self) -> [&[f32]; 4] {
        [
            &self.fc1.weights.data,
            &self.fc1.biases,
            &self.fc2.weights.data,
            &self.fc2.biases,
        ]
    }

    /// Serializes the network to JSON. The file is written under a temporary
    /// name and renamed into place, so a failed save never leaves a
    /// truncated checkpoint at `path`.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.partial");
        let io_err = |source| RoadSegError::Io { path: tmp.clone(), source };

        let file = fs::File::create(&tmp).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        let written = serde_json::to_writer(&mut writer, self)
            .map_err(|source| RoadSegError::Json { path: tmp.clone(), source })
            .and_then(|_| writer.flush().map_err(io_err));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        drop(writer);

        fs::rename(&tmp, path).map_err(|source| RoadSegError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Deserializes a network previously written by `save_json`.
    pub fn load_json(path: &Path) -> Result<RoadNet> {
        let file = fs::File::open(path).map_err(|source| RoadSegError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| RoadSegError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
