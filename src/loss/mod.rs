pub mod cross_entropy;
pub mod weight_decay;

pub use cross_entropy::SoftmaxCrossEntropy;
