use crate::activation::activation::softmax_rows;
use crate::data::labels::Label;
use crate::math::matrix::Matrix;

/// Softmax cross-entropy computed from raw logits and averaged over the batch.
pub struct SoftmaxCrossEntropy;

impl SoftmaxCrossEntropy {
    /// Mean over the batch of `-log softmax(logits)[true_class]`.
    ///
    /// Uses the log-sum-exp form so it stays finite for saturated logits.
    pub fn loss(logits: &Matrix, labels: &[Label]) -> f32 {
        assert_eq!(logits.rows, labels.len(), "logits and labels must have equal length");
        let total: f32 = labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let row = logits.row(i);
                let max = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
                let lse = max + row.iter().map(|z| (z - max).exp()).sum::<f32>().ln();
                lse - row[label.index()]
            })
            .sum();
        total / labels.len() as f32
    }

    /// Gradient of the mean loss w.r.t. the logits: `(softmax - onehot) / B`.
    pub fn derivative(logits: &Matrix, labels: &[Label]) -> Matrix {
        let mut grad = softmax_rows(logits);
        let inv_batch = 1.0 / labels.len() as f32;
        for (i, label) in labels.iter().enumerate() {
            let expected = label.one_hot();
            for (g, e) in grad.row_mut(i).iter_mut().zip(expected.iter()) {
                *g = (*g - e) * inv_batch;
            }
        }
        grad
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_logits_cost_ln2() {
        let logits = Matrix::zeros(2, 2);
        let labels = [Label::Background, Label::Road];
        let l = SoftmaxCrossEntropy::loss(&logits, &labels);
        assert!((l - 2.0_f32.ln()).abs() < 1e-6);

        let g = SoftmaxCrossEntropy::derivative(&logits, &labels);
        assert_eq!(g.data, vec![-0.25, 0.25, 0.25, -0.25]);
    }

    #[test]
    fn saturated_logits_stay_finite() {
        let logits = Matrix::from_data(1, 2, vec![500.0, -500.0]);
        let l = SoftmaxCrossEntropy::loss(&logits, &[Label::Road]);
        assert!((l - 1000.0).abs() < 1e-3);
    }
}
