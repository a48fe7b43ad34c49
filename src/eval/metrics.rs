use crate::data::dataset::Split;
use crate::data::labels::Label;
use crate::math::tensor::Tensor;
use crate::network::RoadNet;
use crate::train::batching::BatchingStrategy;

/// Predicted label for every sample of `patches`, evaluated in chunks of
/// `batch_size`. Each sample is scored exactly once.
pub fn predict_labels(network: &RoadNet, patches: &Tensor, batch_size: usize) -> Vec<Label> {
    let n = patches.batch();
    let mut labels = Vec::with_capacity(n);
    for chunk in BatchingStrategy::DropLast.eval_chunks(n, batch_size.max(1)) {
        let probs = network.predict_probabilities(&patches.gather(&chunk));
        labels.extend((0..probs.rows).map(|r| Label::from_probabilities(probs.row(r))));
    }
    labels
}

/// Percentage of correctly classified samples in `split`.
///
/// Under `WrapAround` the last chunk is padded to a full batch from the
/// front of the split and the per-chunk accuracies are averaged, so a few
/// samples count twice. `DropLast` scores every sample once. An empty
/// split scores 0.
pub fn accuracy(
    network: &RoadNet,
    split: &Split,
    batch_size: usize,
    strategy: BatchingStrategy,
) -> f32 {
    let chunks = strategy.eval_chunks(split.len(), batch_size.max(1));
    let mut correct = 0usize;
    let mut total = 0usize;
    for chunk in &chunks {
        let probs = network.predict_probabilities(&split.patches.gather(chunk));
        correct += chunk
            .iter()
            .enumerate()
            .filter(|&(r, &i)| Label::from_probabilities(probs.row(r)) == split.labels[i])
            .count();
        total += chunk.len();
    }
    if total == 0 {
        return 0.0;
    }
    100.0 * correct as f32 / total as f32
}

/// Binary confusion counts with `Road` as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionCounts {
    pub true_positive: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_negative: usize,
}

/// F1 of the road class. Precision or recall with a zero denominator
/// makes the score undefined instead of NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum F1Score {
    Defined(f32),
    Undefined(&'static str),
}

impl F1Score {
    pub fn value(self) -> Option<f32> {
        match self {
            F1Score::Defined(v) => Some(v),
            F1Score::Undefined(_) => None,
        }
    }
}

impl ConfusionCounts {
    /// Tallies paired predictions against ground truth. Extra entries on
    /// either side are ignored.
    pub fn from_labels(predicted: &[Label], truth: &[Label]) -> ConfusionCounts {
        let mut counts = ConfusionCounts::default();
        for (&p, &t) in predicted.iter().zip(truth) {
            match (p, t) {
                (Label::Road, Label::Road) => counts.true_positive += 1,
                (Label::Road, Label::Background) => counts.false_positive += 1,
                (Label::Background, Label::Road) => counts.false_negative += 1,
                (Label::Background, Label::Background) => counts.true_negative += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.false_negative + self.true_negative
    }

    pub fn precision(&self) -> Option<f32> {
        let denom = self.true_positive + self.false_positive;
        (denom > 0).then(|| self.true_positive as f32 / denom as f32)
    }

    pub fn recall(&self) -> Option<f32> {
        let denom = self.true_positive + self.false_negative;
        (denom > 0).then(|| self.true_positive as f32 / denom as f32)
    }

    pub fn f1(&self) -> F1Score {
        let precision = match self.precision() {
            Some(p) => p,
            None => return F1Score::Undefined("no positive predictions"),
        };
        let recall = match self.recall() {
            Some(r) => r,
            None => return F1Score::Undefined("no positive ground truth"),
        };
        if precision + recall == 0.0 {
            return F1Score::Defined(0.0);
        }
        F1Score::Defined(2.0 * precision * recall / (precision + recall))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ModelGeometry;
    use crate::data::labels::Label::{Background as B, Road as R};

    #[test]
    fn f1_from_mixed_predictions() {
        // tp = 1, fp = 1, fn = 1: precision = recall = 0.5.
        let counts = ConfusionCounts::from_labels(&[R, R, B, B], &[R, B, R, B]);
        assert_eq!(
            counts,
            ConfusionCounts { true_positive: 1, false_positive: 1, false_negative: 1, true_negative: 1 }
        );
        assert_eq!(counts.f1(), F1Score::Defined(0.5));
    }

    #[test]
    fn f1_is_one_for_perfect_predictions() {
        let counts = ConfusionCounts::from_labels(&[R, B, R], &[R, B, R]);
        assert_eq!(counts.f1(), F1Score::Defined(1.0));
    }

    #[test]
    fn f1_without_positive_predictions_is_undefined() {
        let counts = ConfusionCounts::from_labels(&[B, B], &[R, B]);
        assert!(matches!(counts.f1(), F1Score::Undefined(_)));
        assert_eq!(counts.f1().value(), None);
    }

    #[test]
    fn f1_without_positive_truth_is_undefined() {
        let counts = ConfusionCounts::from_labels(&[R, B], &[B, B]);
        assert!(matches!(counts.f1(), F1Score::Undefined(_)));
    }

    #[test]
    fn f1_is_zero_when_every_positive_is_wrong() {
        let counts = ConfusionCounts::from_labels(&[R, B], &[B, R]);
        assert_eq!(counts.f1(), F1Score::Defined(0.0));
    }

    fn split_of(n: usize, labels: Vec<Label>) -> Split {
        let data = (0..n * 8 * 8 * 3).map(|i| ((i % 13) as f32 - 6.0) / 6.0).collect();
        Split {
            patches: Tensor::from_data([n, 8, 8, 3], data),
            labels,
            image_ids: vec![1],
        }
    }

    #[test]
    fn accuracy_matches_predicted_labels() {
        let net = RoadNet::new(ModelGeometry { channels: 3, patch_total: 8, filter_size: 3 }, 3).unwrap();
        let probe = split_of(5, vec![B; 5]);
        let predicted = predict_labels(&net, &probe.patches, 2);
        assert_eq!(predicted.len(), 5);

        // Ground truth equal to the predictions scores 100 either way.
        let split = split_of(5, predicted.clone());
        assert_eq!(accuracy(&net, &split, 2, BatchingStrategy::DropLast), 100.0);
        assert_eq!(accuracy(&net, &split, 2, BatchingStrategy::WrapAround), 100.0);

        // Flip only the last sample: exact scoring sees 4/5, the wrapped
        // chunk [4, 0] still scores sample 4 once out of 6 evaluations.
        let mut flipped = predicted;
        flipped[4] = if flipped[4] == R { B } else { R };
        let split = split_of(5, flipped);
        assert!((accuracy(&net, &split, 2, BatchingStrategy::DropLast) - 80.0).abs() < 1e-4);
        assert!((accuracy(&net, &split, 2, BatchingStrategy::WrapAround) - 500.0 / 6.0).abs() < 1e-3);
    }

    #[test]
    fn accuracy_of_empty_split_is_zero() {
        let net = RoadNet::new(ModelGeometry { channels: 3, patch_total: 8, filter_size: 3 }, 3).unwrap();
        let split = split_of(0, Vec::new());
        assert_eq!(accuracy(&net, &split, 4, BatchingStrategy::WrapAround), 0.0);
    }
}
