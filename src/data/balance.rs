use crate::data::labels::Label;
use crate::error::{Result, RoadSegError};
use crate::math::tensor::Tensor;

/// `(background, road)` counts.
pub fn class_counts(labels: &[Label]) -> (usize, usize) {
    let road = labels.iter().filter(|&&l| l == Label::Road).count();
    (labels.len() - road, road)
}

/// Downsamples the majority class to the size of the minority class.
///
/// Keeps the first `min(c0, c1)` examples of each class in their original
/// order and returns the background block followed by the road block. No
/// randomness is involved; the trainer shuffles per epoch.
pub fn balance_classes(patches: &Tensor, labels: &[Label]) -> Result<(Tensor, Vec<Label>)> {
    if patches.batch() != labels.len() {
        return Err(RoadSegError::LabelMismatch {
            patches: patches.batch(),
            labels: labels.len(),
        });
    }
    let (c0, c1) = class_counts(labels);
    let keep = c0.min(c1);

    let pick = |class: Label| {
        labels
            .iter()
            .enumerate()
            .filter(move |&(_, &l)| l == class)
            .map(|(i, _)| i)
            .take(keep)
    };
    let indices: Vec<usize> = pick(Label::Background).chain(pick(Label::Road)).collect();

    let balanced_labels = indices.iter().map(|&i| labels[i]).collect();
    Ok((patches.gather(&indices), balanced_labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::labels::Label::{Background as B, Road as R};

    #[test]
    fn majority_is_trimmed_in_order() {
        let labels = vec![B, R, B, B, R, B];
        let data: Vec<f32> = (0..labels.len()).map(|i| i as f32).collect();
        let patches = Tensor::from_data([6, 1, 1, 1], data);

        let (p, l) = balance_classes(&patches, &labels).unwrap();
        assert_eq!(l, vec![B, B, R, R]);
        assert_eq!(p.data, vec![0.0, 2.0, 1.0, 4.0]);
        assert_eq!(class_counts(&l), (2, 2));
    }

    #[test]
    fn single_class_balances_to_empty() {
        let labels = vec![R, R, R];
        let patches = Tensor::zeros([3, 1, 1, 1]);
        let (p, l) = balance_classes(&patches, &labels).unwrap();
        assert!(l.is_empty());
        assert_eq!(p.batch(), 0);
    }

    #[test]
    fn count_mismatch_is_fatal() {
        let patches = Tensor::zeros([2, 1, 1, 1]);
        assert!(matches!(
            balance_classes(&patches, &[B]),
            Err(RoadSegError::LabelMismatch { patches: 2, labels: 1 })
        ));
    }
}
