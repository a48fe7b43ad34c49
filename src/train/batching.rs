use serde::{Deserialize, Serialize};

/// How mini-batches are cut from an epoch's shuffled index order, and how
/// evaluation chunks cover a split.
///
/// - `WrapAround`: training offsets are `(step * B) % (n - B)`, so once the
///   offset passes `n - B` it wraps to the front. Some examples are visited
///   twice per epoch and others not at all. Evaluation pads the last chunk
///   to a full batch by wrapping to index 0, double-counting a few examples.
///   This is the default.
/// - `DropLast`: training offsets are `step * B`; the trailing partial
///   batch is skipped. Evaluation scores every example exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchingStrategy {
    WrapAround,
    DropLast,
}

impl Default for BatchingStrategy {
    fn default() -> Self {
        BatchingStrategy::WrapAround
    }
}

impl BatchingStrategy {
    /// Start offset of every full batch in one epoch, `floor(n / B)` of them.
    pub fn epoch_offsets(self, train_size: usize, batch_size: usize) -> Vec<usize> {
        let steps = train_size / batch_size;
        match self {
            BatchingStrategy::WrapAround => {
                let span = train_size - batch_size.min(train_size);
                (0..steps)
                    .map(|step| if span == 0 { 0 } else { (step * batch_size) % span })
                    .collect()
            }
            BatchingStrategy::DropLast => (0..steps).map(|step| step * batch_size).collect(),
        }
    }

    /// Index lists covering `0..n` in chunks of at most `batch_size`.
    pub fn eval_chunks(self, n: usize, batch_size: usize) -> Vec<Vec<usize>> {
        if n == 0 {
            return Vec::new();
        }
        (0..n)
            .step_by(batch_size)
            .map(|start| match self {
                BatchingStrategy::WrapAround => (start..start + batch_size).map(|i| i % n).collect(),
                BatchingStrategy::DropLast => (start..(start + batch_size).min(n)).collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_around_reuses_the_front_of_the_epoch() {
        // n = 10, B = 3: span 7, offsets 0, 3, 6 % 7 = 6.
        assert_eq!(BatchingStrategy::WrapAround.epoch_offsets(10, 3), vec![0, 3, 6]);
        // n = 20, B = 4: span 16, the 5th batch wraps to offset 0.
        assert_eq!(BatchingStrategy::WrapAround.epoch_offsets(20, 4), vec![0, 4, 8, 12, 0]);
    }

    #[test]
    fn wrap_around_tolerates_one_exact_batch() {
        assert_eq!(BatchingStrategy::WrapAround.epoch_offsets(4, 4), vec![0]);
    }

    #[test]
    fn drop_last_walks_straight_through() {
        assert_eq!(BatchingStrategy::DropLast.epoch_offsets(20, 4), vec![0, 4, 8, 12, 16]);
        assert_eq!(BatchingStrategy::DropLast.epoch_offsets(10, 3), vec![0, 3, 6]);
    }

    #[test]
    fn offsets_never_overrun() {
        for strategy in [BatchingStrategy::WrapAround, BatchingStrategy::DropLast] {
            for n in 1..40 {
                for b in 1..=n {
                    assert!(strategy.epoch_offsets(n, b).iter().all(|&o| o + b <= n));
                }
            }
        }
    }

    #[test]
    fn eval_chunks_pad_or_trim_the_tail() {
        assert_eq!(
            BatchingStrategy::WrapAround.eval_chunks(5, 2),
            vec![vec![0, 1], vec![2, 3], vec![4, 0]]
        );
        assert_eq!(
            BatchingStrategy::DropLast.eval_chunks(5, 2),
            vec![vec![0, 1], vec![2, 3], vec![4]]
        );
    }
}
