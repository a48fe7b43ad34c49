use crate::error::{Result, RoadSegError};
use crate::math::tensor::Tensor;

/// Per-channel statistics used by one normalization call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStats {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

/// Standardizes each channel of `batch` in place to zero mean and unit
/// (population) standard deviation, pooling every pixel of every sample.
///
/// Statistics come from `batch` alone; callers normalize each split
/// separately. A channel with zero variance is an error rather than a
/// silent division by zero.
pub fn normalize_per_channel(batch: &mut Tensor) -> Result<ChannelStats> {
    let channels = batch.channels();
    if batch.data.is_empty() {
        return Err(RoadSegError::EmptyDataset("cannot normalize an empty batch".into()));
    }
    let count = (batch.data.len() / channels) as f64;

    let mut sum = vec![0.0f64; channels];
    for px in batch.data.chunks_exact(channels) {
        for (s, &v) in sum.iter_mut().zip(px) {
            *s += v as f64;
        }
    }
    let mean: Vec<f64> = sum.iter().map(|s| s / count).collect();

    let mut sq = vec![0.0f64; channels];
    for px in batch.data.chunks_exact(channels) {
        for ((s, &v), m) in sq.iter_mut().zip(px).zip(&mean) {
            let d = v as f64 - m;
            *s += d * d;
        }
    }
    let std: Vec<f64> = sq.iter().map(|s| (s / count).sqrt()).collect();

    if let Some(channel) = std.iter().position(|&s| !(s > 1e-12)) {
        return Err(RoadSegError::DegenerateChannel { channel });
    }

    for px in batch.data.chunks_exact_mut(channels) {
        for ((v, m), s) in px.iter_mut().zip(&mean).zip(&std) {
            *v = ((*v as f64 - m) / s) as f32;
        }
    }

    Ok(ChannelStats {
        mean: mean.into_iter().map(|m| m as f32).collect(),
        std: std.into_iter().map(|s| s as f32).collect(),
    })
}
