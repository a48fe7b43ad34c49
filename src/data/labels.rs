use serde::{Deserialize, Serialize};

use crate::data::image::Image;

/// Class of one patch. Stored as an enum; the one-hot vector is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Background,
    Road,
}

impl Label {
    pub fn index(self) -> usize {
        match self {
            Label::Background => 0,
            Label::Road => 1,
        }
    }

    /// `[1, 0]` for background, `[0, 1]` for road.
    pub fn one_hot(self) -> [f32; 2] {
        match self {
            Label::Background => [1.0, 0.0],
            Label::Road => [0.0, 1.0],
        }
    }

    /// Background only when its probability is strictly above one half.
    pub fn from_probabilities(probs: &[f32]) -> Label {
        if probs[0] > 0.5 {
            Label::Background
        } else {
            Label::Road
        }
    }
}

/// How a ground-truth patch is reduced to a single foreground score.
///
/// `Mean` is the canonical reduction (per-pixel intensity in [0, 1]).
/// `Sum` scores the raw intensity total; its threshold must scale with
/// the patch area to mean the same thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForegroundScore {
    Mean,
    Sum,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelAssigner {
    pub score: ForegroundScore,
    pub threshold: f32,
}

impl Default for LabelAssigner {
    fn default() -> Self {
        LabelAssigner::new(ForegroundScore::Mean, 0.25)
    }
}

impl LabelAssigner {
    pub fn new(score: ForegroundScore, threshold: f32) -> LabelAssigner {
        LabelAssigner { score, threshold }
    }

    pub fn score(&self, patch: &Image) -> f32 {
        match self.score {
            ForegroundScore::Mean => patch.mean(),
            ForegroundScore::Sum => patch.sum(),
        }
    }

    /// Road when the score is strictly greater than the threshold.
    pub fn assign(&self, patch: &Image) -> Label {
        if self.score(patch) > self.threshold {
            Label::Road
        } else {
            Label::Background
        }
    }
}
