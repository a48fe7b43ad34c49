use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RoadSegError>;

/// Every failure the pipeline can surface.
///
/// Missing input images are not represented here: the dataset loader logs
/// them and carries on with the reduced corpus.
#[derive(Debug, Error)]
pub enum RoadSegError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image codec error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("json error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("shape error: {0}")]
    Shape(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("channel {channel} has zero variance and cannot be normalized")]
    DegenerateChannel { channel: usize },
    #[error("empty dataset: {0}")]
    EmptyDataset(String),
    #[error("no checkpoint found at {path}")]
    MissingCheckpoint { path: PathBuf },
    #[error("{patches} patches but {labels} labels")]
    LabelMismatch { patches: usize, labels: usize },
}

pub(crate) fn shape(msg: impl Into<String>) -> RoadSegError {
    RoadSegError::Shape(msg.into())
}

pub(crate) fn config(msg: impl Into<String>) -> RoadSegError {
    RoadSegError::Config(msg.into())
}
