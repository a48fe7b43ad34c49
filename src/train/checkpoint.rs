use std::path::{Path, PathBuf};

use crate::error::{shape, Result, RoadSegError};
use crate::network::{ModelGeometry, RoadNet};

/// Persists and restores model parameters.
pub trait CheckpointStore {
    /// Writes the current parameters and returns where they went.
    fn save(&self, network: &RoadNet) -> Result<PathBuf>;

    /// Loads parameters for a model of exactly `geometry`. A missing
    /// checkpoint is an error; there is no fallback to fresh weights.
    fn restore(&self, geometry: &ModelGeometry) -> Result<RoadNet>;
}

/// `model.json` inside a directory.
#[derive(Debug, Clone)]
pub struct JsonCheckpointStore {
    dir: PathBuf,
}

impl JsonCheckpointStore {
    pub const FILE_NAME: &'static str = "model.json";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonCheckpointStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(Self::FILE_NAME)
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn save(&self, network: &RoadNet) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|source| RoadSegError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.model_path();
        network.save_json(&path)?;
        Ok(path)
    }

    fn restore(&self, geometry: &ModelGeometry) -> Result<RoadNet> {
        let path = self.model_path();
        if !path.is_file() {
            return Err(RoadSegError::MissingCheckpoint { path });
        }
        let network = RoadNet::load_json(&path)?;
        if network.geometry != *geometry {
            return Err(shape(format!(
                "checkpoint {} was trained for {:?}, configured {:?}",
                path.display(),
                network.geometry,
                geometry
            )));
        }
        Ok(network)
    }
}
