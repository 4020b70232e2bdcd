use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{EtaError, EtaResult};
use crate::services::estimator::RandomForest;
use crate::services::predictor::TrainingReport;

/// Bumped whenever the encoded layout of [`ModelArtifact`] changes.
pub const ARTIFACT_VERSION: u32 = 1;

/// The persisted blob: a trained estimator and how it was produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub trained_at: DateTime<Utc>,
    pub report: TrainingReport,
    pub estimator: RandomForest,
}

impl ModelArtifact {
    pub fn new(estimator: RandomForest, report: TrainingReport) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            trained_at: Utc::now(),
            report,
            estimator,
        }
    }

    pub fn encode(&self) -> EtaResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> EtaResult<Self> {
        let artifact: ModelArtifact = bincode::deserialize(bytes)?;
        if artifact.version != ARTIFACT_VERSION {
            return Err(EtaError::Storage(format!(
                "unsupported model artifact version {}",
                artifact.version
            )));
        }
        Ok(artifact)
    }
}

/// Durable home for the trained estimator.
pub trait ModelStore: Send + Sync {
    fn save(&self, artifact: &ModelArtifact) -> EtaResult<()>;

    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> EtaResult<Option<ModelArtifact>>;
}

/// Stores the artifact as a single file, replaced atomically on save.
pub struct FileModelStore {
    path: PathBuf,
}

impl FileModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "model".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ModelStore for FileModelStore {
    fn save(&self, artifact: &ModelArtifact) -> EtaResult<()> {
        let bytes = artifact.encode()?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "Model artifact written");
        Ok(())
    }

    fn load(&self) -> EtaResult<Option<ModelArtifact>> {
        match fs::read(&self.path) {
            Ok(bytes) => ModelArtifact::decode(&bytes).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store. `set_failing(true)` makes every call fail.
#[derive(Default)]
pub struct MemoryModelStore {
    blob: Mutex<Option<Vec<u8>>>,
    failing: Mutex<bool>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn has_artifact(&self) -> bool {
        self.blob.lock().is_some()
    }

    fn check(&self) -> EtaResult<()> {
        if *self.failing.lock() {
            return Err(EtaError::Storage("model store unavailable".to_string()));
        }
        Ok(())
    }
}

impl ModelStore for MemoryModelStore {
    fn save(&self, artifact: &ModelArtifact) -> EtaResult<()> {
        self.check()?;
        *self.blob.lock() = Some(artifact.encode()?);
        Ok(())
    }

    fn load(&self) -> EtaResult<Option<ModelArtifact>> {
        self.check()?;
        match self.blob.lock().as_deref() {
            Some(bytes) => ModelArtifact::decode(bytes).map(Some),
            None => Ok(None),
        }
    }
}
