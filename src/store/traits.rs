use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid artifact name: {0}")]
    InvalidName(String),
}

/// Upload buffer whose final name is not known yet.
///
/// Dropping it removes the backing file, so every early return in the
/// ingestion path cleans up without further bookkeeping.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
}

impl StagedUpload {
    pub fn new(file: NamedTempFile) -> Self {
        Self { file }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn as_file(&self) -> &std::fs::File {
        self.file.as_file()
    }

    pub fn into_inner(self) -> NamedTempFile {
        self.file
    }
}

/// Location of a persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub name: String,
    pub path: PathBuf,
}

/// Open handle to a stored artifact, ready to stream.
#[derive(Debug)]
pub struct StoredFile {
    pub file: tokio::fs::File,
    pub len: u64,
}

/// Keyed store of uploaded archives and their manifests.
///
/// Names form one flat namespace with last-write-wins semantics: persisting
/// under an existing name replaces it, and no locking is performed.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Allocate a private buffer for an incoming upload.
    fn stage(&self) -> Result<StagedUpload, StoreError>;

    /// Move `staged` into the store under `name`. The buffer never survives
    /// this call, whether it succeeds or not.
    async fn persist_archive(
        &self,
        staged: StagedUpload,
        name: &str,
    ) -> Result<StoredArtifact, StoreError>;

    async fn persist_manifest(&self, name: &str, bytes: &[u8])
        -> Result<StoredArtifact, StoreError>;

    /// Open a stored artifact by exact name. `None` when absent or not a valid name.
    async fn open(&self, name: &str) -> Result<Option<StoredFile>, StoreError>;

    /// Best-effort removal. Missing names are skipped silently and other
    /// failures are logged, never returned. Yields the number removed.
    async fn purge(&self, names: &[String]) -> usize;
}
