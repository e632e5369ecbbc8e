// Local-directory artifact store. One flat directory, no per-upload namespacing.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::naming::{is_flat_name, ARCHIVE_EXTENSION};
use super::traits::{ArtifactStore, StagedUpload, StoreError, StoredArtifact, StoredFile};

/// Prefix of in-flight upload buffers. Never a valid artifact name.
pub const STAGING_PREFIX: &str = ".upload-";

/// Stored artifact found on disk, with its age.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub name: String,
    pub age: Duration,
}

pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Open (creating if needed) the store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Path an artifact named `name` lives at, whether or not it exists.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        if !is_flat_name(name) {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    /// Remove upload buffers abandoned by a previous process.
    pub fn clear_staging(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(STAGING_PREFIX) {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("remove stale buffer {:?} failed: {}", name, e),
            }
        }
        Ok(removed)
    }

    /// Every stored artifact with its age since last modification.
    pub fn entries(&self) -> Result<Vec<StoredEntry>, StoreError> {
        let now = SystemTime::now();
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !is_flat_name(&name) {
                continue;
            }
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let age = meta
                .modified()
                .ok()
                .and_then(|m| now.duration_since(m).ok())
                .unwrap_or_default();
            entries.push(StoredEntry { name, age });
        }
        Ok(entries)
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    fn stage(&self) -> Result<StagedUpload, StoreError> {
        // Staged inside the root so the final move is a same-filesystem rename.
        let file = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(&format!(".{}", ARCHIVE_EXTENSION))
            .tempfile_in(&self.root)?;
        debug!("staged upload at {}", file.path().display());
        Ok(StagedUpload::new(file))
    }

    async fn persist_archive(
        &self,
        staged: StagedUpload,
        name: &str,
    ) -> Result<StoredArtifact, StoreError> {
        // An invalid name drops `staged` here, which deletes the buffer.
        let path = self.path_for(name)?;
        // On failure the temp file rides back inside the error and is removed on drop.
        staged
            .into_inner()
            .persist(&path)
            .map_err(|e| StoreError::Io(e.error))?;
        info!("stored archive {}", name);
        Ok(StoredArtifact {
            name: name.to_string(),
            path,
        })
    }

    async fn persist_manifest(
        &self,
        name: &str,
        bytes: &[u8],
    ) -> Result<StoredArtifact, StoreError> {
        let path = self.path_for(name)?;
        tokio::fs::write(&path, bytes).await?;
        info!("stored manifest {} ({} bytes)", name, bytes.len());
        Ok(StoredArtifact {
            name: name.to_string(),
            path,
        })
    }

    async fn open(&self, name: &str) -> Result<Option<StoredFile>, StoreError> {
        let Ok(path) = self.path_for(name) else {
            return Ok(None);
        };
        let file = match tokio::fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Ok(None);
        }
        Ok(Some(StoredFile {
            file,
            len: meta.len(),
        }))
    }

    async fn purge(&self, names: &[String]) -> usize {
        let mut removed = 0;
        for name in names {
            let Ok(path) = self.path_for(name) else {
                warn!("purge skipped invalid name {}", name);
                continue;
            };
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    removed += 1;
                    info!("expired {}", name);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!("expire {}: already gone", name);
                }
                Err(e) => warn!("expire {} failed: {}", name, e),
            }
        }
        removed
    }
}
