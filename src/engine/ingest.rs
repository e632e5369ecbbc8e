// Ingestion orchestrator: validate, buffer, parse, store, synthesize, schedule, respond.

use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use super::expiry::ExpiryScheduler;
use crate::archive::{read_descriptor, Descriptor};
use crate::error::IngestError;
use crate::manifest;
use crate::store::naming::has_archive_extension;
use crate::store::{ArtifactNames, ArtifactStore, StagedUpload, StoreError};

/// Scheme prefix understood by iOS to fetch and install from a manifest.
const INSTALL_SCHEME: &str = "itms-services://?action=download-manifest&url=";

/// Successful upload as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installation {
    pub title: Option<String>,
    pub install_link: String,
}

pub struct Ingestor {
    store: Arc<dyn ArtifactStore>,
    scheduler: ExpiryScheduler,
    base_url: String,
}

impl Ingestor {
    /// `base_url` must not end with `/`.
    pub fn new(store: Arc<dyn ArtifactStore>, scheduler: ExpiryScheduler, base_url: String) -> Self {
        Self {
            store,
            scheduler,
            base_url,
        }
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Absolute URL under which `name` is served.
    pub fn public_url(&self, name: &str) -> String {
        format!("{}/files/{}", self.base_url, name)
    }

    /// Run one upload through the full lifecycle.
    ///
    /// The staging buffer is owned by this call and released on every path:
    /// renamed into the store on success, deleted on any earlier return.
    pub async fn ingest<S, E>(
        &self,
        file_name: Option<&str>,
        body: S,
    ) -> Result<Installation, IngestError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        IngestError: From<E>,
    {
        validate_file_name(file_name)?;

        let staged = self.store.stage()?;
        let size = buffer_body(&staged, body).await?;

        let descriptor = match extract(&staged).await? {
            Some(d) => d,
            None => return Err(IngestError::DescriptorMissing),
        };
        info!(
            "upload {} accepted: {} bytes, bundle={:?}",
            file_name.unwrap_or_default(),
            size,
            descriptor.identifier()
        );

        let names = ArtifactNames::for_descriptor(&descriptor);
        let archive = self.store.persist_archive(staged, &names.archive).await?;

        // From here on the upload has succeeded; later failures are logged only.
        let archive_url = self.public_url(&archive.name);
        match manifest::synthesize(&descriptor, &archive_url) {
            Ok(bytes) => {
                if let Err(e) = self.store.persist_manifest(&names.manifest, &bytes).await {
                    warn!("manifest {} not written: {}", names.manifest, e);
                }
            }
            Err(e) => warn!("manifest {} not synthesized: {}", names.manifest, e),
        }

        self.scheduler
            .schedule(vec![names.archive.clone(), names.manifest.clone()]);

        Ok(Installation {
            title: descriptor.title().map(str::to_string),
            install_link: install_link(&self.public_url(&names.manifest)),
        })
    }
}

pub fn install_link(manifest_url: &str) -> String {
    format!("{}{}", INSTALL_SCHEME, manifest_url)
}

fn validate_file_name(file_name: Option<&str>) -> Result<(), IngestError> {
    match file_name {
        None => Err(IngestError::NoFile),
        Some(name) if !has_archive_extension(name) => Err(IngestError::WrongExtension),
        Some(_) => Ok(()),
    }
}

async fn buffer_body<S, E>(staged: &StagedUpload, body: S) -> Result<u64, IngestError>
where
    S: Stream<Item = Result<Bytes, E>>,
    IngestError: From<E>,
{
    let handle = staged.as_file().try_clone().map_err(StoreError::from)?;
    let mut out = tokio::fs::File::from_std(handle);
    futures::pin_mut!(body);

    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        out.write_all(&chunk).await.map_err(StoreError::from)?;
        written += chunk.len() as u64;
    }
    out.flush().await.map_err(StoreError::from)?;
    Ok(written)
}

/// Parse the staged archive off the async runtime. Every parse failure
/// collapses into `None`.
async fn extract(staged: &StagedUpload) -> Result<Option<Descriptor>, IngestError> {
    let path = staged.path().to_path_buf();
    let result = tokio::task::spawn_blocking(move || read_descriptor(&path))
        .await
        .map_err(|e| IngestError::Internal(e.to_string()))?;
    match result {
        Ok(descriptor) => Ok(Some(descriptor)),
        Err(e) => {
            warn!("descriptor not found: {}", e);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::io::{Cursor, Write};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use plist::{Dictionary, Value};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use crate::store::{FsArtifactStore, StoredArtifact, StoredFile};

    fn ingestor(dir: &std::path::Path) -> Ingestor {
        let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(dir).unwrap());
        let scheduler = ExpiryScheduler::new(store.clone(), Duration::from_secs(300));
        Ingestor::new(store, scheduler, "https://ota.example.com".to_string())
    }

    fn body(data: Vec<u8>) -> impl Stream<Item = Result<Bytes, Infallible>> {
        futures::stream::iter(vec![Ok(Bytes::from(data))])
    }

    fn acme_ipa() -> Vec<u8> {
        let mut dict = Dictionary::new();
        dict.insert("CFBundleIdentifier".to_string(), "com.acme.app".into());
        dict.insert("CFBundleShortVersionString".to_string(), "2.1".into());
        dict.insert("CFBundleDisplayName".to_string(), "Acme".into());
        let mut plist = Vec::new();
        Value::Dictionary(dict).to_writer_binary(&mut plist).unwrap();

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("Payload/Acme.app/Info.plist", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(&plist).unwrap();
        writer.finish().unwrap().into_inner()
    }

    /// Filesystem store that can be told to fail either persist step.
    struct FailingStore {
        inner: FsArtifactStore,
        fail_archive: bool,
        fail_manifest: bool,
        purged: Mutex<Vec<String>>,
    }

    impl FailingStore {
        fn new(dir: &std::path::Path, fail_archive: bool, fail_manifest: bool) -> Self {
            Self {
                inner: FsArtifactStore::new(dir).unwrap(),
                fail_archive,
                fail_manifest,
                purged: Mutex::new(Vec::new()),
            }
        }
    }

    fn disk_full(dir: &std::path::Path) -> StoreError {
        StoreError::Io(std::io::Error::other(format!(
            "no space left writing {}",
            dir.display()
        )))
    }

    #[async_trait]
    impl ArtifactStore for FailingStore {
        fn stage(&self) -> Result<StagedUpload, StoreError> {
            self.inner.stage()
        }

        async fn persist_archive(
            &self,
            staged: StagedUpload,
            name: &str,
        ) -> Result<StoredArtifact, StoreError> {
            if self.fail_archive {
                let err = disk_full(staged.path());
                drop(staged);
                return Err(err);
            }
            self.inner.persist_archive(staged, name).await
        }

        async fn persist_manifest(
            &self,
            name: &str,
            bytes: &[u8],
        ) -> Result<StoredArtifact, StoreError> {
            if self.fail_manifest {
                return Err(disk_full(std::path::Path::new(name)));
            }
            self.inner.persist_manifest(name, bytes).await
        }

        async fn open(&self, name: &str) -> Result<Option<StoredFile>, StoreError> {
            self.inner.open(name).await
        }

        async fn purge(&self, names: &[String]) -> usize {
            self.purged.lock().unwrap().extend(names.iter().cloned());
            self.inner.purge(names).await
        }
    }

    fn failing_ingestor(store: Arc<FailingStore>, delay: Duration) -> Ingestor {
        let store: Arc<dyn ArtifactStore> = store;
        let scheduler = ExpiryScheduler::new(store.clone(), delay);
        Ingestor::new(store, scheduler, "https://ota.example.com".to_string())
    }

    #[test]
    fn test_validate_file_name() {
        assert!(matches!(validate_file_name(None), Err(IngestError::NoFile)));
        assert!(matches!(
            validate_file_name(Some("app.zip")),
            Err(IngestError::WrongExtension)
        ));
        assert!(validate_file_name(Some("Acme.IPA")).is_ok());
    }

    #[test]
    fn test_install_link() {
        assert_eq!(
            install_link("https://ota.example.com/files/a-1.0.plist"),
            "itms-services://?action=download-manifest&url=https://ota.example.com/files/a-1.0.plist"
        );
    }

    #[tokio::test]
    async fn test_wrong_extension_has_no_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let ingestor = ingestor(dir.path());
        let err = ingestor
            .ingest(Some("app.zip"), body(b"PK".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::WrongExtension));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_non_zip_upload_cleans_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let ingestor = ingestor(dir.path());
        let err = ingestor
            .ingest(Some("broken.ipa"), body(b"definitely not a zip".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::DescriptorMissing));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_manifest_failure_still_succeeds_and_expires_both() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FailingStore::new(dir.path(), false, true));
        let ingestor = failing_ingestor(store.clone(), Duration::from_millis(50));

        let installation = ingestor
            .ingest(Some("Acme.ipa"), body(acme_ipa()))
            .await
            .unwrap();
        assert_eq!(installation.title.as_deref(), Some("Acme"));
        assert_eq!(
            installation.install_link,
            "itms-services://?action=download-manifest&url=https://ota.example.com/files/com.acme.app-2.1.plist"
        );
        assert!(dir.path().join("com.acme.app-2.1.ipa").exists());
        assert!(!dir.path().join("com.acme.app-2.1.plist").exists());

        tokio::time::sleep(Duration::from_millis(500)).await;
        let mut purged = store.purged.lock().unwrap().clone();
        purged.sort();
        assert_eq!(purged, vec!["com.acme.app-2.1.ipa", "com.acme.app-2.1.plist"]);
        assert!(!dir.path().join("com.acme.app-2.1.ipa").exists());
    }

    #[tokio::test]
    async fn test_archive_failure_is_generic_and_cleans_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FailingStore::new(dir.path(), true, false));
        let ingestor = failing_ingestor(store.clone(), Duration::from_millis(50));

        let err = ingestor
            .ingest(Some("Acme.ipa"), body(acme_ipa()))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Storage(_)));
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Failed to store upload");
        assert!(!err
            .public_message()
            .contains(dir.path().to_string_lossy().as_ref()));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        // Nothing was stored, so nothing is scheduled.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(store.purged.lock().unwrap().is_empty());
    }
}
