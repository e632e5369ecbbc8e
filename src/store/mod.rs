// Artifact storage: flat, unsynchronized namespace of archive/manifest pairs.

pub mod fs_store;
pub mod naming;
pub mod traits;

pub use fs_store::FsArtifactStore;
pub use naming::ArtifactNames;
pub use traits::{ArtifactStore, StagedUpload, StoreError, StoredArtifact, StoredFile};
