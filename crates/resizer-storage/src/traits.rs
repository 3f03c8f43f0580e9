//! Artifact store abstraction
//!
//! This module defines the `ArtifactStore` trait implemented by storage backends.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use resizer_core::{ArtifactKind, ArtifactRef};
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid artifact name: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Chunked artifact content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Storage for uploaded and processed artifacts
///
/// The store owns the artifact lifecycle. Callers never choose names: `store`
/// generates one and returns it in the `ArtifactRef`.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist `data` as a new artifact of `kind` with the given extension.
    ///
    /// The artifact becomes visible atomically once fully written.
    async fn store(
        &self,
        kind: ArtifactKind,
        extension: &str,
        data: Bytes,
    ) -> StorageResult<ArtifactRef>;

    /// Read a whole artifact. Unknown or invalid names yield `NotFound`.
    async fn retrieve(&self, kind: ArtifactKind, name: &str) -> StorageResult<Bytes>;

    /// Open an artifact for streaming. Unknown or invalid names yield `NotFound`.
    async fn retrieve_stream(
        &self,
        kind: ArtifactKind,
        name: &str,
    ) -> StorageResult<(ArtifactRef, ByteStream)>;

    /// Remove an artifact. Missing artifacts are a no-op; invalid names yield `InvalidKey`.
    async fn delete(&self, kind: ArtifactKind, name: &str) -> StorageResult<()>;

    /// Enumerate the complete artifacts of `kind`.
    async fn list(&self, kind: ArtifactKind) -> StorageResult<Vec<ArtifactRef>>;

    /// Enumerate partial files of `kind`. A write in progress shows up here
    /// briefly; anything old was orphaned by an interrupted write.
    async fn list_partials(&self, kind: ArtifactKind) -> StorageResult<Vec<ArtifactRef>>;

    /// Remove a partial file returned by `list_partials`. Missing files are a
    /// no-op; names that are not partial files yield `InvalidKey`.
    async fn delete_partial(&self, kind: ArtifactKind, name: &str) -> StorageResult<()>;
}
