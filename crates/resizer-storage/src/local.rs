use crate::keys;
use crate::traits::{ArtifactStore, ByteStream, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use resizer_core::{ArtifactKind, ArtifactRef};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem artifact store
#[derive(Clone, Debug)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    /// Create the store and its per-kind directories
    ///
    /// # Arguments
    /// * `root` - Root directory for artifacts (e.g., "./data")
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();

        for kind in ArtifactKind::ALL {
            let dir = root.join(kind.dir_name());
            fs::create_dir_all(&dir).await.map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create artifact directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        tracing::debug!(root = %root.display(), "Local artifact store ready");

        Ok(LocalArtifactStore { root })
    }

    fn kind_dir(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// Resolve a client-supplied name to a path inside the kind directory.
    ///
    /// Returns `None` when the name could escape the directory or addresses a
    /// partial file.
    fn name_to_path(&self, kind: ArtifactKind, name: &str) -> Option<PathBuf> {
        if !keys::is_valid_name(name) {
            return None;
        }
        Some(self.kind_dir(kind).join(name))
    }

    async fn write_partial(path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to create file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        Ok(())
    }

    async fn discard_partial(path: &Path) {
        if let Err(e) = fs::remove_file(path).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to remove partial artifact"
                );
            }
        }
    }

    /// Regular files of `kind` whose names pass `accept`.
    async fn scan(
        &self,
        kind: ArtifactKind,
        accept: fn(&str) -> bool,
    ) -> StorageResult<Vec<ArtifactRef>> {
        let dir = self.kind_dir(kind);
        let mut entries = fs::read_dir(&dir).await.map_err(|e| {
            StorageError::BackendError(format!("Failed to read {}: {}", dir.display(), e))
        })?;

        let mut artifacts = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !accept(&name) {
                continue;
            }

            // Entries may vanish between read_dir and stat.
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::debug!(name = %name, error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            artifacts.push(Self::to_artifact_ref(kind, name, &metadata));
        }

        Ok(artifacts)
    }

    fn to_artifact_ref(kind: ArtifactKind, name: String, metadata: &std::fs::Metadata) -> ArtifactRef {
        ArtifactRef {
            name,
            kind,
            size_bytes: metadata.len(),
            created_at: file_time(metadata),
        }
    }
}

/// Modification time of the file; artifacts are never rewritten once renamed
/// into place so this equals their creation time.
fn file_time(metadata: &std::fs::Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .or_else(|_| metadata.created())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

fn not_found(kind: ArtifactKind, name: &str) -> StorageError {
    StorageError::NotFound(format!("{}/{}", kind.dir_name(), name))
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn store(
        &self,
        kind: ArtifactKind,
        extension: &str,
        data: Bytes,
    ) -> StorageResult<ArtifactRef> {
        let name = keys::generate_name(kind, extension)?;
        let dir = self.kind_dir(kind);
        let partial_path = dir.join(keys::partial_name(&name));
        let path = dir.join(&name);
        let start = Instant::now();

        if let Err(e) = Self::write_partial(&partial_path, &data).await {
            Self::discard_partial(&partial_path).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&partial_path, &path).await {
            Self::discard_partial(&partial_path).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to move {} into place: {}",
                path.display(),
                e
            )));
        }

        let metadata = fs::metadata(&path).await?;
        let artifact = Self::to_artifact_ref(kind, name, &metadata);

        tracing::info!(
            path = %path.display(),
            name = %artifact.name,
            kind = %kind,
            size_bytes = artifact.size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local artifact store write successful"
        );

        Ok(artifact)
    }

    async fn retrieve(&self, kind: ArtifactKind, name: &str) -> StorageResult<Bytes> {
        let path = self.name_to_path(kind, name).ok_or_else(|| not_found(kind, name))?;
        let start = Instant::now();

        let data = fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => not_found(kind, name),
            _ => StorageError::DownloadFailed(format!(
                "Failed to read file {}: {}",
                path.display(),
                e
            )),
        })?;

        tracing::debug!(
            path = %path.display(),
            name = %name,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local artifact store read successful"
        );

        Ok(Bytes::from(data))
    }

    async fn retrieve_stream(
        &self,
        kind: ArtifactKind,
        name: &str,
    ) -> StorageResult<(ArtifactRef, ByteStream)> {
        let path = self.name_to_path(kind, name).ok_or_else(|| not_found(kind, name))?;

        let file = fs::File::open(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => not_found(kind, name),
            _ => StorageError::DownloadFailed(format!(
                "Failed to open file {}: {}",
                path.display(),
                e
            )),
        })?;

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(not_found(kind, name));
        }
        let artifact = Self::to_artifact_ref(kind, name.to_string(), &metadata);

        let path_display = path.display().to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |result| {
            result.map_err(|e| {
                tracing::error!(
                    path = %path_display,
                    error = %e,
                    "Local artifact stream read error"
                );
                StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        Ok((artifact, Box::pin(stream)))
    }

    async fn delete(&self, kind: ArtifactKind, name: &str) -> StorageResult<()> {
        let path = self.name_to_path(kind, name).ok_or_else(|| {
            StorageError::InvalidKey(format!("Artifact name '{}' is not valid", name))
        })?;
        let start = Instant::now();

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        tracing::info!(
            path = %path.display(),
            name = %name,
            kind = %kind,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local artifact store delete successful"
        );

        Ok(())
    }

    async fn list(&self, kind: ArtifactKind) -> StorageResult<Vec<ArtifactRef>> {
        self.scan(kind, keys::is_valid_name).await
    }

    async fn list_partials(&self, kind: ArtifactKind) -> StorageResult<Vec<ArtifactRef>> {
        self.scan(kind, keys::is_partial_name).await
    }

    async fn delete_partial(&self, kind: ArtifactKind, name: &str) -> StorageResult<()> {
        if !keys::is_partial_name(name) {
            return Err(StorageError::InvalidKey(format!(
                "'{}' is not a partial artifact",
                name
            )));
        }
        let path = self.kind_dir(kind).join(name);

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), kind = %kind, "Removed stale partial artifact");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::tempdir;

    async fn store() -> (tempfile::TempDir, LocalArtifactStore) {
        let dir = tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_namespaces_created() {
        let (dir, _store) = store().await;
        assert!(dir.path().join("uploads").is_dir());
        assert!(dir.path().join("processed").is_dir());
    }

    #[tokio::test]
    async fn test_store_retrieve_roundtrip() {
        let (dir, store) = store().await;
        let data = Bytes::from_static(b"not really a png");

        let artifact = store
            .store(ArtifactKind::Processed, "png", data.clone())
            .await
            .unwrap();

        assert!(artifact.name.starts_with("resized-"));
        assert_eq!(artifact.size_bytes, data.len() as u64);
        assert!(dir.path().join("processed").join(&artifact.name).is_file());

        let read = store
            .retrieve(ArtifactKind::Processed, &artifact.name)
            .await
            .unwrap();
        assert_eq!(read, data);

        // Namespaces are disjoint
        let result = store.retrieve(ArtifactKind::Uploaded, &artifact.name).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_no_partial_files_left_behind() {
        let (dir, store) = store().await;
        store
            .store(ArtifactKind::Uploaded, "jpg", Bytes::from_static(b"abc"))
            .await
            .unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("uploads"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with(keys::PARTIAL_PREFIX)
            })
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_stream_matches_content() {
        let (_dir, store) = store().await;
        let data = Bytes::from(vec![7u8; 200_000]);
        let artifact = store
            .store(ArtifactKind::Processed, "webp", data.clone())
            .await
            .unwrap();

        let (meta, mut stream) = store
            .retrieve_stream(ArtifactKind::Processed, &artifact.name)
            .await
            .unwrap();
        assert_eq!(meta.size_bytes, data.len() as u64);

        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, data.to_vec());
    }

    #[tokio::test]
    async fn test_traversal_and_partial_names_not_found() {
        let (dir, store) = store().await;
        std::fs::write(dir.path().join("secret.txt"), b"secret").unwrap();
        std::fs::write(
            dir.path().join("processed").join(keys::partial_name("x.png")),
            b"partial",
        )
        .unwrap();

        for name in ["../secret.txt", "..", "a/b", "x\0y", ".partial-x.png", ""] {
            let result = store.retrieve(ArtifactKind::Processed, name).await;
            assert!(
                matches!(result, Err(StorageError::NotFound(_))),
                "expected NotFound for {:?}",
                name
            );
            let result = store.retrieve_stream(ArtifactKind::Processed, name).await;
            assert!(matches!(result, Err(StorageError::NotFound(_))));
        }
    }

    #[tokio::test]
    async fn test_delete_semantics() {
        let (_dir, store) = store().await;
        let artifact = store
            .store(ArtifactKind::Processed, "gif", Bytes::from_static(b"GIF89a"))
            .await
            .unwrap();

        store
            .delete(ArtifactKind::Processed, &artifact.name)
            .await
            .unwrap();
        let result = store.retrieve(ArtifactKind::Processed, &artifact.name).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));

        // Deleting again is a no-op
        store
            .delete(ArtifactKind::Processed, &artifact.name)
            .await
            .unwrap();

        let result = store.delete(ArtifactKind::Processed, "../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_list_skips_partials_and_directories() {
        let (dir, store) = store().await;
        let a = store
            .store(ArtifactKind::Uploaded, "png", Bytes::from_static(b"a"))
            .await
            .unwrap();
        std::fs::write(
            dir.path().join("uploads").join(keys::partial_name("b.png")),
            b"b",
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("uploads").join("nested")).unwrap();

        let listed = store.list(ArtifactKind::Uploaded).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, a.name);
        assert!(store.list(ArtifactKind::Processed).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partials_listed_and_deleted_separately() {
        let (dir, store) = store().await;
        let artifact = store
            .store(ArtifactKind::Processed, "png", Bytes::from_static(b"done"))
            .await
            .unwrap();
        let orphan = keys::partial_name("resized-1-dead.png");
        std::fs::write(dir.path().join("processed").join(&orphan), b"half").unwrap();

        let partials = store.list_partials(ArtifactKind::Processed).await.unwrap();
        assert_eq!(partials.len(), 1);
        assert_eq!(partials[0].name, orphan);
        assert_eq!(partials[0].size_bytes, 4);

        // Complete artifacts are not partials and cannot be removed through this path
        let result = store
            .delete_partial(ArtifactKind::Processed, &artifact.name)
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        store
            .delete_partial(ArtifactKind::Processed, &orphan)
            .await
            .unwrap();
        assert!(store
            .list_partials(ArtifactKind::Processed)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(store.list(ArtifactKind::Processed).await.unwrap().len(), 1);

        // Already gone
        store
            .delete_partial(ArtifactKind::Processed, &orphan)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_stores_get_unique_names() {
        let (_dir, store) = store().await;
        let store = Arc::new(store);

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .store(ArtifactKind::Processed, "jpeg", Bytes::from(vec![i as u8; 16]))
                        .await
                        .unwrap()
                        .name
                })
            })
            .collect();

        let mut names = HashSet::new();
        for handle in handles {
            names.insert(handle.await.unwrap());
        }
        assert_eq!(names.len(), 32);
        assert_eq!(store.list(ArtifactKind::Processed).await.unwrap().len(), 32);
    }
}
