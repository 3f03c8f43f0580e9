use resizer_core::{ArtifactKind, ArtifactRef};
use resizer_storage::ArtifactStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::clock::Clock;

/// Counters for one namespace in one sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceSweep {
    pub kind: ArtifactKind,
    pub scanned: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// Outcome of a single sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub namespaces: Vec<NamespaceSweep>,
}

impl SweepReport {
    pub fn deleted(&self) -> usize {
        self.namespaces.iter().map(|n| n.deleted).sum()
    }

    pub fn failed(&self) -> usize {
        self.namespaces.iter().map(|n| n.failed).sum()
    }
}

/// Deletes artifacts older than the retention period
pub struct RetentionSweeper {
    store: Arc<dyn ArtifactStore>,
    clock: Arc<dyn Clock>,
    retention: Duration,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        clock: Arc<dyn Clock>,
        retention: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            retention,
            interval,
        }
    }

    /// Start the background sweep loop.
    ///
    /// The first sweep runs one interval after start. Returns a JoinHandle
    /// for graceful shutdown.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            // A zero period would make interval_at panic.
            let period = self.interval.max(Duration::from_millis(1));
            let mut sweep_interval = interval_at(Instant::now() + period, period);
            sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(
                interval_ms = period.as_millis() as u64,
                retention_secs = self.retention.as_secs(),
                "Retention sweeper started"
            );

            loop {
                sweep_interval.tick().await;
                self.sweep_once().await;
            }
        })
    }

    fn is_expired(&self, artifact: &ArtifactRef, now: chrono::DateTime<chrono::Utc>) -> bool {
        artifact
            .age(now)
            .to_std()
            .map(|age| age > self.retention)
            .unwrap_or(false)
    }

    /// Remove partial files older than the retention period. A partial file
    /// that old was left by a write that never finished.
    async fn sweep_partials(
        &self,
        kind: ArtifactKind,
        now: chrono::DateTime<chrono::Utc>,
        summary: &mut NamespaceSweep,
    ) {
        let partials = match self.store.list_partials(kind).await {
            Ok(partials) => partials,
            Err(e) => {
                tracing::error!(kind = %kind, error = %e, "Failed to list partial artifacts");
                summary.failed += 1;
                return;
            }
        };

        for partial in partials {
            summary.scanned += 1;
            if !self.is_expired(&partial, now) {
                continue;
            }

            match self.store.delete_partial(kind, &partial.name).await {
                Ok(()) => {
                    summary.deleted += 1;
                    tracing::warn!(
                        kind = %kind,
                        name = %partial.name,
                        created_at = %partial.created_at,
                        "Deleted orphaned partial artifact"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(
                        kind = %kind,
                        name = %partial.name,
                        error = %e,
                        "Failed to delete orphaned partial artifact, continuing"
                    );
                }
            }
        }
    }

    /// Run a single sweep over every namespace.
    ///
    /// Failures on individual artifacts are logged and skipped.
    #[tracing::instrument(skip(self), fields(cleanup.operation = "expire_artifacts"))]
    pub async fn sweep_once(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        for kind in ArtifactKind::ALL {
            let mut summary = NamespaceSweep {
                kind,
                scanned: 0,
                deleted: 0,
                failed: 0,
            };

            let artifacts = match self.store.list(kind).await {
                Ok(artifacts) => artifacts,
                Err(e) => {
                    tracing::error!(kind = %kind, error = %e, "Failed to list artifacts");
                    summary.failed += 1;
                    report.namespaces.push(summary);
                    continue;
                }
            };

            for artifact in artifacts {
                summary.scanned += 1;
                if !self.is_expired(&artifact, now) {
                    continue;
                }

                match self.store.delete(kind, &artifact.name).await {
                    Ok(()) => {
                        summary.deleted += 1;
                        tracing::debug!(
                            kind = %kind,
                            name = %artifact.name,
                            created_at = %artifact.created_at,
                            "Deleted expired artifact"
                        );
                    }
                    Err(e) => {
                        summary.failed += 1;
                        tracing::error!(
                            kind = %kind,
                            name = %artifact.name,
                            error = %e,
                            "Failed to delete expired artifact, continuing"
                        );
                    }
                }
            }

            self.sweep_partials(kind, now, &mut summary).await;

            tracing::info!(
                kind = %kind,
                scanned = summary.scanned,
                deleted = summary.deleted,
                failed = summary.failed,
                "Namespace sweep completed"
            );
            report.namespaces.push(summary);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::ManualClock;
    use bytes::Bytes;
    use resizer_storage::{ByteStream, LocalArtifactStore, StorageError, StorageResult};
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(3600);

    async fn local_store() -> (TempDir, Arc<LocalArtifactStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalArtifactStore::new(dir.path()).await.unwrap());
        (dir, store)
    }

    #[tokio::test]
    async fn test_expired_artifact_removed_after_retention() {
        let (_dir, store) = local_store().await;
        let artifact = store
            .store(ArtifactKind::Processed, "png", Bytes::from_static(b"png"))
            .await
            .unwrap();

        let clock = Arc::new(ManualClock::new(artifact.created_at));
        let sweeper = RetentionSweeper::new(store.clone(), clock.clone(), HOUR, HOUR);

        // Still fresh
        let report = sweeper.sweep_once().await;
        assert_eq!(report.deleted(), 0);

        clock.advance(chrono::Duration::minutes(61));
        let report = sweeper.sweep_once().await;
        assert_eq!(report.deleted(), 1);
        assert_eq!(report.failed(), 0);

        let result = store
            .retrieve(ArtifactKind::Processed, &artifact.name)
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sweeps_both_namespaces() {
        let (_dir, store) = local_store().await;
        let old_upload = store
            .store(ArtifactKind::Uploaded, "jpg", Bytes::from_static(b"a"))
            .await
            .unwrap();
        let old_output = store
            .store(ArtifactKind::Processed, "jpeg", Bytes::from_static(b"b"))
            .await
            .unwrap();

        let clock = Arc::new(ManualClock::new(
            old_upload.created_at.max(old_output.created_at) + chrono::Duration::minutes(61),
        ));
        let sweeper = RetentionSweeper::new(store.clone(), clock, HOUR, HOUR);

        let report = sweeper.sweep_once().await;
        assert_eq!(report.namespaces.len(), 2);
        assert_eq!(report.deleted(), 2);
        assert!(store.list(ArtifactKind::Uploaded).await.unwrap().is_empty());
        assert!(store.list(ArtifactKind::Processed).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exactly_at_retention_is_kept() {
        let (_dir, store) = local_store().await;
        let artifact = store
            .store(ArtifactKind::Processed, "gif", Bytes::from_static(b"g"))
            .await
            .unwrap();

        let clock = Arc::new(ManualClock::new(
            artifact.created_at + chrono::Duration::hours(1),
        ));
        let sweeper = RetentionSweeper::new(store.clone(), clock, HOUR, HOUR);

        assert_eq!(sweeper.sweep_once().await.deleted(), 0);
    }

    /// Store whose deletes fail for one name
    struct FailingDeleteStore {
        inner: Arc<LocalArtifactStore>,
        poisoned: String,
    }

    #[async_trait::async_trait]
    impl ArtifactStore for FailingDeleteStore {
        async fn store(
            &self,
            kind: ArtifactKind,
            extension: &str,
            data: Bytes,
        ) -> StorageResult<ArtifactRef> {
            self.inner.store(kind, extension, data).await
        }

        async fn retrieve(&self, kind: ArtifactKind, name: &str) -> StorageResult<Bytes> {
            self.inner.retrieve(kind, name).await
        }

        async fn retrieve_stream(
            &self,
            kind: ArtifactKind,
            name: &str,
        ) -> StorageResult<(ArtifactRef, ByteStream)> {
            self.inner.retrieve_stream(kind, name).await
        }

        async fn delete(&self, kind: ArtifactKind, name: &str) -> StorageResult<()> {
            if name == self.poisoned {
                return Err(StorageError::DeleteFailed("permission denied".to_string()));
            }
            self.inner.delete(kind, name).await
        }

        async fn list(&self, kind: ArtifactKind) -> StorageResult<Vec<ArtifactRef>> {
            self.inner.list(kind).await
        }

        async fn list_partials(&self, kind: ArtifactKind) -> StorageResult<Vec<ArtifactRef>> {
            self.inner.list_partials(kind).await
        }

        async fn delete_partial(&self, kind: ArtifactKind, name: &str) -> StorageResult<()> {
            self.inner.delete_partial(kind, name).await
        }
    }

    #[tokio::test]
    async fn test_per_file_failures_are_isolated() {
        let (_dir, local) = local_store().await;
        let a = local
            .store(ArtifactKind::Processed, "png", Bytes::from_static(b"a"))
            .await
            .unwrap();
        let b = local
            .store(ArtifactKind::Processed, "png", Bytes::from_static(b"b"))
            .await
            .unwrap();

        let store = Arc::new(FailingDeleteStore {
            inner: local.clone(),
            poisoned: a.name.clone(),
        });
        let clock = Arc::new(ManualClock::new(
            a.created_at.max(b.created_at) + chrono::Duration::hours(2),
        ));
        let sweeper = RetentionSweeper::new(store, clock, HOUR, HOUR);

        let report = sweeper.sweep_once().await;
        assert_eq!(report.deleted(), 1);
        assert_eq!(report.failed(), 1);

        let remaining = local.list(ArtifactKind::Processed).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, a.name);
    }

    #[tokio::test]
    async fn test_orphaned_partials_are_swept() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalArtifactStore::new(dir.path()).await.unwrap());
        let orphan = dir.path().join("processed").join(".partial-resized-1-dead.png");
        std::fs::write(&orphan, b"half written").unwrap();

        let partial = store
            .list_partials(ArtifactKind::Processed)
            .await
            .unwrap()
            .remove(0);

        // A fresh partial may be a write in progress
        let clock = Arc::new(ManualClock::new(partial.created_at));
        let sweeper = RetentionSweeper::new(store.clone(), clock.clone(), HOUR, HOUR);
        assert_eq!(sweeper.sweep_once().await.deleted(), 0);
        assert!(orphan.exists());

        clock.advance(chrono::Duration::days(30));
        let report = sweeper.sweep_once().await;
        assert_eq!(report.deleted(), 1);
        assert_eq!(report.failed(), 0);
        assert!(!orphan.exists());
        assert!(store
            .list_partials(ArtifactKind::Processed)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_background_task_sweeps_on_interval() {
        let (_dir, store) = local_store().await;
        let artifact = store
            .store(ArtifactKind::Processed, "png", Bytes::from_static(b"x"))
            .await
            .unwrap();

        let clock = Arc::new(ManualClock::new(
            artifact.created_at + chrono::Duration::hours(2),
        ));
        let sweeper = Arc::new(RetentionSweeper::new(
            store.clone(),
            clock,
            HOUR,
            Duration::from_millis(20),
        ));
        let handle = sweeper.start();

        let mut remaining = 1;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            remaining = store.list(ArtifactKind::Processed).await.unwrap().len();
            if remaining == 0 {
                break;
            }
        }
        handle.abort();
        assert_eq!(remaining, 0);
    }
}
