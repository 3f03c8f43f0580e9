//! Construction of the artifact store, transform pipeline and sweeper

use crate::state::AppState;
use anyhow::{Context, Result};
use resizer_core::Config;
use resizer_services::{
    ArtifactStore, DecodeLimits, LocalArtifactStore, MediaValidator, RetentionSweeper,
    SystemClock, TransformPipeline,
};
use std::sync::Arc;

pub async fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let store: Arc<dyn ArtifactStore> = Arc::new(
        LocalArtifactStore::new(config.artifact_root().clone())
            .await
            .with_context(|| {
                format!(
                    "Failed to initialize artifact store at {}",
                    config.artifact_root().display()
                )
            })?,
    );
    tracing::info!(root = %config.artifact_root().display(), "Artifact store ready");

    let validator = MediaValidator::new(
        config.max_file_size_bytes(),
        config.allowed_extensions().to_vec(),
        config.allowed_content_types().to_vec(),
    );
    let limits = DecodeLimits {
        max_dimension: config.max_image_dimension(),
        max_alloc_bytes: config.max_decode_alloc_bytes(),
    };
    let pipeline = Arc::new(TransformPipeline::new(store.clone(), validator, limits));

    let sweeper = config.sweep_interval().map(|interval| {
        Arc::new(RetentionSweeper::new(
            store.clone(),
            Arc::new(SystemClock),
            config.artifact_retention(),
            interval,
        ))
    });

    Ok(Arc::new(AppState::new(
        config.clone(),
        store,
        pipeline,
        sweeper,
    )))
}
