use resizer_core::Config;
use resizer_services::{ArtifactStore, RetentionSweeper, TransformPipeline};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Shared application state, constructed once at startup
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ArtifactStore>,
    pub pipeline: Arc<TransformPipeline>,
    /// `None` when the sweep interval is configured to 0
    pub sweeper: Option<Arc<RetentionSweeper>>,
    background_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn ArtifactStore>,
        pipeline: Arc<TransformPipeline>,
        sweeper: Option<Arc<RetentionSweeper>>,
    ) -> Self {
        Self {
            config,
            store,
            pipeline,
            sweeper,
            background_tasks: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the retention sweeper, if configured.
    pub fn start_background_tasks(&self) {
        let Some(sweeper) = self.sweeper.clone() else {
            tracing::info!("Retention sweeper disabled");
            return;
        };
        let handle = sweeper.start();
        self.background_tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(handle);
    }

    /// Abort every background task started by [`AppState::start_background_tasks`].
    pub fn shutdown_background_tasks(&self) {
        let handles: Vec<_> = self
            .background_tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect();

        for handle in &handles {
            handle.abort();
        }
        if !handles.is_empty() {
            tracing::info!(tasks = handles.len(), "Background tasks stopped");
        }
    }
}
