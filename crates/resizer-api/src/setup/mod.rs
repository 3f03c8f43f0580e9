//! Application setup and initialization
//!
//! Bootstrap is split out of main.rs so integration tests can build the same
//! state and router without installing a global subscriber or a listener.

pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::{Context, Result};
use resizer_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    crate::error::configure_error_details(config.is_production());

    let state = services::initialize_services(&config).await?;
    state.start_background_tasks();

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
