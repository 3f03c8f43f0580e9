use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use resizer_core::{AppError, ArtifactKind, OutputFormat};
use resizer_services::StorageError;
use std::sync::Arc;

fn content_type_for(name: &str) -> &'static str {
    name.rsplit_once('.')
        .and_then(|(_, ext)| OutputFormat::from_extension(ext))
        .map(|format| format.content_type())
        .unwrap_or("application/octet-stream")
}

#[utoipa::path(
    get,
    path = "/download/{filename}",
    tag = "download",
    params(
        ("filename" = String, Path, description = "Processed file name from the resize response")
    ),
    responses(
        (status = 200, description = "Processed image as an attachment", content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn download_artifact(
    Path(filename): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let (artifact, stream) = state
        .store
        .retrieve_stream(ArtifactKind::Processed, &filename)
        .await
        .map_err(|e| match e {
            StorageError::NotFound(_) => {
                HttpAppError(AppError::NotFound("File not found".to_string()))
            }
            other => {
                tracing::error!(error = %other, name = %filename, "Failed to open artifact");
                HttpAppError::from(other)
            }
        })?;

    tracing::debug!(
        name = %artifact.name,
        size_bytes = artifact.size_bytes,
        "Streaming artifact"
    );

    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(&artifact.name))
        .header(header::CONTENT_LENGTH, artifact.size_bytes)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.name),
        )
        .body(Body::from_stream(body_stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// Remove a processed file before it expires
#[utoipa::path(
    delete,
    path = "/download/{filename}",
    tag = "download",
    params(
        ("filename" = String, Path, description = "Processed file name")
    ),
    responses(
        (status = 204, description = "File removed (or already gone)"),
        (status = 400, description = "Invalid file name", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn delete_artifact(
    Path(filename): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, HttpAppError> {
    state
        .store
        .delete(ArtifactKind::Processed, &filename)
        .await?;

    tracing::info!(name = %filename, kind = %ArtifactKind::Processed, "Artifact removed");
    Ok(StatusCode::NO_CONTENT)
}
