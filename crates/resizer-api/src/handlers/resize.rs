use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use resizer_core::{ArtifactKind, OutputFormat};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::extract_resize_form;

/// Body of a successful resize
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResizeResponse {
    pub success: bool,
    /// Filename of the upload as sent by the client
    pub original_file: String,
    /// Name the original was kept under in the uploads namespace
    pub stored_original: String,
    /// Stored name of the processed output
    pub resized_file: String,
    /// Output size in kilobytes, rounded
    pub file_size: u64,
    pub download_url: String,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

/// Resize an uploaded image
///
/// Validates the upload, then decodes, resizes, applies the optional
/// transparency mask and encodes the result. The original is kept only once
/// the processed file exists, so a failed resize leaves nothing behind. The
/// processed file is available under `downloadUrl` until the retention sweeper
/// removes it.
#[utoipa::path(
    post,
    path = "/resize",
    tag = "resize",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image resized", body = ResizeResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Error processing image", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "resize_image"))]
pub async fn resize_image(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ResizeResponse>, HttpAppError> {
    let (upload, spec) = extract_resize_form(multipart).await?;

    tracing::debug!(
        filename = %upload.original_filename,
        content_type = %upload.content_type,
        size_bytes = upload.size,
        width = ?spec.width(),
        height = ?spec.height(),
        quality = spec.quality(),
        format = %spec.effective_format(),
        "Resize requested"
    );

    let validated = state.pipeline.validate(upload)?;
    let result = state.pipeline.transform_validated(&validated, &spec).await?;

    let original = match state.pipeline.store_original(&validated).await {
        Ok(original) => original,
        Err(e) => {
            // Roll back the processed file so the request leaves no artifacts
            if let Err(cleanup_err) = state
                .store
                .delete(ArtifactKind::Processed, &result.artifact.name)
                .await
            {
                tracing::warn!(
                    error = %cleanup_err,
                    name = %result.artifact.name,
                    "Failed to remove processed artifact after storing the original failed"
                );
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        original = %validated.original_filename(),
        extension = %validated.extension(),
        stored_original = %original.name,
        resized = %result.artifact.name,
        "Resize completed"
    );

    Ok(Json(ResizeResponse {
        success: true,
        original_file: validated.original_filename().to_string(),
        stored_original: original.name,
        resized_file: result.artifact.name,
        file_size: result.size_kb,
        download_url: result.download_url,
        format: result.format,
        width: result.width,
        height: result.height,
    }))
}
