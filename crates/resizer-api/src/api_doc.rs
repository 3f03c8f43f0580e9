//! OpenAPI documentation, served at `/api/openapi.json` and rendered at `/docs`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use resizer_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Resizer API",
        version = "0.1.0",
        description = "Upload an image, resize and re-encode it (jpeg, png, webp, gif), optionally strip a light background to transparency, then download the result. Processed files expire after the retention period."
    ),
    paths(
        handlers::resize::resize_image,
        handlers::download::download_artifact,
        handlers::download::delete_artifact,
        handlers::health::health_check,
    ),
    components(
        schemas(
            error::ErrorResponse,
            handlers::resize::ResizeResponse,
            handlers::health::HealthResponse,
            models::OutputFormat,
        )
    ),
    tags(
        (name = "resize", description = "Image resizing"),
        (name = "download", description = "Processed file retrieval and removal"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;
