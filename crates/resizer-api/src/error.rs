//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Library errors
//! (`StorageError`, `ValidationError`, `TransformError`) convert into
//! `HttpAppError` through the `From` impls below so every failure renders the
//! same JSON shape and is logged at the level its `ErrorMetadata` asks for.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use resizer_core::{AppError, ErrorMetadata, LogLevel};
use resizer_services::{StorageError, TransformError, ValidationError};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use utoipa::ToSchema;

/// Set once at startup from `Config::is_production`
static HIDE_ERROR_DETAILS: AtomicBool = AtomicBool::new(false);

/// Record whether error bodies may carry details. Called during app setup.
pub fn configure_error_details(is_production: bool) {
    HIDE_ERROR_DETAILS.store(is_production, Ordering::Relaxed);
}

fn details_visible(hide_details: bool, sensitive: bool) -> bool {
    !hide_details && !sensitive
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorResponse {
    fn from_app_error(error: &AppError, with_details: bool) -> Self {
        Self {
            error: error.client_message(),
            details: with_details.then(|| error.detailed_message()),
            error_type: with_details.then(|| error.error_type().to_string()),
            code: error.error_code().to_string(),
            recoverable: error.is_recoverable(),
            suggested_action: error.suggested_action().map(String::from),
        }
    }
}

/// Wrapper type for AppError to implement IntoResponse.
/// IntoResponse is foreign and so is AppError (it lives in resizer-core).
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(
                error = %error.detailed_message(),
                error_type = error_type,
                "Error occurred"
            );
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Details never leave the server in production or for sensitive errors.
        let with_details = details_visible(
            HIDE_ERROR_DETAILS.load(Ordering::Relaxed),
            app_error.is_sensitive(),
        );
        let body = ErrorResponse::from_app_error(app_error, with_details);

        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app = match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::UploadFailed(msg) => AppError::ProcessingFailure(msg),
            StorageError::DownloadFailed(msg)
            | StorageError::DeleteFailed(msg)
            | StorageError::BackendError(msg) => AppError::Internal(msg),
            StorageError::IoError(err) => AppError::Internal(format!("IO error: {}", err)),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
        };
        HttpAppError(app)
    }
}

impl From<ValidationError> for HttpAppError {
    fn from(err: ValidationError) -> Self {
        let app = match err {
            ValidationError::FileTooLarge { size, max } => {
                AppError::PayloadTooLarge(format!("{} bytes exceeds max {} bytes", size, max))
            }
            ValidationError::InvalidExtension { extension, allowed } => AppError::InvalidInput(
                format!("Invalid extension '{}', allowed: {:?}", extension, allowed),
            ),
            ValidationError::InvalidContentType {
                content_type,
                allowed,
            } => AppError::InvalidInput(format!(
                "Invalid content type '{}', allowed: {:?}",
                content_type, allowed
            )),
            ValidationError::InvalidFilename(msg) => AppError::InvalidInput(msg),
            ValidationError::EmptyFile => AppError::InvalidInput("File is empty".to_string()),
        };
        HttpAppError(app)
    }
}

impl From<TransformError> for HttpAppError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::InvalidInput(e) => e.into(),
            TransformError::DecodeFailure(msg) => HttpAppError(AppError::DecodeFailure(msg)),
            TransformError::ProcessingFailure { stage, message } => HttpAppError(
                AppError::ProcessingFailure(format!("after stage {}: {}", stage, message)),
            ),
            TransformError::Storage(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resizer_services::PipelineStage;

    #[test]
    fn test_from_storage_error_not_found() {
        let storage_err = StorageError::NotFound("File not found".to_string());
        let HttpAppError(app_err) = storage_err.into();
        match app_err {
            AppError::NotFound(msg) => assert_eq!(msg, "File not found"),
            _ => panic!("Expected NotFound variant"),
        }
    }

    #[test]
    fn test_from_storage_error_invalid_key() {
        let storage_err = StorageError::InvalidKey("../etc/passwd".to_string());
        let HttpAppError(app_err) = storage_err.into();
        assert!(matches!(app_err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_from_storage_error_io_error() {
        let io_err = std::io::Error::other("disk gone");
        let HttpAppError(app_err) = StorageError::IoError(io_err).into();
        match app_err {
            AppError::Internal(msg) => assert!(msg.contains("IO error")),
            _ => panic!("Expected Internal variant"),
        }
    }

    #[test]
    fn test_from_validation_error_file_too_large() {
        let validation_err = ValidationError::FileTooLarge {
            size: 11 * 1024 * 1024,
            max: 10 * 1024 * 1024,
        };
        let HttpAppError(app_err) = validation_err.into();
        assert!(matches!(app_err, AppError::PayloadTooLarge(_)));
        assert_eq!(app_err.http_status_code(), 413);
    }

    #[test]
    fn test_from_validation_error_empty_file() {
        let HttpAppError(app_err) = ValidationError::EmptyFile.into();
        match app_err {
            AppError::InvalidInput(msg) => assert_eq!(msg, "File is empty"),
            _ => panic!("Expected InvalidInput variant"),
        }
    }

    #[test]
    fn test_from_transform_error() {
        let HttpAppError(app_err) =
            TransformError::DecodeFailure("bad crc".to_string()).into();
        assert!(matches!(app_err, AppError::DecodeFailure(_)));
        assert_eq!(app_err.client_message(), "Error processing image");

        let HttpAppError(app_err) = TransformError::ProcessingFailure {
            stage: PipelineStage::Encoded,
            message: "disk full".to_string(),
        }
        .into();
        match app_err {
            AppError::ProcessingFailure(msg) => {
                assert!(msg.contains("encoded"));
                assert!(msg.contains("disk full"));
            }
            _ => panic!("Expected ProcessingFailure variant"),
        }

        let HttpAppError(app_err) = TransformError::InvalidInput(ValidationError::EmptyFile).into();
        assert_eq!(app_err.http_status_code(), 400);
    }

    #[test]
    fn test_sensitive_errors_hide_details() {
        let err = AppError::ProcessingFailure("disk full at /var/data".to_string());
        let body = ErrorResponse::from_app_error(&err, false);
        assert_eq!(body.error, "Error processing image");
        assert_eq!(body.code, "PROCESSING_FAILURE");
        assert!(body.details.is_none());
        assert!(body.error_type.is_none());
    }

    #[test]
    fn test_details_hidden_in_production() {
        assert!(details_visible(false, false));
        assert!(!details_visible(true, false));
        assert!(!details_visible(false, true));

        let err = AppError::InvalidInput("width must be a positive integer".to_string());
        let body = ErrorResponse::from_app_error(&err, details_visible(true, err.is_sensitive()));
        assert_eq!(body.code, "INVALID_INPUT");
        assert!(body.details.is_none());
    }

    #[test]
    fn test_into_response_status() {
        let response =
            HttpAppError(AppError::NotFound("File not found".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = HttpAppError(AppError::DecodeFailure("x".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
