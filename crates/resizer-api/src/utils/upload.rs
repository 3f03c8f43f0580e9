//! Multipart parsing for the resize form
//!
//! Every text field is parsed strictly: a malformed value is an
//! `InvalidInput`, never a silent default. Empty values count as absent.

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use bytes::Bytes;
use resizer_core::constants::{DEFAULT_QUALITY, MAX_QUALITY};
use resizer_core::{AppError, OutputFormat, TransformSpec, UploadRequest};

/// Name of the file field
pub const IMAGE_FIELD: &str = "image";

/// Raw text values of the resize form, before parsing
#[derive(Debug, Default, Clone)]
pub struct ResizeFields {
    pub width: Option<String>,
    pub height: Option<String>,
    pub quality: Option<String>,
    pub format: Option<String>,
    pub maintain_aspect_ratio: Option<String>,
    pub transparent_background: Option<String>,
}

impl ResizeFields {
    fn set(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "width" => &mut self.width,
            "height" => &mut self.height,
            "quality" => &mut self.quality,
            "format" => &mut self.format,
            "maintainAspectRatio" => &mut self.maintain_aspect_ratio,
            "transparentBackground" => &mut self.transparent_background,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// Parse into a [`TransformSpec`].
    pub fn into_spec(self) -> Result<TransformSpec, AppError> {
        TransformSpec::new(
            parse_dimension("width", self.width.as_deref())?,
            parse_dimension("height", self.height.as_deref())?,
            parse_quality(self.quality.as_deref())?,
            parse_format(self.format.as_deref())?,
            parse_flag("maintainAspectRatio", self.maintain_aspect_ratio.as_deref())?,
            parse_flag(
                "transparentBackground",
                self.transparent_background.as_deref(),
            )?,
        )
    }
}

/// Trimmed value, `None` when absent or blank.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn parse_dimension(name: &str, value: Option<&str>) -> Result<Option<u32>, AppError> {
    let Some(raw) = present(value) else {
        return Ok(None);
    };
    match raw.parse::<u32>() {
        Ok(0) | Err(_) => Err(AppError::InvalidInput(format!(
            "{} must be a positive integer, got '{}'",
            name, raw
        ))),
        Ok(v) => Ok(Some(v)),
    }
}

pub fn parse_quality(value: Option<&str>) -> Result<u8, AppError> {
    let Some(raw) = present(value) else {
        return Ok(DEFAULT_QUALITY);
    };
    raw.parse::<u8>()
        .ok()
        .filter(|q| *q <= MAX_QUALITY)
        .ok_or_else(|| {
            AppError::InvalidInput(format!(
                "quality must be an integer between 0 and {}, got '{}'",
                MAX_QUALITY, raw
            ))
        })
}

pub fn parse_format(value: Option<&str>) -> Result<OutputFormat, AppError> {
    match present(value) {
        Some(raw) => raw.parse(),
        None => Ok(OutputFormat::default()),
    }
}

pub fn parse_flag(name: &str, value: Option<&str>) -> Result<bool, AppError> {
    match present(value) {
        None | Some("false") => Ok(false),
        Some("true") => Ok(true),
        Some(other) => Err(AppError::InvalidInput(format!(
            "{} must be 'true' or 'false', got '{}'",
            name, other
        ))),
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::InvalidInput(format!("Failed to read multipart: {}", err.body_text()))
    }
}

/// Read the resize form: exactly one `image` file plus the optional fields.
///
/// A file part with no filename and no bytes (an untouched file input) counts
/// as no image.
pub async fn extract_resize_form(
    mut multipart: Multipart,
) -> Result<(UploadRequest, TransformSpec), AppError> {
    let mut image: Option<UploadRequest> = None;
    let mut fields = ResizeFields::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        if field_name == IMAGE_FIELD {
            if image.is_some() {
                return Err(AppError::InvalidInput(
                    "Multiple image fields are not allowed; send exactly one field named 'image'"
                        .to_string(),
                ));
            }
            let filename = field.file_name().map(|s| s.to_string()).unwrap_or_default();
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let data: Bytes = field.bytes().await.map_err(multipart_error)?;

            if filename.is_empty() && data.is_empty() {
                continue;
            }
            image = Some(UploadRequest::new(data, content_type, filename));
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        if !fields.set(&field_name, value) {
            tracing::debug!(field = %field_name, "Ignoring unknown form field");
        }
    }

    let image =
        image.ok_or_else(|| AppError::InvalidInput("No image file provided".to_string()))?;
    let spec = fields.into_spec()?;

    Ok((image, spec))
}
