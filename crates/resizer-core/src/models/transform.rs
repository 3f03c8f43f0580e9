use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::artifact::ArtifactRef;
use crate::constants::{DEFAULT_QUALITY, MAX_QUALITY};
use crate::error::AppError;

/// Output encodings the service can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    #[serde(rename = "webp")]
    WebP,
    Gif,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Gif => "gif",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Gif => "image/gif",
        }
    }

    /// Whether the encoding keeps an alpha channel
    pub fn supports_alpha(&self) -> bool {
        matches!(self, OutputFormat::Png | OutputFormat::WebP)
    }

    /// Reverse lookup used when serving artifacts by file name
    pub fn from_extension(ext: &str) -> Option<Self> {
        ext.parse().ok()
    }
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "gif" => Ok(OutputFormat::Gif),
            other => Err(AppError::InvalidInput(format!(
                "Unsupported output format '{}'. Expected one of: jpeg, jpg, png, webp, gif",
                other
            ))),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Parameters of a single transform request.
///
/// Built at the request boundary; once constructed the values are known to
/// be in range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransformSpec {
    width: Option<u32>,
    height: Option<u32>,
    quality: u8,
    format: OutputFormat,
    maintain_aspect_ratio: bool,
    transparent_background: bool,
}

impl Default for TransformSpec {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            quality: DEFAULT_QUALITY,
            format: OutputFormat::default(),
            maintain_aspect_ratio: false,
            transparent_background: false,
        }
    }
}

impl TransformSpec {
    pub fn new(
        width: Option<u32>,
        height: Option<u32>,
        quality: u8,
        format: OutputFormat,
        maintain_aspect_ratio: bool,
        transparent_background: bool,
    ) -> Result<Self, AppError> {
        if width == Some(0) || height == Some(0) {
            return Err(AppError::InvalidInput(
                "width and height must be positive integers".to_string(),
            ));
        }
        if quality > MAX_QUALITY {
            return Err(AppError::InvalidInput(format!(
                "quality must be between 0 and {}, got {}",
                MAX_QUALITY, quality
            )));
        }

        Ok(Self {
            width,
            height,
            quality,
            format,
            maintain_aspect_ratio,
            transparent_background,
        })
    }

    pub fn width(&self) -> Option<u32> {
        self.width
    }

    pub fn height(&self) -> Option<u32> {
        self.height
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Format as requested by the client
    pub fn requested_format(&self) -> OutputFormat {
        self.format
    }

    pub fn maintain_aspect_ratio(&self) -> bool {
        self.maintain_aspect_ratio
    }

    pub fn transparent_background(&self) -> bool {
        self.transparent_background
    }

    /// Format actually produced. Transparent output is coerced to png when
    /// the requested format has no alpha channel.
    pub fn effective_format(&self) -> OutputFormat {
        if self.transparent_background && !self.format.supports_alpha() {
            OutputFormat::Png
        } else {
            self.format
        }
    }
}

/// Upload received from a client, not yet validated.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub data: Bytes,
    pub content_type: String,
    pub original_filename: String,
    /// Size as declared by the transport; may differ from `data.len()`
    pub size: usize,
}

impl UploadRequest {
    pub fn new(data: Bytes, content_type: impl Into<String>, original_filename: impl Into<String>) -> Self {
        let size = data.len();
        Self {
            data,
            content_type: content_type.into(),
            original_filename: original_filename.into(),
            size,
        }
    }
}

/// Pixel dimensions of the decoded upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OriginalDimensions {
    pub width: u32,
    pub height: u32,
}

/// Outcome of a successful transform
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransformResult {
    pub artifact: ArtifactRef,
    /// Output size in kilobytes, rounded to nearest
    pub size_kb: u64,
    pub download_url: String,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub original: OriginalDimensions,
}

/// Size in kilobytes, rounded half up.
pub fn size_in_kb(bytes: u64) -> u64 {
    (bytes + 512) / 1024
}
