//! Transform pipeline
//!
//! `Received -> Validated -> Decoded -> Resized -> (MaskApplied) -> Encoded ->
//! Persisted -> Completed`. Any stage may fail; the failing stage is carried
//! by [`TransformError`] and logged.
//!
//! Decode, resize and encode are CPU bound and run on the blocking pool.

use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use resizer_core::constants::download_url;
use resizer_core::models::size_in_kb;
use resizer_core::{
    ArtifactKind, ArtifactRef, OriginalDimensions, OutputFormat, TransformResult, TransformSpec,
    UploadRequest,
};
use resizer_storage::{ArtifactStore, StorageError};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;

use crate::compression::ImageCompressor;
use crate::image::{ImageResize, ResizeDimensions, TransparencyMask};
use crate::validator::{MediaValidator, ValidationError};

/// Pipeline stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Validated,
    Decoded,
    Resized,
    MaskApplied,
    Encoded,
    Persisted,
    Completed,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Received => "received",
            PipelineStage::Validated => "validated",
            PipelineStage::Decoded => "decoded",
            PipelineStage::Resized => "resized",
            PipelineStage::MaskApplied => "mask_applied",
            PipelineStage::Encoded => "encoded",
            PipelineStage::Persisted => "persisted",
            PipelineStage::Completed => "completed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    #[error("Processing failure after stage {stage}: {message}")]
    ProcessingFailure {
        stage: PipelineStage,
        message: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl TransformError {
    /// Last stage reached before the failure
    pub fn stage(&self) -> PipelineStage {
        match self {
            TransformError::InvalidInput(_) => PipelineStage::Received,
            TransformError::DecodeFailure(_) => PipelineStage::Validated,
            TransformError::ProcessingFailure { stage, .. } => *stage,
            TransformError::Storage(_) => PipelineStage::Encoded,
        }
    }

    fn processing(stage: PipelineStage, message: impl std::fmt::Display) -> Self {
        TransformError::ProcessingFailure {
            stage,
            message: message.to_string(),
        }
    }
}

/// Decoder resource limits
#[derive(Debug, Clone, Copy)]
pub struct DecodeLimits {
    pub max_dimension: u32,
    pub max_alloc_bytes: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_dimension: 16_384,
            max_alloc_bytes: 512 * 1024 * 1024,
        }
    }
}

/// An upload that passed validation. Only [`TransformPipeline::validate`] creates one.
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    data: Bytes,
    extension: String,
    original_filename: String,
}

impl ValidatedUpload {
    /// Lowercased extension of the original filename
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Filename as sent by the client
    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }
}

/// Encoded output before it is persisted
struct Rendered {
    data: Bytes,
    format: OutputFormat,
    width: u32,
    height: u32,
    original: OriginalDimensions,
}

pub struct TransformPipeline {
    store: Arc<dyn ArtifactStore>,
    validator: MediaValidator,
    limits: DecodeLimits,
}

impl TransformPipeline {
    pub fn new(store: Arc<dyn ArtifactStore>, validator: MediaValidator, limits: DecodeLimits) -> Self {
        Self {
            store,
            validator,
            limits,
        }
    }

    /// Check size, extension and content type of an upload.
    ///
    /// The larger of the declared and actual size is checked.
    pub fn validate(&self, upload: UploadRequest) -> Result<ValidatedUpload, TransformError> {
        let size = upload.size.max(upload.data.len());
        let extension = self
            .validator
            .validate_all(&upload.original_filename, &upload.content_type, size)
            .inspect_err(|e| {
                tracing::debug!(
                    stage = %PipelineStage::Received,
                    filename = %upload.original_filename,
                    size_bytes = size,
                    error = %e,
                    "Upload rejected"
                );
            })?;

        Ok(ValidatedUpload {
            data: upload.data,
            extension,
            original_filename: upload.original_filename,
        })
    }

    /// Keep the validated original as an `uploaded` artifact.
    pub async fn store_original(
        &self,
        upload: &ValidatedUpload,
    ) -> Result<ArtifactRef, TransformError> {
        let artifact = self
            .store
            .store(ArtifactKind::Uploaded, &upload.extension, upload.data.clone())
            .await?;
        Ok(artifact)
    }

    /// Validate then transform.
    pub async fn transform(
        &self,
        upload: UploadRequest,
        spec: &TransformSpec,
    ) -> Result<TransformResult, TransformError> {
        let validated = self.validate(upload)?;
        self.transform_validated(&validated, spec).await
    }

    /// Decode, resize, optionally mask, encode and persist a validated upload.
    #[tracing::instrument(
        skip(self, upload, spec),
        fields(
            filename = %upload.original_filename,
            requested_format = %spec.requested_format(),
            format = %spec.effective_format(),
            transparent = spec.transparent_background()
        )
    )]
    pub async fn transform_validated(
        &self,
        upload: &ValidatedUpload,
        spec: &TransformSpec,
    ) -> Result<TransformResult, TransformError> {
        let start = Instant::now();
        let result = self.run(upload, spec).await;

        match &result {
            Ok(output) => tracing::info!(
                stage = %PipelineStage::Completed,
                name = %output.artifact.name,
                width = output.width,
                height = output.height,
                size_bytes = output.artifact.size_bytes,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Transform completed"
            ),
            Err(e) => tracing::warn!(
                stage = %e.stage(),
                error = %e,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Transform failed"
            ),
        }

        result
    }

    async fn run(
        &self,
        upload: &ValidatedUpload,
        spec: &TransformSpec,
    ) -> Result<TransformResult, TransformError> {
        let data = upload.data.clone();
        let spec_owned = spec.clone();
        let limits = self.limits;

        let rendered = tokio::task::spawn_blocking(move || render(&data, &spec_owned, limits))
            .await
            .map_err(|e| TransformError::processing(PipelineStage::Validated, e))??;

        let artifact = self
            .store
            .store(
                ArtifactKind::Processed,
                rendered.format.extension(),
                rendered.data,
            )
            .await
            .map_err(|e| TransformError::processing(PipelineStage::Encoded, e))?;

        Ok(TransformResult {
            size_kb: size_in_kb(artifact.size_bytes),
            download_url: download_url(&artifact.name),
            artifact,
            format: rendered.format,
            width: rendered.width,
            height: rendered.height,
            original: rendered.original,
        })
    }
}

/// Container formats accepted as input
const DECODABLE_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Decode with bounded dimensions and allocation.
///
/// The format is sniffed from the bytes; anything other than jpeg, png, gif
/// or webp is a decode failure whatever the filename said.
pub fn decode(data: &[u8], limits: DecodeLimits) -> Result<DynamicImage, TransformError> {
    let mut reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| TransformError::DecodeFailure(e.to_string()))?;

    match reader.format() {
        Some(format) if DECODABLE_FORMATS.contains(&format) => {}
        Some(format) => {
            return Err(TransformError::DecodeFailure(format!(
                "Unsupported image format {:?}",
                format
            )))
        }
        None => {
            return Err(TransformError::DecodeFailure(
                "Unrecognized image format".to_string(),
            ))
        }
    }

    let mut decode_limits = image::Limits::default();
    decode_limits.max_image_width = Some(limits.max_dimension);
    decode_limits.max_image_height = Some(limits.max_dimension);
    decode_limits.max_alloc = Some(limits.max_alloc_bytes);
    reader.limits(decode_limits);

    reader
        .decode()
        .map_err(|e| TransformError::DecodeFailure(e.to_string()))
}

fn render(
    data: &[u8],
    spec: &TransformSpec,
    limits: DecodeLimits,
) -> Result<Rendered, TransformError> {
    let img = decode(data, limits)?;
    let (width, height) = img.dimensions();
    let original = OriginalDimensions { width, height };

    let geometry = ImageResize::resolve(
        original,
        ResizeDimensions::new(spec.width(), spec.height()),
        spec.maintain_aspect_ratio(),
    );
    tracing::debug!(
        stage = %PipelineStage::Decoded,
        original_width = width,
        original_height = height,
        target_width = geometry.width,
        target_height = geometry.height,
        fit = ?geometry.fit,
        "Resolved geometry"
    );

    // The mask must come from the original pixels, before resampling.
    let mask = spec
        .transparent_background()
        .then(|| TransparencyMask::from_image(&img));

    let resized = ImageResize::resize_to(img, geometry.width, geometry.height);

    let output = match mask {
        Some(mask) => {
            let mask = mask.resized(geometry.width, geometry.height);
            DynamicImage::ImageRgba8(mask.apply_destination_in(&resized))
        }
        None => resized,
    };

    let format = spec.effective_format();
    let stage = if spec.transparent_background() {
        PipelineStage::MaskApplied
    } else {
        PipelineStage::Resized
    };
    let encoded = ImageCompressor::compress(&output, format, spec.quality())
        .map_err(|e| TransformError::processing(stage, e))?;

    Ok(Rendered {
        data: encoded,
        format,
        width: geometry.width,
        height: geometry.height,
        original,
    })
}
