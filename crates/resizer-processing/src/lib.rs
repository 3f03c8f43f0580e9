//! Resizer Processing Library
//!
//! Upload validation, resize geometry, the luminance transparency mask,
//! per-format encoding and the transform pipeline tying them together.

pub mod compression;
pub mod image;
pub mod pipeline;
pub mod validator;

pub use compression::ImageCompressor;
pub use pipeline::{DecodeLimits, PipelineStage, TransformError, TransformPipeline, ValidatedUpload};
pub use validator::{MediaValidator, ValidationError};
