//! Resizer Core Library
//!
//! This crate provides the domain models, error taxonomy and configuration
//! shared by every Resizer component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{BaseConfig, Config, ResizerConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    ArtifactKind, ArtifactRef, OriginalDimensions, OutputFormat, TransformResult, TransformSpec,
    UploadRequest,
};
