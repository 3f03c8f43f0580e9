//! Resizer Services Layer
//!
//! Background services and the facade the API crate depends on: the
//! retention sweeper plus re-exports of the processing and storage types.

pub mod cleanup;

pub use cleanup::{Clock, ManualClock, RetentionSweeper, SweepReport, SystemClock};
pub use resizer_processing::{
    DecodeLimits, MediaValidator, PipelineStage, TransformError, TransformPipeline,
    ValidatedUpload, ValidationError,
};
pub use resizer_storage::{
    ArtifactStore, ByteStream, LocalArtifactStore, StorageError, StorageResult,
};
