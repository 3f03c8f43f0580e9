//! Resizer Storage Library
//!
//! This crate provides the artifact store used for uploaded originals and
//! processed outputs. It includes the `ArtifactStore` trait and a local
//! filesystem implementation.
//!
//! # Layout
//!
//! Each artifact kind has its own directory under the store root:
//!
//! - **Uploaded**: `{root}/uploads/{name}`
//! - **Processed**: `{root}/processed/{name}`
//!
//! Names are always generated by the store (see the `keys` module). Writes go
//! to a hidden partial file first and are renamed into place once complete, so
//! readers and the sweeper never observe a half-written artifact.

pub mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use local::LocalArtifactStore;
pub use traits::{ArtifactStore, ByteStream, StorageError, StorageResult};
