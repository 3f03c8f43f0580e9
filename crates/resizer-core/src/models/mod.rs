//! Data models for the application
//!
//! Requests, transform parameters and artifact references shared by the
//! storage, processing and API crates.

mod artifact;
mod transform;

pub use artifact::*;
pub use transform::*;
