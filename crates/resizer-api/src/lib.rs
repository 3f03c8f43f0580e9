//! Resizer HTTP API
//!
//! Axum surface over the transform pipeline: multipart upload parsing,
//! download streaming, OpenAPI docs, telemetry and server bootstrap.

pub mod api_doc;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
pub mod utils;
