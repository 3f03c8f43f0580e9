//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p resizer-api`.

#![allow(dead_code)]

pub mod fixtures;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use resizer_api::setup::{routes, services};
use resizer_api::state::AppState;
use resizer_core::{Config, ResizerConfig};
use std::sync::Arc;
use tempfile::TempDir;

pub const LANDING_PAGE: &str = "<!doctype html><title>Resizer</title>";

/// Test application: server, shared state and the owned artifact root.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Build an app rooted in a fresh temp dir. The background sweeper is off;
/// tests drive sweeps explicitly.
pub async fn setup_test_app_with(customize: impl FnOnce(&mut ResizerConfig)) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let static_dir = temp_dir.path().join("public");
    std::fs::create_dir_all(&static_dir).expect("Failed to create static dir");
    std::fs::write(static_dir.join("index.html"), LANDING_PAGE).expect("Failed to write index");

    let mut config = ResizerConfig::default();
    config.artifact_root = temp_dir.path().join("data");
    config.static_dir = static_dir;
    config.sweep_interval_secs = 0;
    customize(&mut config);
    let config = Config::new(config);

    let state = services::initialize_services(&config)
        .await
        .expect("Failed to initialize services");
    let app = routes::setup_routes(&config, state.clone()).expect("Failed to build routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        _temp_dir: temp_dir,
    }
}

/// Multipart form with the image part and the given text fields.
pub fn resize_form(
    data: Vec<u8>,
    filename: &str,
    mime: &str,
    fields: &[(&str, &str)],
) -> MultipartForm {
    let part = Part::bytes(bytes::Bytes::from(data))
        .file_name(filename.to_string())
        .mime_type(mime.to_string());
    fields
        .iter()
        .fold(MultipartForm::new(), |form, (name, value)| {
            form.add_text(name.to_string(), value.to_string())
        })
        .add_part("image", part)
}

/// POST /resize and return the JSON body; asserts 200.
pub async fn resize_ok(client: &TestServer, form: MultipartForm) -> serde_json::Value {
    let response = client.post("/resize").multipart(form).await;
    assert_eq!(response.status_code(), 200, "body: {}", response.text());
    response.json()
}

/// Download a processed file and decode it.
pub async fn download_image(client: &TestServer, url: &str) -> image::DynamicImage {
    let response = client.get(url).await;
    assert_eq!(response.status_code(), 200);
    image::load_from_memory(response.as_bytes()).expect("Downloaded file is not an image")
}
