use resizer_core::Config;

// Use mimalloc as the global allocator; image decode/encode churns through
// large short-lived buffers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (storage, pipeline, sweeper, routes)
    let (state, router) = resizer_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    let served = resizer_api::setup::server::start_server(&config, router).await;

    state.shutdown_background_tasks();

    served
}
