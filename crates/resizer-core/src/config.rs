//! Configuration module
//!
//! This module provides the configuration for the API server, the artifact
//! store, the transform pipeline and the retention sweeper. Every value is
//! read from the environment and falls back to a sane default.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_ARTIFACT_RETENTION_SECS, DEFAULT_MAX_FILE_SIZE_MB, DEFAULT_SWEEP_INTERVAL_SECS,
};

const SERVER_PORT: u16 = 3000;
const MAX_IMAGE_DIMENSION: u32 = 16_384;
const MAX_DECODE_ALLOC_MB: u64 = 512;

/// Base configuration for the HTTP server
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    /// `pretty` or `json`
    pub log_format: String,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            server_port: SERVER_PORT,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// Resizer service configuration
#[derive(Clone, Debug)]
pub struct ResizerConfig {
    pub base: BaseConfig,
    // Artifact store
    pub artifact_root: PathBuf,
    pub artifact_retention_secs: u64,
    /// 0 disables the background sweeper.
    pub sweep_interval_secs: u64,
    // Upload validation
    pub max_file_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    // Decoder limits
    pub max_image_dimension: u32,
    pub max_decode_alloc_bytes: u64,
    // Landing page and static assets
    pub static_dir: PathBuf,
}

impl Default for ResizerConfig {
    fn default() -> Self {
        Self {
            base: BaseConfig::default(),
            artifact_root: PathBuf::from("./data"),
            artifact_retention_secs: DEFAULT_ARTIFACT_RETENTION_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_MB * 1024 * 1024,
            allowed_extensions: split_list("jpg,jpeg,png,gif,webp"),
            allowed_content_types: split_list(
                "image/jpeg,image/jpg,image/png,image/gif,image/webp",
            ),
            max_image_dimension: MAX_IMAGE_DIMENSION,
            max_decode_alloc_bytes: MAX_DECODE_ALLOC_MB * 1024 * 1024,
            static_dir: PathBuf::from("public"),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ResizerConfig>);

impl Config {
    pub fn new(config: ResizerConfig) -> Self {
        Config(Box::new(config))
    }

    fn as_resizer(&self) -> &ResizerConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.as_resizer().base.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ResizerConfig::from_env()?;
        Ok(Config::new(config))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_resizer().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.as_resizer().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_resizer().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_resizer().base.environment
    }

    pub fn log_format(&self) -> &str {
        &self.as_resizer().base.log_format
    }

    pub fn artifact_root(&self) -> &PathBuf {
        &self.as_resizer().artifact_root
    }

    pub fn artifact_retention(&self) -> Duration {
        Duration::from_secs(self.as_resizer().artifact_retention_secs)
    }

    /// `None` when the sweeper is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        match self.as_resizer().sweep_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.as_resizer().max_file_size_bytes
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.as_resizer().allowed_extensions
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.as_resizer().allowed_content_types
    }

    pub fn max_image_dimension(&self) -> u32 {
        self.as_resizer().max_image_dimension
    }

    pub fn max_decode_alloc_bytes(&self) -> u64 {
        self.as_resizer().max_decode_alloc_bytes
    }

    pub fn static_dir(&self) -> &PathBuf {
        &self.as_resizer().static_dir
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl ResizerConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = ResizerConfig::default();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| defaults.base.environment.clone());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| defaults.base.log_format.clone())
                .to_lowercase(),
        };

        let config = ResizerConfig {
            base,
            artifact_root: env::var("ARTIFACT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_root),
            artifact_retention_secs: env_or(
                "ARTIFACT_RETENTION_SECS",
                defaults.artifact_retention_secs,
            ),
            sweep_interval_secs: env_or("SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs),
            max_file_size_bytes: env_or("MAX_FILE_SIZE_MB", DEFAULT_MAX_FILE_SIZE_MB) * 1024 * 1024,
            allowed_extensions: env::var("ALLOWED_EXTENSIONS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.allowed_extensions),
            allowed_content_types: env::var("ALLOWED_CONTENT_TYPES")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.allowed_content_types),
            max_image_dimension: env_or("MAX_IMAGE_DIMENSION", defaults.max_image_dimension),
            max_decode_alloc_bytes: env_or("MAX_DECODE_ALLOC_MB", MAX_DECODE_ALLOC_MB)
                * 1024
                * 1024,
            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }

        if self.artifact_retention_secs == 0 {
            return Err(anyhow::anyhow!(
                "ARTIFACT_RETENTION_SECS must be greater than 0"
            ));
        }

        if self.allowed_extensions.is_empty() || self.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "ALLOWED_EXTENSIONS and ALLOWED_CONTENT_TYPES must not be empty"
            ));
        }

        if self.max_image_dimension == 0 {
            return Err(anyhow::anyhow!("MAX_IMAGE_DIMENSION must be greater than 0"));
        }

        if !matches!(self.base.log_format.as_str(), "pretty" | "json") {
            return Err(anyhow::anyhow!(
                "LOG_FORMAT must be 'pretty' or 'json', got '{}'",
                self.base.log_format
            ));
        }

        Ok(())
    }
}
