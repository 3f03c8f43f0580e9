//! Service-wide constants.

/// Default output quality when the client leaves the field empty.
pub const DEFAULT_QUALITY: u8 = 80;

/// Highest accepted quality value.
pub const MAX_QUALITY: u8 = 100;

/// Upload size limit in megabytes.
pub const DEFAULT_MAX_FILE_SIZE_MB: usize = 10;

/// Age after which artifacts are swept.
pub const DEFAULT_ARTIFACT_RETENTION_SECS: u64 = 3600;

/// Period of the retention sweeper.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Route prefix used to build download locators.
pub const DOWNLOAD_PATH: &str = "/download";

/// Build the download locator for a processed artifact.
pub fn download_url(name: &str) -> String {
    format!("{}/{}", DOWNLOAD_PATH, name)
}
