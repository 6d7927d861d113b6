//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Manifest endpoint and HTTP client settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Worker pool, retry and deadline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Where resized images are written
    #[serde(default)]
    pub storage: StorageConfig,

    /// Where the name → address index lives
    #[serde(default)]
    pub index: IndexConfig,

    /// HTTP surface settings
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration, falling back to defaults only when the file does
    /// not exist. A file that exists but fails to read or parse is an error.
    pub fn load_if_present(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("No config at {}. Using defaults.", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.source.endpoint.trim().is_empty() {
            return Err(AppError::validation("source.endpoint is empty"));
        }
        url::Url::parse(&self.source.endpoint).map_err(|e| {
            AppError::validation(format!("source.endpoint is not a valid URL: {e}"))
        })?;
        if self.source.user_agent.trim().is_empty() {
            return Err(AppError::validation("source.user_agent is empty"));
        }
        if self.source.timeout_secs == 0 {
            return Err(AppError::validation("source.timeout_secs must be > 0"));
        }
        if self.pipeline.max_concurrent == 0 {
            return Err(AppError::validation("pipeline.max_concurrent must be > 0"));
        }
        if !(1..=100).contains(&self.pipeline.jpeg_quality) {
            return Err(AppError::validation(
                "pipeline.jpeg_quality must be between 1 and 100",
            ));
        }
        if self.pipeline.deadline_secs == Some(0) {
            return Err(AppError::validation("pipeline.deadline_secs must be > 0"));
        }
        let prefix = self.storage.url_prefix.trim();
        if prefix.is_empty() || prefix.contains('/') {
            return Err(AppError::validation(
                "storage.url_prefix must be a single non-empty path segment",
            ));
        }
        url::Url::parse(&self.server.public_base_url).map_err(|e| {
            AppError::validation(format!("server.public_base_url is not a valid URL: {e}"))
        })?;
        if self.server.listen_addr.trim().is_empty() {
            return Err(AppError::validation("server.listen_addr is empty"));
        }
        Ok(())
    }

    /// Base address that stored object names are appended to.
    ///
    /// `http://localhost:7366` + `skyhub` gives `http://localhost:7366/skyhub`.
    pub fn address_base(&self) -> String {
        format!(
            "{}/{}",
            self.server.public_base_url.trim_end_matches('/'),
            self.storage.url_prefix.trim()
        )
    }
}

/// Manifest endpoint and HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// URL of the JSON manifest listing source images
    #[serde(default = "defaults::endpoint")]
    pub endpoint: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::endpoint(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Worker pool and failure policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of references processed at once
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Extra attempts for retryable failures
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Base delay between attempts, multiplied by the attempt number
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,

    /// Overall deadline for one run; unset means no deadline
    #[serde(default)]
    pub deadline_secs: Option<u64>,

    /// JPEG quality for stored variants (1-100)
    #[serde(default = "defaults::jpeg_quality")]
    pub jpeg_quality: u8,
}

impl PipelineConfig {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::max_concurrent(),
            max_retries: defaults::max_retries(),
            retry_delay_ms: defaults::retry_delay(),
            deadline_secs: None,
            jpeg_quality: defaults::jpeg_quality(),
        }
    }
}

/// Durable storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory that stored images are written into
    #[serde(default = "defaults::root_dir")]
    pub root_dir: PathBuf,

    /// Path segment the stored images are served under
    #[serde(default = "defaults::url_prefix")]
    pub url_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: defaults::root_dir(),
            url_prefix: defaults::url_prefix(),
        }
    }
}

/// Index store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// JSON file holding the name → address records
    #[serde(default = "defaults::index_path")]
    pub path: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: defaults::index_path(),
        }
    }
}

/// HTTP surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    #[serde(default = "defaults::listen_addr")]
    pub listen_addr: String,

    /// Externally reachable base URL used to build stored addresses
    #[serde(default = "defaults::public_base_url")]
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: defaults::listen_addr(),
            public_base_url: defaults::public_base_url(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Source defaults
    pub fn endpoint() -> String {
        "http://54.152.221.29/images.json".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; skyhub/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Pipeline defaults
    pub fn max_concurrent() -> usize {
        4
    }
    pub fn max_retries() -> u32 {
        2
    }
    pub fn retry_delay() -> u64 {
        250
    }
    pub fn jpeg_quality() -> u8 {
        85
    }

    // Storage defaults
    pub fn root_dir() -> PathBuf {
        PathBuf::from("skyhub")
    }
    pub fn url_prefix() -> String {
        "skyhub".into()
    }
    pub fn index_path() -> PathBuf {
        PathBuf::from("data/index.json")
    }

    // Server defaults
    pub fn listen_addr() -> String {
        "localhost:7366".into()
    }
    pub fn public_base_url() -> String {
        "http://localhost:7366".into()
    }
}
