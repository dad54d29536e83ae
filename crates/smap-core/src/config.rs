//! Configuration for sitemap discovery.
//!
//! Configuration is stored in TOML. Every field has a default, so a partial
//! file (or none at all) is valid and the defaults reproduce the classic
//! probing behaviour.
//!
//! ## Lookup Order
//!
//! 1. The file named by the `SMAP_CONFIG` environment variable
//! 2. `<platform config dir>/smap/config.toml`
//! 3. Built-in defaults
//!
//! ## Example Configuration File
//!
//! ```toml
//! [fetch]
//! user_agent = "my-crawler/1.0"
//! timeout_secs = 10
//! max_redirects = 10
//!
//! [discovery]
//! probe_delay_ms = 300
//! candidate_paths = ["sitemap.xml", "robots.txt"]
//! homepage_fallback = true
//!
//! [display]
//! threshold = 50
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "SMAP_CONFIG";

/// Client identity sent on every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Well-known sitemap locations, probed in this order.
pub const DEFAULT_CANDIDATE_PATHS: [&str; 6] = [
    "sitemap.xml",
    "sitemap_index.xml",
    "sitemap-index.xml",
    "sitemap_index.xml.gz",
    "sitemap.xml.gz",
    "robots.txt",
];

/// Path whose body is read as robots.txt rather than as a sitemap.
pub const ROBOTS_PATH: &str = "robots.txt";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP client settings.
    pub fetch: FetchConfig,
    /// Probing strategy settings.
    pub discovery: DiscoveryConfig,
    /// Console report settings.
    pub display: DisplayConfig,
}

/// HTTP client settings shared by every request in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum number of redirects followed transparently.
    pub max_redirects: usize,
}

impl FetchConfig {
    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 10,
            max_redirects: 10,
        }
    }
}

/// Probing strategy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Pause observed after each candidate probe, in milliseconds.
    pub probe_delay_ms: u64,
    /// Relative paths probed against the base URL, in order.
    pub candidate_paths: Vec<String>,
    /// Scan the homepage when no candidate produced a sitemap.
    pub homepage_fallback: bool,
}

impl DiscoveryConfig {
    /// Politeness delay as a [`Duration`].
    #[must_use]
    pub const fn probe_delay(&self) -> Duration {
        Duration::from_millis(self.probe_delay_ms)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            probe_delay_ms: 300,
            candidate_paths: DEFAULT_CANDIDATE_PATHS
                .iter()
                .map(ToString::to_string)
                .collect(),
            homepage_fallback: true,
        }
    }
}

/// Console report settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Entries printed per sitemap before the report truncates.
    pub threshold: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { threshold: 50 }
    }
}

impl Config {
    /// Load configuration from `SMAP_CONFIG` or the platform config directory.
    ///
    /// A missing file yields [`Config::default`]. A file that exists but
    /// cannot be read or parsed is an error.
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::load_from(Path::new(&path));
        }

        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse config {}: {e}", path.display()))
        })?;
        config.validate().map_err(|reason| {
            Error::Config(format!("Invalid config {}: {reason}", path.display()))
        })?;
        Ok(config)
    }

    /// Reject values that would make every run fail.
    fn validate(&self) -> std::result::Result<(), &'static str> {
        if self.fetch.timeout_secs == 0 {
            return Err("fetch.timeout_secs must be at least 1");
        }
        Ok(())
    }

    /// Default location of the configuration file, if the platform has one.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "smap", "smap")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
