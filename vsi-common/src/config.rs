//! Configuration loading and config file resolution
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`VSI_CONFIG`)
//! 3. Platform config directory (`<config_dir>/vsi/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing config file is never fatal: the service logs a warning and
//! runs on compiled defaults. A file that exists but does not parse is a
//! [`Error::Config`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "VSI_CONFIG";
/// Environment override for the listen address
pub const BIND_ADDRESS_ENV: &str = "VSI_BIND_ADDRESS";
/// Environment override for the log level
pub const LOG_LEVEL_ENV: &str = "VSI_LOG_LEVEL";

/// Default upstream base URL (NHTSA public API)
pub const DEFAULT_FEED_BASE_URL: &str = "https://api.nhtsa.gov";
/// Longest accepted cache TTL (one year)
pub const MAX_TTL_HOURS: u64 = 24 * 366;
/// Fixed User-Agent sent to every upstream feed
pub const DEFAULT_USER_AGENT: &str = "VSI-Aggregator/0.1.0 (vehicle safety intelligence)";

/// Top-level service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Listen address for the HTTP API
    pub bind_address: String,
    pub logging: LoggingConfig,
    pub feeds: FeedsConfig,
    pub cache: CacheConfig,
    pub severity: SeverityKeywords,
    pub limits: LimitsConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5740".to_string(),
            logging: LoggingConfig::default(),
            feeds: FeedsConfig::default(),
            cache: CacheConfig::default(),
            severity: SeverityKeywords::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset (e.g. "info", "debug")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Upstream feed endpoints and request policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    pub recall_base_url: String,
    pub complaint_base_url: String,
    /// Per-request timeout; one attempt only
    pub timeout_secs: u64,
    /// Outbound request ceiling per feed
    pub requests_per_second: u32,
    pub user_agent: String,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            recall_base_url: DEFAULT_FEED_BASE_URL.to_string(),
            complaint_base_url: DEFAULT_FEED_BASE_URL.to_string(),
            timeout_secs: 10,
            requests_per_second: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Result cache policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_hours: u64,
    /// Background purge interval; 0 disables the sweep (lazy expiry only)
    pub sweep_interval_secs: u64,
    /// Collapse concurrent cold-cache fetches for the same vehicle
    pub single_flight: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 24,
            sweep_interval_secs: 900,
            single_flight: true,
        }
    }
}

/// Keyword lists driving severity classification.
///
/// Matching is a case-insensitive substring test. High lists are always
/// evaluated before low lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityKeywords {
    pub recall_high: Vec<String>,
    pub recall_low: Vec<String>,
    pub complaint_high: Vec<String>,
    pub complaint_low: Vec<String>,
}

impl Default for SeverityKeywords {
    fn default() -> Self {
        fn words(list: &[&str]) -> Vec<String> {
            list.iter().map(|w| w.to_string()).collect()
        }

        Self {
            recall_high: words(&["crash", "fire", "death", "injury", "brake", "steering", "airbag"]),
            recall_low: words(&["warning", "light", "noise", "vibration", "minor"]),
            complaint_high: words(&[
                "accident",
                "injury",
                "death",
                "brake failure",
                "steering loss",
                "airbag",
                "fire",
                "explosion",
            ]),
            complaint_low: words(&["noise", "vibration", "warning light", "minor", "cosmetic", "squeak"]),
        }
    }
}

/// Output size limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_recalls: usize,
    pub max_complaints: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_recalls: 50,
            max_complaints: 100,
        }
    }
}

impl TomlConfig {
    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.feeds.timeout_secs == 0 {
            return Err(Error::Config("feeds.timeout_secs must be greater than 0".to_string()));
        }
        if self.feeds.requests_per_second == 0 {
            return Err(Error::Config(
                "feeds.requests_per_second must be greater than 0".to_string(),
            ));
        }
        if self.feeds.user_agent.trim().is_empty() {
            return Err(Error::Config("feeds.user_agent cannot be empty".to_string()));
        }
        if self.cache.ttl_hours == 0 || self.cache.ttl_hours > MAX_TTL_HOURS {
            return Err(Error::Config(format!(
                "cache.ttl_hours must be between 1 and {}",
                MAX_TTL_HOURS
            )));
        }
        if self.limits.max_recalls == 0 || self.limits.max_complaints == 0 {
            return Err(Error::Config("limits must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// Apply `VSI_BIND_ADDRESS` / `VSI_LOG_LEVEL` overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(bind) = std::env::var(BIND_ADDRESS_ENV) {
            if !bind.trim().is_empty() {
                info!("Bind address overridden by {}", BIND_ADDRESS_ENV);
                self.bind_address = bind.trim().to_string();
            }
        }
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            if !level.trim().is_empty() {
                self.logging.level = level.trim().to_string();
            }
        }
    }
}

/// Resolve which config file to read, following the priority order above.
///
/// Returns `None` when no candidate exists; callers then fall back to
/// compiled defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|p| p.exists())
}

/// `<config_dir>/vsi/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vsi").join("config.toml"))
}

/// Load configuration from `path`, falling back to defaults when the
/// path is absent or the file does not exist.
pub fn load_config(path: Option<&Path>) -> Result<TomlConfig> {
    let config = match path {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(path)?;
            let config: TomlConfig = toml::from_str(&content).map_err(|e| {
                Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e))
            })?;
            info!("Configuration loaded from {}", path.display());
            config
        }
        Some(path) => {
            warn!(
                "Config file not found: {}. Using compiled defaults.",
                path.display()
            );
            TomlConfig::default()
        }
        None => {
            info!("No config file found, using compiled defaults");
            TomlConfig::default()
        }
    };

    config.validate()?;
    Ok(config)
}
