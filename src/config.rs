use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::duration::{deserialize_duration, deserialize_duration_opt};
use crate::fetch::DEXTERITY_API_BASE;
use crate::products::DEFAULT_UNDERLYINGS;
use crate::store::DEFAULT_BEST_DAYS;

pub const DEFAULT_DATABASE_FILE: &str = "fills.sqlite";
pub const DEFAULT_CONFIG_FILE: &str = "fillbook.toml";

fn default_api_base_url() -> String {
    DEXTERITY_API_BASE.to_string()
}

fn default_database() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_FILE)
}

fn default_underlyings() -> Vec<String> {
    DEFAULT_UNDERLYINGS.iter().map(|u| u.to_string()).collect()
}

/// Currency rendering for the volume report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Prefix for every rendered amount.
    pub currency_symbol: Option<String>,

    /// Rounding precision (half away from zero). `None` keeps full precision.
    pub currency_decimals: Option<u32>,

    /// Insert thousands separators.
    pub currency_grouping: bool,

    /// Pad to exactly `currency_decimals` places.
    pub currency_fixed_decimals: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency_symbol: Some("$".to_string()),
            currency_decimals: Some(2),
            currency_grouping: true,
            currency_fixed_decimals: true,
        }
    }
}

fn default_retry_backoff() -> Duration {
    Duration::from_secs(1)
}

/// Fetch phase settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Upper bound on pages fetched per product. Unbounded when unset.
    pub max_pages: Option<u32>,

    /// Retries for transient transport errors and 5xx responses.
    /// Zero keeps the fail-fast behavior.
    pub max_retries: u32,

    /// Pause between retries.
    #[serde(
        default = "default_retry_backoff",
        deserialize_with = "deserialize_duration"
    )]
    pub retry_backoff: Duration,

    /// Per-request timeout. Unset leaves the HTTP client default in place.
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub request_timeout: Option<Duration>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_pages: None,
            max_retries: 0,
            retry_backoff: default_retry_backoff(),
            request_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Number of rows in the "Best Days" section.
    pub best_days: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            best_days: DEFAULT_BEST_DAYS,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the fills API (without the `/fills` path).
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// SQLite database file. If relative, resolved from the config file location.
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Underlying assets used to build product symbols.
    #[serde(default = "default_underlyings")]
    pub underlyings: Vec<String>,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            database: default_database(),
            underlyings: default_underlyings(),
            fetch: FetchConfig::default(),
            display: DisplayConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Resolve the database path against the config file's directory.
    pub fn resolve_database(&self, config_dir: &Path) -> PathBuf {
        if self.database.is_absolute() {
            self.database.clone()
        } else {
            config_dir.join(&self.database)
        }
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub database_path: PathBuf,
    pub api_base_url: String,
    pub underlyings: Vec<String>,
    pub fetch: FetchConfig,
    pub display: DisplayConfig,
    pub report: ReportConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./fillbook.toml` if it exists in current directory
/// 2. `~/.local/share/fillbook/fillbook.toml` (XDG data directory) if it exists
/// 3. `./fillbook.toml`
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        let xdg_config = data_dir.join("fillbook").join(DEFAULT_CONFIG_FILE);
        if xdg_config.exists() {
            return xdg_config;
        }
    }

    local_config
}

impl ResolvedConfig {
    fn from_config(config: Config, config_dir: &Path) -> Self {
        Self {
            database_path: config.resolve_database(config_dir),
            api_base_url: config.api_base_url,
            underlyings: config.underlyings,
            fetch: config.fetch,
            display: config.display,
            report: config.report,
        }
    }

    /// Load and resolve config from a file path.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        Ok(Self::from_config(config, config_dir))
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// Without a file, the database lives next to where the config file would be.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };

        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Ok(Self::from_config(Config::default(), config_dir))
    }
}
