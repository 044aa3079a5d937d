//! Configuration loading from file and environment variables.

use serde::Deserialize;
use thiserror::Error;

use annotator_dispatch::DEFAULT_DASHBOARD_URL;
use annotator_events::SelectorError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Source API settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Dashboard settings.
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Selector file settings.
    #[serde(default)]
    pub selector: SelectorConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where events are read from.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// API host, with or without scheme.
    #[serde(default)]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Where annotations are posted.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_dashboard_url")]
    pub base_url: String,

    /// Dashboard tenant name.
    #[serde(default)]
    pub tenant: String,

    /// Pause after each annotation post, in milliseconds.
    #[serde(default = "default_post_delay_ms")]
    pub post_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Path to the selector CSV file.
    #[serde(default = "default_selector_path")]
    pub path: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "annotator_extract=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,

    /// Write logs to this file instead of standard output.
    #[serde(default)]
    pub file: Option<String>,

    /// When the log file is rolled over.
    #[serde(default)]
    pub rotation: LogRotation,

    /// Rolled log files kept on disk, the current one included.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

/// Log file rollover period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Never,
    Hourly,
    #[default]
    Daily,
}

impl std::str::FromStr for LogRotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "never" => Ok(Self::Never),
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            other => Err(other.to_string()),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_dashboard_url() -> String {
    DEFAULT_DASHBOARD_URL.to_string()
}

fn default_post_delay_ms() -> u64 {
    1000
}

fn default_selector_path() -> String {
    "events-selector.csv".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_files() -> usize {
    10
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: default_dashboard_url(),
            tenant: String::new(),
            post_delay_ms: default_post_delay_ms(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            path: default_selector_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            file: None,
            rotation: LogRotation::default(),
            max_files: default_max_files(),
        }
    }
}

/// Errors that stop the annotator before any event is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting with no usable default was not provided.
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    /// The start-time filter is not a recognised timestamp.
    #[error("invalid --fromtime {0:?}: expected YYYY-MM-DDTHH:MM:SS or RFC 3339")]
    InvalidFromTime(String),

    /// The selector file could not be loaded.
    #[error(transparent)]
    Selector(#[from] SelectorError),

    /// An environment override does not hold a usable value.
    #[error("invalid value {value:?} for {name}")]
    InvalidOverride { name: &'static str, value: String },

    /// The log file could not be opened.
    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: String,
        #[source]
        source: tracing_appender::rolling::InitError,
    },

    /// The log file setting does not name a file.
    #[error("log file path {0:?} has no file name")]
    LogFileName(String),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `ANNOTATOR_BASE_URL` overrides `source.base_url`
/// - `ANNOTATOR_TIMEOUT_SECS` overrides `source.timeout_secs`
/// - `ANNOTATOR_DASHBOARD_URL` overrides `dashboard.base_url`
/// - `ANNOTATOR_TENANT` overrides `dashboard.tenant`
/// - `ANNOTATOR_POST_DELAY_MS` overrides `dashboard.post_delay_ms`
/// - `ANNOTATOR_SELECTOR_PATH` overrides `selector.path`
/// - `ANNOTATOR_LOG_LEVEL` overrides `logging.level`
/// - `ANNOTATOR_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `ANNOTATOR_LOG_FILE` overrides `logging.file`
/// - `ANNOTATOR_LOG_ROTATION` overrides `logging.rotation`
/// - `ANNOTATOR_LOG_MAX_FILES` overrides `logging.max_files`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if an override does not parse.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_overrides(&mut config, |name| std::env::var(name).ok())?;
    Ok(config)
}

/// Applies `ANNOTATOR_*` overrides read through `lookup`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidOverride`] for a numeric or rotation
/// override that does not parse.
pub fn apply_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(base_url) = lookup("ANNOTATOR_BASE_URL") {
        config.source.base_url = base_url;
    }
    if let Some(timeout) = lookup("ANNOTATOR_TIMEOUT_SECS") {
        config.source.timeout_secs = parse_override("ANNOTATOR_TIMEOUT_SECS", timeout)?;
    }
    if let Some(url) = lookup("ANNOTATOR_DASHBOARD_URL") {
        config.dashboard.base_url = url;
    }
    if let Some(tenant) = lookup("ANNOTATOR_TENANT") {
        config.dashboard.tenant = tenant;
    }
    if let Some(delay) = lookup("ANNOTATOR_POST_DELAY_MS") {
        config.dashboard.post_delay_ms = parse_override("ANNOTATOR_POST_DELAY_MS", delay)?;
    }
    if let Some(path) = lookup("ANNOTATOR_SELECTOR_PATH") {
        config.selector.path = path;
    }
    if let Some(level) = lookup("ANNOTATOR_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("ANNOTATOR_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(file) = lookup("ANNOTATOR_LOG_FILE") {
        config.logging.file = Some(file).filter(|file| !file.is_empty());
    }
    if let Some(rotation) = lookup("ANNOTATOR_LOG_ROTATION") {
        config.logging.rotation = parse_override("ANNOTATOR_LOG_ROTATION", rotation)?;
    }
    if let Some(max_files) = lookup("ANNOTATOR_LOG_MAX_FILES") {
        config.logging.max_files = parse_override("ANNOTATOR_LOG_MAX_FILES", max_files)?;
    }
    Ok(())
}

fn parse_override<T: std::str::FromStr>(
    name: &'static str,
    value: String,
) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride { name, value })
}
