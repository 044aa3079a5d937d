//! Command-line surface and its merge with the loaded configuration.

use std::fmt;
use std::time::Duration;

use annotator_events::time::parse_utc;
use annotator_extract::EdgeGridCredentials;
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};

use crate::config::{Config, ConfigError};

/// Which extraction flows to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SourceSelection {
    /// Event viewer only.
    Viewer,
    /// Content-control requests only.
    Eccu,
    /// Event viewer, then content-control requests.
    #[default]
    All,
}

impl SourceSelection {
    pub fn includes_viewer(self) -> bool {
        matches!(self, Self::Viewer | Self::All)
    }

    pub fn includes_content_control(self) -> bool {
        matches!(self, Self::Eccu | Self::All)
    }
}

#[derive(Parser)]
#[command(name = "annotator")]
#[command(about = "Posts platform events to the mPulse dashboard as annotations")]
#[command(version)]
pub struct Cli {
    /// Source API host
    #[arg(short = 'u', long = "baseurl")]
    pub base_url: Option<String>,

    /// API client token
    #[arg(short = 'c', long = "clienttoken", env = "ANNOTATOR_CLIENT_TOKEN")]
    pub client_token: Option<String>,

    /// API client secret
    #[arg(
        short = 's',
        long = "clientsecret",
        env = "ANNOTATOR_CLIENT_SECRET",
        hide_env_values = true
    )]
    pub client_secret: Option<String>,

    /// API access token
    #[arg(
        short = 'o',
        long = "accesstoken",
        env = "ANNOTATOR_ACCESS_TOKEN",
        hide_env_values = true
    )]
    pub access_token: Option<String>,

    /// Only process events from this UTC time on (YYYY-MM-DDTHH:MM:SS or RFC 3339)
    #[arg(short = 't', long = "fromtime")]
    pub from_time: Option<String>,

    /// mPulse API token
    #[arg(
        short = 'a',
        long = "apitoken",
        env = "ANNOTATOR_API_TOKEN",
        hide_env_values = true
    )]
    pub api_token: Option<String>,

    /// mPulse tenant
    #[arg(short = 'm', long = "mpulsetenant")]
    pub tenant: Option<String>,

    /// Selector CSV file
    #[arg(long)]
    pub selector: Option<String>,

    /// Configuration file
    #[arg(long, env = "ANNOTATOR_CONFIG_PATH", default_value = "annotator.toml")]
    pub config: String,

    /// Extract and log annotations without posting them
    #[arg(long)]
    pub simulate: bool,

    /// Which event sources to read
    #[arg(long, value_enum, default_value_t = SourceSelection::All)]
    pub source: SourceSelection,

    /// Pause after each annotation post, in milliseconds
    #[arg(long = "delay-ms")]
    pub delay_ms: Option<u64>,

    /// HTTP request timeout, in seconds
    #[arg(long = "timeout-secs")]
    pub timeout_secs: Option<u64>,
}

/// Everything one run needs, after CLI flags have been laid over the
/// configuration.
#[derive(Clone)]
pub struct RunSettings {
    pub base_url: String,
    pub credentials: EdgeGridCredentials,
    pub from: Option<DateTime<Utc>>,
    pub selector_path: String,
    pub source: SourceSelection,
    pub simulate: bool,
    pub dashboard_url: String,
    pub api_token: String,
    pub tenant: String,
    pub post_delay: Duration,
    pub timeout: Duration,
}

impl fmt::Debug for RunSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunSettings")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("from", &self.from)
            .field("selector_path", &self.selector_path)
            .field("source", &self.source)
            .field("simulate", &self.simulate)
            .field("dashboard_url", &self.dashboard_url)
            .field("api_token", &"[REDACTED]")
            .field("tenant", &self.tenant)
            .field("post_delay", &self.post_delay)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RunSettings {
    /// Lays CLI flags over `config` and validates the result.
    ///
    /// Source credentials are always required. The dashboard API token and
    /// tenant are required unless the run is simulated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for an absent required setting and
    /// [`ConfigError::InvalidFromTime`] for an unparseable start time.
    pub fn resolve(cli: &Cli, config: &Config) -> Result<Self, ConfigError> {
        let base_url = cli
            .base_url
            .clone()
            .unwrap_or_else(|| config.source.base_url.clone());
        let credentials = EdgeGridCredentials::new(
            cli.client_token.clone().unwrap_or_default(),
            cli.client_secret.clone().unwrap_or_default(),
            cli.access_token.clone().unwrap_or_default(),
        );
        let api_token = cli.api_token.clone().unwrap_or_default();
        let tenant = cli
            .tenant
            .clone()
            .unwrap_or_else(|| config.dashboard.tenant.clone());

        require(&base_url, "baseurl")?;
        require(&credentials.client_token, "clienttoken")?;
        require(&credentials.client_secret, "clientsecret")?;
        require(&credentials.access_token, "accesstoken")?;
        if !cli.simulate {
            require(&api_token, "apitoken")?;
            require(&tenant, "mpulsetenant")?;
        }

        let from = cli.from_time.as_deref().map(parse_from_time).transpose()?;

        Ok(Self {
            base_url,
            credentials,
            from,
            selector_path: cli
                .selector
                .clone()
                .unwrap_or_else(|| config.selector.path.clone()),
            source: cli.source,
            simulate: cli.simulate,
            dashboard_url: config.dashboard.base_url.clone(),
            api_token,
            tenant,
            post_delay: Duration::from_millis(
                cli.delay_ms.unwrap_or(config.dashboard.post_delay_ms),
            ),
            timeout: Duration::from_secs(cli.timeout_secs.unwrap_or(config.source.timeout_secs)),
        })
    }
}

fn require(value: &str, name: &'static str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(())
}

/// Parses the start-time filter.
///
/// A bare `YYYY-MM-DDTHH:MM:SS` is taken as UTC.
pub fn parse_from_time(raw: &str) -> Result<DateTime<Utc>, ConfigError> {
    parse_utc("fromtime", raw).map_err(|_| ConfigError::InvalidFromTime(raw.to_string()))
}
