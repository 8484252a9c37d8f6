//! Typed configuration from environment variables or a TOML file.
//!
//! Loads once at startup and fails fast on malformed values.
//! The auth token is wrapped in secrecy::SecretString to prevent log leaks.

use crate::error::{Error, Result};
use crate::fault::Locale;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Attempts before an item is abandoned.
pub const DEFAULT_RETRY_BOUND: u32 = 5;

pub const DEFAULT_USER_AGENT: &str = concat!("fetchq/", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
pub struct Config {
    /// Maximum failed attempts before abandonment. Always >= 1.
    pub retry_bound: u32,
    /// Per-request timeout applied by the HTTP client. None = no timeout.
    pub request_timeout: Option<Duration>,
    pub user_agent: String,
    /// Sent as a bearer token on every request.
    pub auth_token: Option<SecretString>,
    /// Language of fault titles and summaries.
    pub locale: Locale,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry_bound: DEFAULT_RETRY_BOUND,
            request_timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            auth_token: None,
            locale: Locale::default(),
            otel_endpoint: None,
            log_level: "info".to_string(),
        }
    }
}

/// Top-level TOML wrapper.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    queue: QueueSection,
    #[serde(default)]
    telemetry: TelemetrySection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct QueueSection {
    retry_bound: Option<u32>,
    request_timeout_ms: Option<u64>,
    user_agent: Option<String>,
    auth_token: Option<String>,
    locale: Option<Locale>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TelemetrySection {
    endpoint: Option<String>,
    log_level: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    /// Every variable is optional; unset ones keep their defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            retry_bound: parsed_var("FETCHQ_RETRY_BOUND")?.unwrap_or(defaults.retry_bound),
            request_timeout: parsed_var::<u64>("FETCHQ_REQUEST_TIMEOUT_MS")?
                .map(Duration::from_millis),
            user_agent: std::env::var("FETCHQ_USER_AGENT").unwrap_or(defaults.user_agent),
            auth_token: std::env::var("FETCHQ_AUTH_TOKEN").ok().map(SecretString::from),
            locale: parsed_var("FETCHQ_LOCALE")?.unwrap_or(defaults.locale),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text with `[queue]` and `[telemetry]` tables.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| Error::Config(format!("bad config: {e}")))?;
        let defaults = Self::default();
        let config = Self {
            retry_bound: file.queue.retry_bound.unwrap_or(defaults.retry_bound),
            request_timeout: file.queue.request_timeout_ms.map(Duration::from_millis),
            user_agent: file.queue.user_agent.unwrap_or(defaults.user_agent),
            auth_token: file.queue.auth_token.map(SecretString::from),
            locale: file.queue.locale.unwrap_or(defaults.locale),
            otel_endpoint: file.telemetry.endpoint,
            log_level: file.telemetry.log_level.unwrap_or(defaults.log_level),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.retry_bound == 0 {
            return Err(Error::Config("retry_bound must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parsed_var<V>(name: &str) -> Result<Option<V>>
where
    V: std::str::FromStr,
    V::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("invalid {name}={raw}: {e}"))),
        Err(_) => Ok(None),
    }
}
