//! Exporter configuration loaded from environment variables

use crate::error::ConfigError;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_URL: &str = "VCD_URL";
pub const ENV_API_TOKEN: &str = "VCD_API_TOKEN";
pub const ENV_API_VERSION: &str = "VCD_API_VERSION";
pub const ENV_PAGE_SIZE: &str = "VCD_PAGE_SIZE";
pub const ENV_PORT: &str = "EXPORTER_PORT";
pub const ENV_INSECURE_SKIP_VERIFY: &str = "VCD_INSECURE_SKIP_VERIFY";
pub const ENV_CONNECT_TIMEOUT: &str = "VCD_CONNECT_TIMEOUT_SECS";
pub const ENV_REQUEST_TIMEOUT: &str = "VCD_REQUEST_TIMEOUT_SECS";
pub const ENV_DETAIL_CONCURRENCY: &str = "VCD_DETAIL_CONCURRENCY";
pub const ENV_MAX_PAGES: &str = "VCD_MAX_PAGES";

/// Exporter configuration
#[derive(Clone, Debug, PartialEq)]
pub struct ExporterConfig {
    /// VDC record listing URL; also the origin for token and query endpoints
    pub base_url: Option<String>,
    /// Long-lived refresh credential exchanged for bearer tokens
    pub refresh_token: Option<String>,
    /// API version sent in the Accept header
    pub api_version: String,
    /// Page size for the provider VDC query
    pub page_size: u32,
    /// Port the HTTP listener binds to
    pub listen_port: u16,
    /// Skip upstream TLS certificate validation
    pub insecure_skip_verify: bool,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Maximum concurrent per-cluster detail fetches
    pub detail_concurrency: usize,
    /// Hard cap on pages followed per listing
    pub max_pages: usize,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            refresh_token: None,
            api_version: "38.0".to_string(),
            page_size: 128,
            listen_port: 8000,
            insecure_skip_verify: true,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            detail_concurrency: 8,
            max_pages: 1000,
        }
    }
}

impl ExporterConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values count as unset. `VCD_URL` and `VCD_API_TOKEN` are
    /// optional here and only enforced when a scrape needs them.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Ok(Self {
            base_url: get(ENV_URL),
            refresh_token: get(ENV_API_TOKEN),
            api_version: get(ENV_API_VERSION).unwrap_or(defaults.api_version),
            page_size: parse_or(ENV_PAGE_SIZE, get(ENV_PAGE_SIZE), defaults.page_size)?,
            listen_port: parse_or(ENV_PORT, get(ENV_PORT), defaults.listen_port)?,
            insecure_skip_verify: match get(ENV_INSECURE_SKIP_VERIFY) {
                Some(value) => parse_bool(ENV_INSECURE_SKIP_VERIFY, &value)?,
                None => defaults.insecure_skip_verify,
            },
            connect_timeout: Duration::from_secs(parse_or(
                ENV_CONNECT_TIMEOUT,
                get(ENV_CONNECT_TIMEOUT),
                defaults.connect_timeout.as_secs(),
            )?),
            request_timeout: Duration::from_secs(parse_or(
                ENV_REQUEST_TIMEOUT,
                get(ENV_REQUEST_TIMEOUT),
                defaults.request_timeout.as_secs(),
            )?),
            detail_concurrency: parse_or(
                ENV_DETAIL_CONCURRENCY,
                get(ENV_DETAIL_CONCURRENCY),
                defaults.detail_concurrency,
            )?
            .max(1),
            max_pages: parse_or(ENV_MAX_PAGES, get(ENV_MAX_PAGES), defaults.max_pages)?.max(1),
        })
    }

    /// The VDC listing URL, required for every scrape
    pub fn base_url(&self) -> Result<&str, ConfigError> {
        self.base_url.as_deref().ok_or(ConfigError::Missing(ENV_URL))
    }

    /// The refresh credential, required for token exchange
    pub fn refresh_token(&self) -> Result<&str, ConfigError> {
        self.refresh_token
            .as_deref()
            .ok_or(ConfigError::Missing(ENV_API_TOKEN))
    }
}

fn parse_or<T: FromStr>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}
