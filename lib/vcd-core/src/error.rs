use thiserror::Error;
use vcd_api::XmlError;

/// Missing or invalid exporter setting
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Bearer token acquisition failure
#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("token request failed: {0}")]
    Request(String),
}

/// Failure fetching or parsing a single API resource
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Error {status} on {url}")]
    Status { status: u16, url: String },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("response from {url} has no {element} element")]
    MissingElement { url: String, element: &'static str },

    #[error("malformed response from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: XmlError,
    },
}

/// Fatal scrape failure, answered with a 500 diagnostic line
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Token error: {0}")]
    Auth(#[from] AuthError),

    #[error("{listing} listing failed: {source}")]
    PrimaryFetch {
        listing: &'static str,
        #[source]
        source: FetchError,
    },
}

impl ScrapeError {
    /// Short outcome label for logging and self-metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::Config(_) => "config_error",
            ScrapeError::Auth(_) => "auth_error",
            ScrapeError::PrimaryFetch { .. } => "fetch_error",
        }
    }
}
