//! HTTP transport for API requests
//!
//! `ReqwestTransport` talks to the real API with connect and request
//! timeouts and optional certificate validation. With the `test-util`
//! feature, `MemoryTransport` serves canned responses keyed by URL.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue, ACCEPT, AUTHORIZATION};
#[cfg(any(test, feature = "test-util"))]
use std::collections::HashMap;
#[cfg(any(test, feature = "test-util"))]
use std::sync::Mutex;
use tracing::{debug, warn};
use vcd_core::config::ENV_API_VERSION;
use vcd_core::{AuthError, ConfigError, ExporterConfig, FetchError, ScrapeError};

/// Headers attached to an API request. Values are validated when added.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestHeaders {
    map: HeaderMap,
}

impl RequestHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Headers for an authenticated vCloud API call
    pub fn for_api(api_version: &str, bearer_token: &str) -> Result<Self, ScrapeError> {
        let accept = format!("application/*+xml;version={}", api_version);
        let headers = Self::new()
            .with(ACCEPT, &accept)
            .map_err(|_| ConfigError::Invalid {
                key: ENV_API_VERSION,
                value: api_version.to_string(),
            })?;

        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", bearer_token))
            .map_err(|_| AuthError::Request("bearer token is not a valid header value".to_string()))?;
        authorization.set_sensitive(true);

        Ok(headers.with_value(AUTHORIZATION, authorization))
    }

    /// Add a header, rejecting values that cannot be sent
    pub fn with(self, name: HeaderName, value: &str) -> Result<Self, InvalidHeaderValue> {
        Ok(self.with_value(name, HeaderValue::from_str(value)?))
    }

    pub fn with_value(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.map.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn header_map(&self) -> &HeaderMap {
        &self.map
    }
}

/// Status and body of a completed request
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs GET requests. Non-2xx statuses are returned, not raised;
/// only network-level failures are errors.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, headers: &RequestHeaders) -> Result<HttpResponse, FetchError>;
}

/// Build the reqwest client shared by API and token requests
pub fn build_http_client(config: &ExporterConfig) -> reqwest::Result<reqwest::Client> {
    if config.insecure_skip_verify {
        warn!("Upstream TLS certificate validation is disabled");
    }

    reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .danger_accept_invalid_certs(config.insecure_skip_verify)
        .build()
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &ExporterConfig) -> reqwest::Result<Self> {
        Ok(Self::new(build_http_client(config)?))
    }

    fn map_error(url: &str, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &RequestHeaders) -> Result<HttpResponse, FetchError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .headers(headers.header_map().clone())
            .send()
            .await
            .map_err(|e| Self::map_error(url, e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_error(url, e))?;

        debug!("GET {} -> {} ({} bytes)", url, status, body.len());

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Transport serving canned responses keyed by exact URL.
///
/// Unknown URLs answer 404. Every requested URL is recorded in order.
#[cfg(any(test, feature = "test-util"))]
#[derive(Default)]
pub struct MemoryTransport {
    responses: Mutex<HashMap<String, Result<HttpResponse, FetchError>>>,
    requests: Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test-util"))]
impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with status 200 for `url`
    pub fn respond(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> &Self {
        self.insert(url.into(), Ok(HttpResponse::ok(body)))
    }

    /// Serve an empty body with `status` for `url`
    pub fn respond_status(&self, url: impl Into<String>, status: u16) -> &Self {
        self.insert(url.into(), Ok(HttpResponse::status(status)))
    }

    /// Fail requests to `url` with `error`
    pub fn fail(&self, url: impl Into<String>, error: FetchError) -> &Self {
        self.insert(url.into(), Err(error))
    }

    fn insert(&self, url: String, response: Result<HttpResponse, FetchError>) -> &Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(url, response);
        }
        self
    }

    /// URLs requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of requests made to `url`
    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|u| u.as_str() == url).count()
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait::async_trait]
impl Transport for MemoryTransport {
    async fn get(&self, url: &str, _headers: &RequestHeaders) -> Result<HttpResponse, FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }

        self.responses
            .lock()
            .ok()
            .and_then(|responses| responses.get(url).cloned())
            .unwrap_or_else(|| Ok(HttpResponse::status(404)))
    }
}
