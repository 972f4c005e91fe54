//! OAuth refresh-token exchange against the provider token endpoint

use reqwest::header::ACCEPT;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;
use vcd_core::config::{ENV_API_TOKEN, ENV_URL};
use vcd_core::{AuthError, ConfigError, ExporterConfig, IssuedToken, TokenRefresher};

/// Path of the provider token endpoint, relative to the API origin
pub const TOKEN_PATH: &str = "/oauth/provider/token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<serde_json::Value>,
}

/// Exchanges the configured refresh token for bearer tokens
pub struct HttpTokenRefresher {
    client: reqwest::Client,
    base_url: Option<String>,
    refresh_token: Option<String>,
}

impl HttpTokenRefresher {
    pub fn new(client: reqwest::Client, config: &ExporterConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            refresh_token: config.refresh_token.clone(),
        }
    }

    /// Token endpoint URL on the origin of `base_url`
    pub fn token_url(base_url: &str) -> Result<String, ConfigError> {
        let invalid = || ConfigError::Invalid {
            key: ENV_URL,
            value: base_url.to_string(),
        };
        let base = Url::parse(base_url).map_err(|_| invalid())?;
        base.join(TOKEN_PATH).map(String::from).map_err(|_| invalid())
    }
}

/// Parse a token endpoint response body. `expires_in` may be a number or a
/// numeric string; anything else is treated as absent.
pub fn parse_token_response(body: &[u8]) -> Result<IssuedToken, AuthError> {
    let response: TokenResponse = serde_json::from_slice(body)
        .map_err(|e| AuthError::Request(format!("unparsable token response: {}", e)))?;

    if response.access_token.is_empty() {
        return Err(AuthError::Request("token response has an empty access_token".to_string()));
    }

    let expires_in = response.expires_in.and_then(|value| match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    });

    Ok(IssuedToken {
        access_token: response.access_token,
        expires_in,
    })
}

#[async_trait::async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self) -> Result<IssuedToken, AuthError> {
        let refresh_token = self
            .refresh_token
            .as_deref()
            .ok_or(ConfigError::Missing(ENV_API_TOKEN))?;
        let base_url = self.base_url.as_deref().ok_or(ConfigError::Missing(ENV_URL))?;
        let url = Self::token_url(base_url)?;

        debug!("Requesting bearer token from {}", url);

        let response = self
            .client
            .post(&url)
            .query(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::Request(format!("POST {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Request(format!(
                "{} returned status {}",
                url,
                status.as_u16()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::Request(format!("reading token response failed: {}", e)))?;

        parse_token_response(&body)
    }
}
