//! Bearer token cache
//!
//! A `TokenProvider` owns a single cached token and refreshes it through a
//! `TokenRefresher` once the clock reaches the token's expiry minus a safety
//! margin. The check-then-refresh sequence runs under an async mutex so
//! concurrent scrapes never issue duplicate refresh calls.

use crate::error::AuthError;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Lifetime assumed when the token endpoint does not advertise one
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Tokens are refreshed this many seconds before their recorded expiry
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Token as returned by the token endpoint
#[derive(Clone, Debug, PartialEq)]
pub struct IssuedToken {
    pub access_token: String,
    /// Advertised lifetime in seconds
    pub expires_in: Option<i64>,
}

/// Exchanges the long-lived credential for a bearer token
#[async_trait::async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<IssuedToken, AuthError>;
}

/// A cached bearer token
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    /// Whether the token can still be handed out at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now < self.expires_at - margin
    }
}

/// Single-slot token cache
pub struct TokenProvider {
    refresher: Arc<dyn TokenRefresher>,
    clock: Arc<dyn Clock>,
    margin: Duration,
    slot: Mutex<Option<Token>>,
}

impl TokenProvider {
    /// Create a provider using the wall clock
    pub fn new(refresher: Arc<dyn TokenRefresher>) -> Self {
        Self::with_clock(refresher, Arc::new(SystemClock))
    }

    /// Create a provider with an explicit clock
    pub fn with_clock(refresher: Arc<dyn TokenRefresher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            refresher,
            clock,
            margin: Duration::seconds(REFRESH_MARGIN_SECS),
            slot: Mutex::new(None),
        }
    }

    /// Return the cached token, refreshing it first if it is missing or
    /// within the safety margin of its expiry
    pub async fn get_token(&self) -> Result<String, AuthError> {
        let mut slot = self.slot.lock().await;
        let now = self.clock.now();

        if let Some(token) = slot.as_ref() {
            if token.is_fresh(now, self.margin) {
                debug!("Reusing cached bearer token (expires at {})", token.expires_at);
                return Ok(token.value.clone());
            }
        }

        let issued = self.refresher.refresh().await?;
        let lifetime = issued.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let expires_at = Duration::try_seconds(lifetime)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| AuthError::Request(format!("expires_in out of range: {}", lifetime)))?;
        let token = Token {
            value: issued.access_token,
            expires_at,
        };
        info!("Refreshed bearer token, valid until {}", token.expires_at);

        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    /// Drop the cached token so the next call refreshes
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}
