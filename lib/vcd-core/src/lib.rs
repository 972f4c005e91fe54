//! Core collection state for the vCloud Director exporter
//!
//! This library provides:
//! - The error taxonomy shared by the pipeline
//! - Exporter configuration loaded from the environment
//! - The bearer token cache
//! - The aggregator merging listings and per-cluster detail into a snapshot

pub mod error;
pub mod config;
pub mod token;
pub mod outcome;
pub mod aggregate;

pub use error::{AuthError, ConfigError, FetchError, ScrapeError};
pub use config::ExporterConfig;
pub use token::{Clock, IssuedToken, SystemClock, Token, TokenProvider, TokenRefresher};
pub use outcome::DetailOutcome;
pub use aggregate::{Aggregator, ClusterDetail, Snapshot};
