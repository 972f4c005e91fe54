//! HTTP access to the vCloud Director API
//!
//! This library provides:
//! - A `Transport` seam over reqwest, with an in-memory implementation
//!   behind the `test-util` feature
//! - The paginating resource client
//! - The per-cluster capacity and storage-profile collector
//! - The OAuth refresh-token exchange backing the token cache

pub mod transport;
pub mod client;
pub mod capacity;
pub mod auth;

pub use transport::{HttpResponse, RequestHeaders, ReqwestTransport, Transport};
#[cfg(any(test, feature = "test-util"))]
pub use transport::MemoryTransport;
pub use client::{Page, ResourceClient};
pub use capacity::CapacityCollector;
pub use auth::HttpTokenRefresher;
