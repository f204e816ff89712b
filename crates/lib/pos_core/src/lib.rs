//! # pos_core
//!
//! Client-side core for the POS01 dashboard: persisted tokens, the
//! authenticated HTTP client with refresh-and-retry, the cached session query,
//! and the route gates built on top of them.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod gate;
pub mod models;
pub mod resources;
pub mod routes;
pub mod session;
pub mod tokens;

#[cfg(test)]
pub(crate) mod testing;

pub use client::HttpClient;
pub use http::{Method, StatusCode};
pub use config::ClientConfig;
pub use error::{ApiError, SessionError};
pub use session::SessionQuery;
pub use tokens::{TokenPair, TokenStore};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
