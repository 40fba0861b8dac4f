//! Startup configuration for the dealership call coordination backend.
//!
//! This crate has no dependency on other internal crates, matching the
//! boundary rule this workspace uses elsewhere: configuration is a leaf.
//! Every field defaults to a production-ready value (spec §6) so that a
//! bare environment still produces a working [`Config`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use dealer_config::Config;
//!
//! let config = Config::from_env().unwrap();
//! println!("binding {}:{}", config.host, config.port);
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(unsafe_code))]

mod error;

pub use error::{ConfigError, ConfigResult};

use std::time::Duration;

/// Resolved startup configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind the HTTP/WebSocket listener on. Default `localhost`.
    pub host: String,
    /// Port to bind the HTTP/WebSocket listener on. Default `3000`.
    pub port: u16,
    /// API key for the LLM provider backing `/api/chat`. `None` if unset —
    /// the chat endpoint still answers with bookkeeping-only responses
    /// (the real LLM call is out of scope, see spec §1).
    pub llm_api_key: Option<String>,
    /// Interval between janitor sweeps. Default 30s (spec §4.7).
    pub janitor_interval: Duration,
    /// Grace window after disconnect before a shopper entry is evicted.
    /// Default 60s (spec §4.7).
    pub disconnect_grace: Duration,
    /// TTL for a `pending` collaboration request before it is swept.
    /// Default 5 minutes (spec §4.7).
    pub collab_request_ttl: Duration,
    /// Capacity of the broadcast channel carrying `queue_update` snapshots.
    pub broadcast_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3000,
            llm_api_key: None,
            janitor_interval: Duration::from_secs(30),
            disconnect_grace: Duration::from_secs(60),
            collab_request_ttl: Duration::from_secs(5 * 60),
            broadcast_capacity: 256,
        }
    }
}

impl Config {
    /// Resolve configuration from environment variables, falling back to
    /// [`Default::default`] for anything unset.
    ///
    /// Recognized variables: `HOST`, `PORT`, `LLM_API_KEY`,
    /// `JANITOR_INTERVAL_SECS`, `DISCONNECT_GRACE_SECS`,
    /// `COLLAB_REQUEST_TTL_SECS`, `BROADCAST_CAPACITY`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a set variable fails to
    /// parse into its expected type.
    pub fn from_env() -> ConfigResult<Self> {
        let defaults = Self::default();

        let host = std::env::var("HOST").unwrap_or(defaults.host);
        let port = parse_env_or("PORT", defaults.port)?;
        let llm_api_key = std::env::var("LLM_API_KEY").ok();
        let janitor_interval =
            Duration::from_secs(parse_env_or("JANITOR_INTERVAL_SECS", defaults.janitor_interval.as_secs())?);
        let disconnect_grace =
            Duration::from_secs(parse_env_or("DISCONNECT_GRACE_SECS", defaults.disconnect_grace.as_secs())?);
        let collab_request_ttl = Duration::from_secs(parse_env_or(
            "COLLAB_REQUEST_TTL_SECS",
            defaults.collab_request_ttl.as_secs(),
        )?);
        let broadcast_capacity = parse_env_or("BROADCAST_CAPACITY", defaults.broadcast_capacity)?;

        Ok(Self {
            host,
            port,
            llm_api_key,
            janitor_interval,
            disconnect_grace,
            collab_request_ttl,
            broadcast_capacity,
        })
    }
}

fn parse_env_or<T>(var: &'static str, default: T) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(value) => value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var,
            value,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
