//! Logging setup for the dealership call coordination backend.
//!
//! # Example
//!
//! ```rust,no_run
//! use dealer_telemetry::{LogConfig, setup_logging};
//!
//! # fn main() -> Result<(), dealer_telemetry::TelemetryError> {
//! setup_logging(&LogConfig::new("info").with_directive("dealer_store=debug"))?;
//! tracing::info!("listening");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all)]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, setup_default_logging, setup_logging};
