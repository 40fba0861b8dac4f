use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{TelemetryError, TelemetryResult};

/// Logging configuration: a base level plus optional per-target directives
/// (e.g. `"dealer_store=debug"`), combined into an [`EnvFilter`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    level: String,
    directives: Vec<String>,
    json: bool,
}

impl LogConfig {
    /// Start from a base level (`"trace"`, `"debug"`, `"info"`, `"warn"`, `"error"`).
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            directives: Vec::new(),
            json: false,
        }
    }

    /// Add a per-target filter directive, e.g. `"dealer_store=debug"`.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Emit newline-delimited JSON instead of the default human-readable format.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    fn build_filter(&self) -> TelemetryResult<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.level)
            .map_err(|e| TelemetryError::InvalidDirective(e.to_string()))?;
        for directive in &self.directives {
            let parsed = directive
                .parse()
                .map_err(|_| TelemetryError::InvalidDirective(directive.clone()))?;
            filter = filter.add_directive(parsed);
        }
        Ok(filter)
    }
}

/// Install a global `tracing` subscriber built from `config`.
///
/// Respects `RUST_LOG` if set (via `EnvFilter`'s default precedence over the
/// configured base level). Intended to be called exactly once, near the top
/// of `main`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidDirective`] if `config`'s level or
/// directives fail to parse, or [`TelemetryError::AlreadyInitialized`] if a
/// global subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.build_filter()?;
    let fmt_layer = fmt::layer().with_target(true);

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .try_init()
            .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))
    }
}

/// Install logging with sensible defaults (`info`, human-readable, honoring
/// `RUST_LOG`). Convenience wrapper for binaries that don't need custom
/// directives.
///
/// # Errors
///
/// See [`setup_logging`].
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::new("info"))
}
