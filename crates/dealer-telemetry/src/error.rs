use thiserror::Error;

/// Errors that can occur while initializing telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The requested log level or directive could not be parsed.
    #[error("invalid log directive: {0}")]
    InvalidDirective(String),

    /// A global subscriber was already installed (e.g. by a test harness).
    #[error("failed to install global tracing subscriber: {0}")]
    AlreadyInitialized(String),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
