use thiserror::Error;

/// Errors encountered while resolving startup configuration from the
/// environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable was present but not valid for its field.
    #[error("invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        /// The environment variable name.
        var: &'static str,
        /// The value that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
