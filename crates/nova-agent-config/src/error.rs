//! Configuration error types

/// Configuration error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// Config content could not be parsed
    #[error("Failed to parse {format}: {message}")]
    Parse {
        /// Format being parsed
        format: &'static str,
        /// Parser message
        message: String,
    },

    /// Unknown file extension
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// `${VAR}` without a default and the variable is unset
    #[error("Environment variable '{0}' not set and no default provided")]
    MissingEnvVar(String),

    /// Config parsed but is semantically invalid
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    /// Create a new invalid configuration error
    pub fn invalid(msg: impl std::fmt::Display) -> Self {
        Self::Invalid(msg.to_string())
    }
}
