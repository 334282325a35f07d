//! Plugin error types

use std::fmt;

/// Error returned by a plugin hook
///
/// The runtime treats these as opaque and always reports them together with
/// the name of the plugin that produced them.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// Initialization failed
    #[error("Initialization failed: {0}")]
    InitError(String),

    /// Run loop failed
    #[error("Runtime error: {0}")]
    RuntimeError(String),

    /// Deinitialization failed
    #[error("Deinitialization failed: {0}")]
    DeinitError(String),

    /// Hook called in a state the plugin cannot handle
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Plugin settings are unusable
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Worker thread panicked
    #[error("Worker panicked: {0}")]
    Panicked(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Result type for plugin operations
pub type Result<T, E = PluginError> = std::result::Result<T, E>;

impl PluginError {
    /// Create a new initialization error
    pub fn init(msg: impl fmt::Display) -> Self {
        Self::InitError(msg.to_string())
    }

    /// Create a new runtime error
    pub fn runtime(msg: impl fmt::Display) -> Self {
        Self::RuntimeError(msg.to_string())
    }

    /// Create a new deinitialization error
    pub fn deinit(msg: impl fmt::Display) -> Self {
        Self::DeinitError(msg.to_string())
    }

    /// Create a new invalid state error
    pub fn invalid_state(msg: impl fmt::Display) -> Self {
        Self::InvalidState(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config(msg: impl fmt::Display) -> Self {
        Self::ConfigError(msg.to_string())
    }

    /// Build a panic error from a payload returned by `JoinHandle::join`
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(message)
    }
}
