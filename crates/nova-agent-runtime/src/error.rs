//! Lifecycle error types

use crate::lifecycle::LifecycleState;
use nova_agent_plugin_api::PluginError;
use serde::Serialize;
use std::fmt;

/// Lifecycle error type
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Plugin name is empty or contains whitespace
    #[error("Invalid plugin identity: {0:?}")]
    InvalidIdentity(String),

    /// A plugin with this name is already registered
    #[error("Plugin already registered: {0}")]
    DuplicateIdentity(String),

    /// A required dependency is not registered ahead of the plugin
    #[error("Plugin '{plugin}' depends on '{dependency}', which is not registered before it")]
    MissingDependency {
        /// Dependent plugin
        plugin: String,
        /// Missing dependency
        dependency: String,
    },

    /// A dependency is registered but its version does not match
    #[error("Plugin '{plugin}' requires '{dependency}' {required}, found {found}")]
    IncompatibleDependency {
        /// Dependent plugin
        plugin: String,
        /// Dependency name
        dependency: String,
        /// Version requirement
        required: String,
        /// Version actually registered
        found: String,
    },

    /// Operation is not valid in the current lifecycle state
    #[error("Cannot {operation} while agent is {state}")]
    InvalidLifecycleTransition {
        /// Operation attempted
        operation: &'static str,
        /// State the agent was in
        state: LifecycleState,
    },

    /// A plugin failed to start; every plugin already started was rolled back
    #[error("Failed to start plugin '{plugin}': {source}")]
    PartialStartFailure {
        /// First plugin that failed
        plugin: String,
        /// Underlying plugin error
        #[source]
        source: PluginError,
    },

    /// Shutdown completed with per-plugin failures
    #[error(transparent)]
    Shutdown(#[from] ShutdownErrors),
}

/// Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;

impl LifecycleError {
    /// Create a new invalid transition error
    pub fn invalid_transition(operation: &'static str, state: LifecycleState) -> Self {
        Self::InvalidLifecycleTransition { operation, state }
    }

    /// Create a new partial start failure
    pub fn start_failure(plugin: impl Into<String>, source: PluginError) -> Self {
        Self::PartialStartFailure {
            plugin: plugin.into(),
            source,
        }
    }
}

/// Phase in which a plugin failed during shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePhase {
    /// The run hook returned an error or panicked
    Run,
    /// The worker did not terminate within the join timeout
    Join,
    /// The deinit hook returned an error
    Deinit,
}

impl fmt::Display for FailurePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePhase::Run => f.write_str("run"),
            FailurePhase::Join => f.write_str("join"),
            FailurePhase::Deinit => f.write_str("deinit"),
        }
    }
}

/// One plugin failure recorded during shutdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginFailure {
    /// Plugin name
    pub plugin: String,
    /// Where it failed
    pub phase: FailurePhase,
    /// Failure message
    pub reason: String,
}

impl fmt::Display for PluginFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.plugin, self.phase, self.reason)
    }
}

/// Aggregate of every failure seen while stopping the agent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownErrors {
    /// Failures in the order they were observed
    pub failures: Vec<PluginFailure>,
}

impl ShutdownErrors {
    /// Record a failure
    pub fn push(&mut self, plugin: impl Into<String>, phase: FailurePhase, reason: impl fmt::Display) {
        self.failures.push(PluginFailure {
            plugin: plugin.into(),
            phase,
            reason: reason.to_string(),
        });
    }

    /// Check if nothing failed
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Names of failing plugins, deduplicated, in first-failure order
    pub fn plugins(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for failure in &self.failures {
            if !names.contains(&failure.plugin.as_str()) {
                names.push(&failure.plugin);
            }
        }
        names
    }

    /// `Ok(())` when empty, `Err(self)` otherwise
    pub fn into_result(self) -> std::result::Result<(), ShutdownErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ShutdownErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shutdown completed with {} failure(s)", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "; {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ShutdownErrors {}
