//! Core plugin trait and types

use crate::error::Result;
use crate::stop::StopSignal;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Core plugin trait that all plugins must implement
///
/// Every hook takes `&self`: `run` executes on the worker thread while
/// `request_stop` is called from the control thread, so plugins keep any
/// mutable state behind their own synchronization.
pub trait Plugin: Send + Sync + fmt::Debug {
    /// Plugin name (must be unique within an agent)
    fn name(&self) -> &str;

    /// Plugin version (semver)
    fn version(&self) -> &str {
        "0.0.0"
    }

    /// Plugin description
    fn description(&self) -> &str {
        ""
    }

    /// Plugins that must be registered before this one
    fn dependencies(&self) -> Vec<PluginDependency> {
        vec![]
    }

    /// Initialize the plugin
    ///
    /// Called synchronously on the control thread before any worker is
    /// spawned. Returning an error aborts the whole start sequence.
    fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Worker entry point
    ///
    /// Runs on its own thread until `stop` is requested. Implementations must
    /// observe the signal and return promptly once it is set.
    fn run(&self, stop: &StopSignal) -> Result<()>;

    /// Wake the run loop after the stop signal has been set
    ///
    /// Plugins blocked on something other than the [`StopSignal`] (a socket,
    /// a channel) override this to unblock it.
    fn request_stop(&self) {}

    /// Release plugin resources
    ///
    /// Called after the worker has been joined, in reverse registration order.
    fn deinit(&self) -> Result<()> {
        Ok(())
    }

    /// Get plugin metadata
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            name: self.name().to_string(),
            version: self.version().to_string(),
            description: self.description().to_string(),
            dependencies: self.dependencies(),
        }
    }
}

/// Plugin dependency specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDependency {
    /// Plugin name
    pub name: String,

    /// Version requirement (semver), `None` accepts any version
    pub version_req: Option<String>,

    /// Whether this dependency is optional
    pub optional: bool,
}

impl PluginDependency {
    /// Create a required dependency
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version_req: None,
            optional: false,
        }
    }

    /// Create an optional dependency
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version_req: None,
            optional: true,
        }
    }

    /// Constrain the dependency to a semver requirement
    pub fn with_version(mut self, version_req: impl Into<String>) -> Self {
        self.version_req = Some(version_req.into());
        self
    }

    /// Check if a version satisfies this dependency
    pub fn satisfies(&self, version: &str) -> bool {
        let Some(req) = &self.version_req else {
            return true;
        };
        let Ok(req) = semver::VersionReq::parse(req) else {
            return false;
        };
        let Ok(ver) = Version::parse(version) else {
            return false;
        };
        req.matches(&ver)
    }
}

/// Plugin metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Plugin name
    pub name: String,

    /// Plugin version
    pub version: String,

    /// Plugin description
    pub description: String,

    /// Plugin dependencies
    pub dependencies: Vec<PluginDependency>,
}

/// State of a plugin's worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// No worker has been started
    Unstarted,

    /// Worker thread is executing the run hook
    Running,

    /// Stop signal has been set, worker not yet joined
    StopRequested,

    /// Worker returned normally after the stop signal
    Stopped,

    /// Worker or one of the plugin hooks failed
    Failed,
}

impl WorkerState {
    /// Check if the worker is running
    pub fn is_running(&self) -> bool {
        matches!(self, WorkerState::Running)
    }

    /// Check if the worker stopped cleanly
    pub fn is_stopped(&self) -> bool {
        matches!(self, WorkerState::Stopped)
    }

    /// Check if the worker failed
    pub fn is_failed(&self) -> bool {
        matches!(self, WorkerState::Failed)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Unstarted => "unstarted",
            WorkerState::Running => "running",
            WorkerState::StopRequested => "stop_requested",
            WorkerState::Stopped => "stopped",
            WorkerState::Failed => "failed",
        };
        f.write_str(s)
    }
}
