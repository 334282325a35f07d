//! Agent lifecycle controller
//!
//! ```text
//! Uninitialized --init--> Initialized --run_threads--> Running
//!       ^                                                 |
//!       |                                            stop_threads
//!       |                                                 v
//!       +--------------deinit------------- Stopped <-- Stopping
//! ```

use crate::error::{LifecycleError, Result};
use crate::registry::{PluginDescriptor, PluginRegistry};
use crate::supervisor::ThreadSupervisor;
use nova_agent_config::WorkerConfig;
use nova_agent_plugin_api::{Plugin, WorkerState};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Agent-wide lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Accepting registrations, nothing prepared
    Uninitialized,
    /// Registry validated, workers not started
    Initialized,
    /// Every worker is running
    Running,
    /// `stop_threads` is in progress
    Stopping,
    /// Every worker has been joined
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Worker counts per state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    /// Registered plugins
    pub total: usize,
    /// Workers not yet started
    pub unstarted: usize,
    /// Running workers
    pub running: usize,
    /// Workers signalled but not yet joined
    pub stop_requested: usize,
    /// Cleanly stopped workers
    pub stopped: usize,
    /// Failed workers
    pub failed: usize,
}

/// Lifecycle controller owning the registry and the supervisor
///
/// Operations take `&mut self`, so transitions are serialized by the borrow
/// checker. Callers sharing an agent across threads wrap it in a mutex.
#[derive(Debug)]
pub struct Agent {
    state: LifecycleState,
    registry: PluginRegistry,
    supervisor: ThreadSupervisor,
}

impl Agent {
    /// Create an agent with default worker settings
    pub fn new() -> Self {
        Self::with_config(WorkerConfig::default())
    }

    /// Create an agent with the given worker settings
    pub fn with_config(config: WorkerConfig) -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            registry: PluginRegistry::new(),
            supervisor: ThreadSupervisor::new(config),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The plugin registry
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Register a plugin
    ///
    /// Only valid before workers are started.
    pub fn register<P: Plugin + 'static>(&mut self, plugin: P) -> Result<()> {
        self.register_shared(Arc::new(plugin))
    }

    /// Register a plugin the caller keeps a handle to
    pub fn register_shared(&mut self, plugin: Arc<dyn Plugin>) -> Result<()> {
        match self.state {
            LifecycleState::Uninitialized | LifecycleState::Initialized => {
                self.registry.register(plugin)
            }
            state => Err(LifecycleError::invalid_transition("register", state)),
        }
    }

    /// `Uninitialized -> Initialized`
    ///
    /// Validates plugin dependencies and resets every worker state.
    pub fn init(&mut self) -> Result<()> {
        self.expect_state("init", LifecycleState::Uninitialized)?;

        if self.registry.is_empty() {
            info!("Agent initialized with no plugins");
        } else {
            self.registry.validate()?;
            self.registry.reset_states();
            info!(plugins = self.registry.len(), "Agent initialized");
        }

        self.state = LifecycleState::Initialized;
        Ok(())
    }

    /// `Initialized -> Running`
    ///
    /// On failure the agent stays `Initialized` with nothing running.
    /// Plugins registered after `init` are validated here.
    pub fn run_threads(&mut self) -> Result<()> {
        self.expect_state("run_threads", LifecycleState::Initialized)?;

        self.registry.validate()?;
        self.supervisor.start_all(self.registry.all())?;

        self.state = LifecycleState::Running;
        info!(workers = self.registry.len(), "Agent running");
        Ok(())
    }

    /// `Running -> Stopped`
    ///
    /// Always ends in `Stopped`. Per-plugin failures are returned as
    /// [`LifecycleError::Shutdown`].
    pub fn stop_threads(&mut self) -> Result<()> {
        self.expect_state("stop_threads", LifecycleState::Running)?;

        self.state = LifecycleState::Stopping;
        info!("Agent stopping");
        let outcome = self.supervisor.stop_all();
        self.state = LifecycleState::Stopped;

        match outcome {
            Ok(()) => {
                info!("Agent stopped");
                Ok(())
            }
            Err(errors) => {
                warn!(plugins = ?errors.plugins(), "Agent stopped with failures");
                Err(errors.into())
            }
        }
    }

    /// `Stopped -> Uninitialized`
    ///
    /// Drops every registered plugin so the agent can be reused.
    pub fn deinit(&mut self) -> Result<()> {
        self.expect_state("deinit", LifecycleState::Stopped)?;

        let released = self.registry.len();
        self.registry.clear();
        self.state = LifecycleState::Uninitialized;

        info!(plugins = released, "Agent deinitialized");
        Ok(())
    }

    /// `(name, state)` for every plugin, in registration order
    pub fn worker_states(&self) -> Vec<(String, WorkerState)> {
        self.registry
            .all()
            .iter()
            .map(|d| (d.name().to_string(), d.state()))
            .collect()
    }

    /// Worker counts per state
    pub fn stats(&self) -> WorkerStats {
        let descriptors: &[PluginDescriptor] = self.registry.all();
        let count = |state: WorkerState| descriptors.iter().filter(|d| d.state() == state).count();

        WorkerStats {
            total: descriptors.len(),
            unstarted: count(WorkerState::Unstarted),
            running: count(WorkerState::Running),
            stop_requested: count(WorkerState::StopRequested),
            stopped: count(WorkerState::Stopped),
            failed: count(WorkerState::Failed),
        }
    }

    fn expect_state(&self, operation: &'static str, expected: LifecycleState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(LifecycleError::invalid_transition(operation, self.state))
        }
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        if self.state == LifecycleState::Running {
            warn!("Agent dropped while running, stopping workers");
            if let Err(e) = self.stop_threads() {
                warn!(error = %e, "Shutdown on drop completed with failures");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_agent_plugin_api::testing::{EventLog, MockPlugin};
    use nova_agent_plugin_api::PluginDependency;

    #[test]
    fn test_agent_new() {
        let agent = Agent::new();
        assert_eq!(agent.state(), LifecycleState::Uninitialized);
        assert_eq!(agent.stats(), WorkerStats::default());
    }

    #[test]
    fn test_full_lifecycle() {
        let log = EventLog::new();
        let mut agent = Agent::new();
        agent.register(MockPlugin::new("a", &log)).unwrap();

        agent.init().unwrap();
        assert_eq!(agent.state(), LifecycleState::Initialized);

        agent.run_threads().unwrap();
        assert_eq!(agent.state(), LifecycleState::Running);
        assert_eq!(agent.stats().running, 1);

        agent.stop_threads().unwrap();
        assert_eq!(agent.state(), LifecycleState::Stopped);
        assert_eq!(agent.worker_states(), vec![("a".to_string(), WorkerState::Stopped)]);

        agent.deinit().unwrap();
        assert_eq!(agent.state(), LifecycleState::Uninitialized);
        assert!(agent.registry().is_empty());
    }

    #[test]
    fn test_empty_agent_lifecycle() {
        let mut agent = Agent::new();
        agent.init().unwrap();
        agent.run_threads().unwrap();
        agent.stop_threads().unwrap();
        agent.deinit().unwrap();
        assert_eq!(agent.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn test_out_of_order_operations() {
        let mut agent = Agent::new();

        let err = agent.run_threads().unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidLifecycleTransition {
                operation: "run_threads",
                state: LifecycleState::Uninitialized
            }
        ));
        assert_eq!(agent.state(), LifecycleState::Uninitialized);

        assert!(agent.stop_threads().is_err());
        assert!(agent.deinit().is_err());
        assert_eq!(agent.state(), LifecycleState::Uninitialized);

        agent.init().unwrap();
        assert!(agent.init().is_err());
        assert!(agent.stop_threads().is_err());
        assert!(agent.deinit().is_err());
        assert_eq!(agent.state(), LifecycleState::Initialized);
    }

    #[test]
    fn test_register_after_run_is_rejected() {
        let log = EventLog::new();
        let mut agent = Agent::new();
        agent.init().unwrap();
        agent.register(MockPlugin::new("early", &log)).unwrap();
        agent.run_threads().unwrap();

        let err = agent.register(MockPlugin::new("late", &log)).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidLifecycleTransition { operation: "register", .. }
        ));
        assert_eq!(agent.registry().names(), vec!["early"]);

        agent.stop_threads().unwrap();
        assert!(agent.register(MockPlugin::new("late", &log)).is_err());
    }

    #[test]
    fn test_init_rejects_missing_dependency() {
        let log = EventLog::new();
        let mut agent = Agent::new();
        agent
            .register(
                MockPlugin::new("api", &log).with_dependency(PluginDependency::required("storage")),
            )
            .unwrap();

        assert!(matches!(
            agent.init(),
            Err(LifecycleError::MissingDependency { .. })
        ));
        assert_eq!(agent.state(), LifecycleState::Uninitialized);
    }

    #[test]
    fn test_run_rejects_dependency_registered_after_init() {
        let log = EventLog::new();
        let mut agent = Agent::new();
        agent.init().unwrap();
        agent
            .register(
                MockPlugin::new("api", &log).with_dependency(PluginDependency::required("storage")),
            )
            .unwrap();

        let err = agent.run_threads().unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::MissingDependency { ref plugin, ref dependency }
                if plugin == "api" && dependency == "storage"
        ));
        assert_eq!(agent.state(), LifecycleState::Initialized);
        assert!(log.calls("init").is_empty());
        assert!(log.calls("run").is_empty());
    }

    #[test]
    fn test_run_failure_stays_initialized() {
        let log = EventLog::new();
        let mut agent = Agent::new();
        agent.register(MockPlugin::new("bad", &log).failing_init()).unwrap();
        agent.init().unwrap();

        assert!(matches!(
            agent.run_threads(),
            Err(LifecycleError::PartialStartFailure { .. })
        ));
        assert_eq!(agent.state(), LifecycleState::Initialized);
        assert_eq!(agent.stats().failed, 1);
    }

    #[test]
    fn test_drop_while_running_stops_workers() {
        let log = EventLog::new();
        {
            let mut agent = Agent::new();
            agent.register(MockPlugin::new("a", &log)).unwrap();
            agent.init().unwrap();
            agent.run_threads().unwrap();
        }
        assert_eq!(log.calls("exit"), vec!["a"]);
        assert_eq!(log.calls("deinit"), vec!["a"]);
    }

    #[test]
    fn test_lifecycle_state_display() {
        assert_eq!(LifecycleState::Stopping.to_string(), "stopping");
    }
}
