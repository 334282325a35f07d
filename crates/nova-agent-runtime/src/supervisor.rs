//! Worker thread supervision
//!
//! The supervisor owns one OS thread per plugin. Starting is all-or-nothing:
//! every `init` hook runs before any thread is spawned, and any failure rolls
//! the already-initialized plugins back in reverse order. Stopping is best
//! effort: every worker is signalled, joined and deinitialized regardless of
//! how its neighbours fail.

use crate::error::{FailurePhase, LifecycleError, Result, ShutdownErrors};
use crate::lifecycle::LifecycleState;
use crate::registry::PluginDescriptor;
use nova_agent_config::WorkerConfig;
use nova_agent_plugin_api::{PluginError, StopSignal, WorkerState};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// A spawned worker
#[derive(Debug)]
pub struct WorkerHandle {
    descriptor: PluginDescriptor,
    stop: StopSignal,
    thread: JoinHandle<std::result::Result<(), PluginError>>,
}

enum JoinOutcome {
    Finished(std::result::Result<(), PluginError>),
    TimedOut(Duration),
}

impl WorkerHandle {
    /// Plugin this worker runs
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Check if the worker thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    fn signal(&self) {
        self.descriptor.set_state(WorkerState::StopRequested);
        self.stop.request();
        self.descriptor.plugin().request_stop();
    }

    fn join(self, timeout: Option<Duration>) -> JoinOutcome {
        // A timeout past the representable range of `Instant` joins without a deadline.
        let deadline = timeout.and_then(|t| Some((t, Instant::now().checked_add(t)?)));
        if let Some((timeout, deadline)) = deadline {
            while !self.thread.is_finished() {
                if Instant::now() >= deadline {
                    return JoinOutcome::TimedOut(timeout);
                }
                thread::sleep(JOIN_POLL_INTERVAL);
            }
        }

        match self.thread.join() {
            Ok(result) => JoinOutcome::Finished(result),
            Err(payload) => JoinOutcome::Finished(Err(PluginError::from_panic(payload.as_ref()))),
        }
    }
}

/// Starts, tracks and stops plugin workers
#[derive(Debug, Default)]
pub struct ThreadSupervisor {
    config: WorkerConfig,
    workers: Vec<WorkerHandle>,
}

impl ThreadSupervisor {
    /// Create a supervisor with the given worker settings
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            workers: Vec::new(),
        }
    }

    /// Worker settings
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Live worker handles in registration order
    pub fn workers(&self) -> &[WorkerHandle] {
        &self.workers
    }

    /// Check if any worker is being tracked
    pub fn is_running(&self) -> bool {
        !self.workers.is_empty()
    }

    /// Initialize every plugin, then spawn one worker per plugin
    ///
    /// Returns once all workers are spawned. On failure nothing is left
    /// running and every plugin that was initialized has been deinitialized.
    pub fn start_all(&mut self, descriptors: &[PluginDescriptor]) -> Result<()> {
        if self.is_running() {
            return Err(LifecycleError::invalid_transition(
                "start_all",
                LifecycleState::Running,
            ));
        }

        for (position, descriptor) in descriptors.iter().enumerate() {
            descriptor.set_state(WorkerState::Unstarted);

            if let Err(e) = descriptor.plugin().init() {
                error!(plugin = %descriptor.name(), error = %e, "Plugin initialization failed");
                descriptor.set_state(WorkerState::Failed);
                rollback(&descriptors[..position]);
                return Err(LifecycleError::start_failure(descriptor.name(), e));
            }

            debug!(plugin = %descriptor.name(), "Plugin initialized");
        }

        for descriptor in descriptors {
            match self.spawn(descriptor) {
                Ok(handle) => {
                    descriptor.set_state(WorkerState::Running);
                    self.workers.push(handle);
                }
                Err(e) => {
                    error!(plugin = %descriptor.name(), error = %e, "Failed to spawn worker thread");
                    self.abort_spawned();
                    rollback(descriptors);
                    descriptor.set_state(WorkerState::Failed);
                    return Err(LifecycleError::start_failure(descriptor.name(), e.into()));
                }
            }
        }

        info!(workers = self.workers.len(), "All workers started");
        Ok(())
    }

    /// Signal, join and deinitialize every worker
    ///
    /// Never stops early: one plugin's failure is recorded and the rest are
    /// still processed.
    pub fn stop_all(&mut self) -> std::result::Result<(), ShutdownErrors> {
        let workers = std::mem::take(&mut self.workers);
        let mut errors = ShutdownErrors::default();

        for worker in &workers {
            debug!(plugin = %worker.name(), "Requesting worker stop");
            worker.signal();
        }

        let mut joined = Vec::with_capacity(workers.len());
        for worker in workers {
            let descriptor = worker.descriptor.clone();
            let name = descriptor.name();

            match worker.join(self.config.join_timeout) {
                JoinOutcome::Finished(Ok(())) => {
                    descriptor.set_state(WorkerState::Stopped);
                    debug!(plugin = %name, "Worker stopped");
                    joined.push(descriptor);
                }
                JoinOutcome::Finished(Err(e)) => {
                    warn!(plugin = %name, error = %e, "Worker terminated abnormally");
                    descriptor.set_state(WorkerState::Failed);
                    errors.push(name, FailurePhase::Run, &e);
                    joined.push(descriptor);
                }
                JoinOutcome::TimedOut(timeout) => {
                    warn!(
                        plugin = %name,
                        timeout = ?timeout,
                        "Worker did not stop in time, detaching it"
                    );
                    descriptor.set_state(WorkerState::Failed);
                    errors.push(
                        name,
                        FailurePhase::Join,
                        format!("worker did not stop within {timeout:?}"),
                    );
                }
            }
        }

        for descriptor in joined.iter().rev() {
            if let Err(e) = descriptor.plugin().deinit() {
                warn!(plugin = %descriptor.name(), error = %e, "Plugin deinitialization failed");
                descriptor.set_state(WorkerState::Failed);
                errors.push(descriptor.name(), FailurePhase::Deinit, &e);
            }
        }

        if errors.is_empty() {
            info!("All workers stopped");
        } else {
            warn!(failures = errors.failures.len(), "Workers stopped with failures");
        }

        errors.into_result()
    }

    fn spawn(&self, descriptor: &PluginDescriptor) -> std::io::Result<WorkerHandle> {
        let stop = StopSignal::new();
        let worker_stop = stop.clone();
        let plugin = Arc::clone(descriptor.plugin());

        let mut builder = thread::Builder::new().name(format!(
            "{}-{}",
            self.config.thread_name_prefix,
            descriptor.name()
        ));
        if let Some(stack_size) = self.config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let thread = builder.spawn(move || plugin.run(&worker_stop))?;

        Ok(WorkerHandle {
            descriptor: descriptor.clone(),
            stop,
            thread,
        })
    }

    /// Stop workers spawned during a start that is being abandoned
    fn abort_spawned(&mut self) {
        let workers = std::mem::take(&mut self.workers);

        for worker in &workers {
            worker.signal();
        }

        for worker in workers {
            let name = worker.name().to_string();
            if let JoinOutcome::Finished(Err(e)) = worker.join(None) {
                warn!(plugin = %name, error = %e, "Worker failed while aborting start");
            }
        }
    }
}

/// Deinitialize `initialized` in reverse order, logging failures
fn rollback(initialized: &[PluginDescriptor]) {
    for descriptor in initialized.iter().rev() {
        info!(plugin = %descriptor.name(), "Rolling back plugin initialization");
        if let Err(e) = descriptor.plugin().deinit() {
            warn!(plugin = %descriptor.name(), error = %e, "Deinitialization failed during rollback");
        }
        descriptor.set_state(WorkerState::Unstarted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PluginRegistry;
    use nova_agent_plugin_api::testing::{EventLog, MockPlugin, RunBehavior};

    fn registry(plugins: Vec<MockPlugin>) -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        for plugin in plugins {
            registry.register(Arc::new(plugin)).unwrap();
        }
        registry
    }

    #[test]
    fn test_start_and_stop() {
        let log = EventLog::new();
        let registry = registry(vec![MockPlugin::new("a", &log), MockPlugin::new("b", &log)]);
        let mut supervisor = ThreadSupervisor::default();

        supervisor.start_all(registry.all()).unwrap();
        assert!(supervisor.is_running());
        assert_eq!(supervisor.workers().len(), 2);
        assert!(registry.all().iter().all(|d| d.state() == WorkerState::Running));

        supervisor.stop_all().unwrap();
        assert!(!supervisor.is_running());
        assert!(registry.all().iter().all(|d| d.state() == WorkerState::Stopped));
        assert_eq!(log.calls("init"), vec!["a", "b"]);
        assert_eq!(log.calls("deinit"), vec!["b", "a"]);
    }

    #[test]
    fn test_init_failure_rolls_back() {
        let log = EventLog::new();
        let registry = registry(vec![
            MockPlugin::new("a", &log),
            MockPlugin::new("b", &log).failing_init(),
            MockPlugin::new("c", &log),
        ]);
        let mut supervisor = ThreadSupervisor::default();

        let err = supervisor.start_all(registry.all()).unwrap_err();

        assert!(matches!(err, LifecycleError::PartialStartFailure { ref plugin, .. } if plugin == "b"));
        assert!(!supervisor.is_running());
        assert_eq!(log.calls("init"), vec!["a", "b"]);
        assert_eq!(log.calls("deinit"), vec!["a"]);
        assert!(log.calls("run").is_empty());
        assert_eq!(registry.get("a").unwrap().state(), WorkerState::Unstarted);
        assert_eq!(registry.get("b").unwrap().state(), WorkerState::Failed);
        assert_eq!(registry.get("c").unwrap().state(), WorkerState::Unstarted);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let log = EventLog::new();
        let registry = registry(vec![MockPlugin::new("a", &log)]);
        let mut supervisor = ThreadSupervisor::default();

        supervisor.start_all(registry.all()).unwrap();
        let err = supervisor.start_all(registry.all()).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidLifecycleTransition {
                operation: "start_all",
                state: LifecycleState::Running
            }
        ));
        assert_eq!(log.calls("init"), vec!["a"]);

        supervisor.stop_all().unwrap();
    }

    // Larger than any 64-bit address space, so the thread cannot be created.
    #[cfg(all(unix, target_pointer_width = "64"))]
    #[test]
    fn test_spawn_failure_rolls_back() {
        let log = EventLog::new();
        let registry = registry(vec![MockPlugin::new("a", &log), MockPlugin::new("b", &log)]);
        let mut supervisor = ThreadSupervisor::new(WorkerConfig {
            stack_size: Some(1 << 52),
            ..Default::default()
        });

        let err = supervisor.start_all(registry.all()).unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::PartialStartFailure { ref plugin, source: PluginError::Io(_) }
                if plugin == "a"
        ));
        assert!(!supervisor.is_running());
        assert_eq!(log.calls("init"), vec!["a", "b"]);
        assert_eq!(log.calls("deinit"), vec!["b", "a"]);
        assert!(log.calls("run").is_empty());
        assert_eq!(registry.get("a").unwrap().state(), WorkerState::Failed);
        assert_eq!(registry.get("b").unwrap().state(), WorkerState::Unstarted);
    }

    #[test]
    fn test_unbounded_join_timeout() {
        let log = EventLog::new();
        let registry = registry(vec![MockPlugin::new("a", &log)]);
        let mut supervisor = ThreadSupervisor::new(WorkerConfig {
            join_timeout: Some(Duration::MAX),
            ..Default::default()
        });

        supervisor.start_all(registry.all()).unwrap();
        supervisor.stop_all().unwrap();

        assert_eq!(registry.get("a").unwrap().state(), WorkerState::Stopped);
        assert_eq!(log.calls("deinit"), vec!["a"]);
    }

    #[test]
    fn test_request_stop_wakes_worker() {
        let log = EventLog::new();
        let registry = registry(vec![
            MockPlugin::new("socket", &log).with_behavior(RunBehavior::UntilRequestStop)
        ]);
        let mut supervisor = ThreadSupervisor::default();

        supervisor.start_all(registry.all()).unwrap();
        supervisor.stop_all().unwrap();

        assert_eq!(log.calls("request_stop"), vec!["socket"]);
        assert_eq!(registry.get("socket").unwrap().state(), WorkerState::Stopped);
    }

    #[test]
    fn test_failures_do_not_block_shutdown() {
        let log = EventLog::new();
        let registry = registry(vec![
            MockPlugin::new("ok", &log),
            MockPlugin::new("errs", &log).with_behavior(RunBehavior::FailOnStop),
            MockPlugin::new("panics", &log).with_behavior(RunBehavior::PanicOnStop),
            MockPlugin::new("dirty", &log).failing_deinit(),
        ]);
        let mut supervisor = ThreadSupervisor::default();

        supervisor.start_all(registry.all()).unwrap();
        let errors = supervisor.stop_all().unwrap_err();

        assert_eq!(errors.plugins(), vec!["errs", "panics", "dirty"]);
        assert_eq!(errors.failures[0].phase, FailurePhase::Run);
        assert_eq!(errors.failures[1].phase, FailurePhase::Run);
        assert!(errors.failures[1].reason.contains("panicked on stop"));
        assert_eq!(errors.failures[2].phase, FailurePhase::Deinit);

        assert_eq!(log.calls("deinit"), vec!["dirty", "panics", "errs", "ok"]);
        assert_eq!(registry.get("ok").unwrap().state(), WorkerState::Stopped);
        assert_eq!(registry.get("errs").unwrap().state(), WorkerState::Failed);
        assert_eq!(registry.get("panics").unwrap().state(), WorkerState::Failed);
        assert_eq!(registry.get("dirty").unwrap().state(), WorkerState::Failed);
    }

    #[test]
    fn test_join_timeout_detaches_worker() {
        let log = EventLog::new();
        let registry = registry(vec![
            MockPlugin::new("fast", &log),
            MockPlugin::new("stubborn", &log)
                .with_behavior(RunBehavior::IgnoreStopFor(Duration::from_millis(500))),
        ]);
        let mut supervisor = ThreadSupervisor::new(WorkerConfig {
            join_timeout: Some(Duration::from_millis(50)),
            ..Default::default()
        });

        supervisor.start_all(registry.all()).unwrap();
        let errors = supervisor.stop_all().unwrap_err();

        assert_eq!(errors.failures.len(), 1);
        assert_eq!(errors.failures[0].plugin, "stubborn");
        assert_eq!(errors.failures[0].phase, FailurePhase::Join);
        assert_eq!(log.calls("deinit"), vec!["fast"]);
        assert_eq!(registry.get("stubborn").unwrap().state(), WorkerState::Failed);
    }

    #[test]
    fn test_worker_thread_names() {
        #[derive(Debug)]
        struct NameProbe(parking_lot::Mutex<Option<String>>);

        impl nova_agent_plugin_api::Plugin for NameProbe {
            fn name(&self) -> &str {
                "probe"
            }

            fn run(&self, stop: &StopSignal) -> std::result::Result<(), PluginError> {
                *self.0.lock() = thread::current().name().map(str::to_string);
                stop.wait();
                Ok(())
            }
        }

        let probe = Arc::new(NameProbe(parking_lot::Mutex::new(None)));
        let mut registry = PluginRegistry::new();
        registry.register(probe.clone()).unwrap();

        let mut supervisor = ThreadSupervisor::new(WorkerConfig {
            thread_name_prefix: "edge".to_string(),
            stack_size: Some(256 * 1024),
            join_timeout: None,
        });
        supervisor.start_all(registry.all()).unwrap();
        supervisor.stop_all().unwrap();

        assert_eq!(probe.0.lock().as_deref(), Some("edge-probe"));
    }
}
