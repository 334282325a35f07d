//! Mock implementations for testing

use crate::plugin::{Plugin, PluginDependency};
use crate::stop::StopSignal;
use crate::PluginError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared, ordered record of hook calls
///
/// Entries look like `"init:alpha"`, `"run:alpha"`, `"request_stop:alpha"`,
/// `"exit:alpha"` and `"deinit:alpha"`.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn record(&self, hook: &str, plugin: &str) {
        self.events.lock().push(format!("{hook}:{plugin}"));
    }

    /// Snapshot of every event so far
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Plugin names for one hook, in call order
    pub fn calls(&self, hook: &str) -> Vec<String> {
        let prefix = format!("{hook}:");
        self.events
            .lock()
            .iter()
            .filter_map(|e| e.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    /// Drop all recorded events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// How a [`MockPlugin`] behaves inside `run`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunBehavior {
    /// Wait for the stop signal, then return `Ok`
    UntilStopped,
    /// Wait for the stop signal, then return an error
    FailOnStop,
    /// Wait for the stop signal, then panic
    PanicOnStop,
    /// Ignore the stop signal and exit only once `request_stop` is called
    UntilRequestStop,
    /// Ignore the stop signal for the given duration, then return `Ok`
    IgnoreStopFor(Duration),
    /// Return `Ok` immediately
    ExitImmediately,
}

/// Mock plugin for testing
#[derive(Debug, Clone)]
pub struct MockPlugin {
    name: String,
    version: String,
    dependencies: Vec<PluginDependency>,
    log: EventLog,
    fail_init: bool,
    fail_deinit: bool,
    behavior: RunBehavior,
    woken: Arc<AtomicBool>,
}

impl MockPlugin {
    /// Create a new mock plugin that stops cleanly
    pub fn new(name: impl Into<String>, log: &EventLog) -> Self {
        Self {
            name: name.into(),
            version: "1.0.0".to_string(),
            dependencies: Vec::new(),
            log: log.clone(),
            fail_init: false,
            fail_deinit: false,
            behavior: RunBehavior::UntilStopped,
            woken: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Report a different version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Declare a dependency
    pub fn with_dependency(mut self, dependency: PluginDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Make `init` fail
    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Make `deinit` fail
    pub fn failing_deinit(mut self) -> Self {
        self.fail_deinit = true;
        self
    }

    /// Choose the run loop behavior
    pub fn with_behavior(mut self, behavior: RunBehavior) -> Self {
        self.behavior = behavior;
        self
    }
}

impl Plugin for MockPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn dependencies(&self) -> Vec<PluginDependency> {
        self.dependencies.clone()
    }

    fn init(&self) -> Result<(), PluginError> {
        self.log.record("init", &self.name);
        if self.fail_init {
            return Err(PluginError::init(format!("{} refused to start", self.name)));
        }
        Ok(())
    }

    fn run(&self, stop: &StopSignal) -> Result<(), PluginError> {
        self.log.record("run", &self.name);
        let result = match self.behavior {
            RunBehavior::UntilStopped => {
                stop.wait();
                Ok(())
            }
            RunBehavior::FailOnStop => {
                stop.wait();
                Err(PluginError::runtime(format!("{} lost its connection", self.name)))
            }
            RunBehavior::PanicOnStop => {
                stop.wait();
                panic!("{} panicked on stop", self.name);
            }
            RunBehavior::UntilRequestStop => {
                while !self.woken.load(Ordering::SeqCst) {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Ok(())
            }
            RunBehavior::IgnoreStopFor(duration) => {
                std::thread::sleep(duration);
                Ok(())
            }
            RunBehavior::ExitImmediately => Ok(()),
        };
        self.log.record("exit", &self.name);
        result
    }

    fn request_stop(&self) {
        self.log.record("request_stop", &self.name);
        self.woken.store(true, Ordering::SeqCst);
    }

    fn deinit(&self) -> Result<(), PluginError> {
        self.log.record("deinit", &self.name);
        if self.fail_deinit {
            return Err(PluginError::deinit(format!("{} could not flush", self.name)));
        }
        Ok(())
    }
}
