//! # Nova Agent Runtime
//!
//! Lifecycle and thread supervision for agent plugins:
//! - Plugin registry (ordered, unique by name)
//! - Thread supervisor (one OS thread per plugin, cooperative stop)
//! - Lifecycle controller (`init` -> `run_threads` -> `stop_threads` -> `deinit`)
//!
//! ## Example
//!
//! ```rust,no_run
//! use nova_agent_runtime::prelude::*;
//!
//! #[derive(Debug)]
//! struct Idle;
//!
//! impl Plugin for Idle {
//!     fn name(&self) -> &str { "idle" }
//!
//!     fn run(&self, stop: &StopSignal) -> Result<(), PluginError> {
//!         stop.wait();
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), LifecycleError> {
//! let mut agent = Agent::new();
//! agent.register(Idle)?;
//! agent.init()?;
//! agent.run_threads()?;
//! agent.stop_threads()?;
//! agent.deinit()?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod supervisor;

pub use error::{FailurePhase, LifecycleError, PluginFailure, Result, ShutdownErrors};
pub use lifecycle::{Agent, LifecycleState, WorkerStats};
pub use nova_agent_config::WorkerConfig;
pub use registry::{PluginDescriptor, PluginRegistry};
pub use supervisor::{ThreadSupervisor, WorkerHandle};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{LifecycleError, ShutdownErrors};
    pub use crate::lifecycle::{Agent, LifecycleState};
    pub use nova_agent_config::WorkerConfig;
    pub use nova_agent_plugin_api::{Plugin, PluginError, StopSignal, WorkerState};
}
