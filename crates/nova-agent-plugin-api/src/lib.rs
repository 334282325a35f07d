//! # Nova Agent Plugin API
//!
//! This crate provides the SDK for writing plugins hosted by the Nova agent
//! runtime.
//!
//! A plugin is any type implementing [`Plugin`]. The runtime calls its hooks
//! in a fixed order:
//!
//! 1. [`Plugin::init`] on the control thread, in registration order
//! 2. [`Plugin::run`] on a dedicated worker thread, until the [`StopSignal`] fires
//! 3. [`Plugin::request_stop`] on the control thread, right after the signal is set
//! 4. [`Plugin::deinit`] on the control thread, in reverse registration order
//!
//! ## Example
//!
//! ```rust,no_run
//! use nova_agent_plugin_api::*;
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! struct Ticker;
//!
//! impl Plugin for Ticker {
//!     fn name(&self) -> &str { "ticker" }
//!
//!     fn run(&self, stop: &StopSignal) -> Result<(), PluginError> {
//!         while !stop.wait_timeout(Duration::from_secs(1)) {
//!             // periodic work
//!         }
//!         Ok(())
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod plugin;
pub mod stop;

#[cfg(feature = "testing")]
pub mod testing;

pub use error::{PluginError, Result};
pub use plugin::{Plugin, PluginDependency, PluginMetadata, WorkerState};
pub use stop::StopSignal;

/// Plugin API version
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{PluginError, Result};
    pub use crate::plugin::{Plugin, PluginDependency, PluginMetadata, WorkerState};
    pub use crate::stop::StopSignal;
}
