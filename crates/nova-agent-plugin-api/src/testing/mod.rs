//! Testing utilities for plugin and runtime developers
//!
//! Enabled with the `testing` feature.

pub mod mocks;

pub use mocks::{EventLog, MockPlugin, RunBehavior};
