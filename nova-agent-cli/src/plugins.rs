//! Plugins compiled into the binary

use anyhow::{bail, Context, Result};
use nova_agent_config::PluginConfig;
use nova_agent_plugin_api::{Plugin, PluginError, StopSignal};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Names accepted in the `plugins` config section
pub(crate) const BUILTIN_PLUGINS: &[&str] = &["heartbeat"];

/// Build a plugin from its config entry
pub(crate) fn build(config: &PluginConfig) -> Result<Arc<dyn Plugin>> {
    match config.name.as_str() {
        "heartbeat" => {
            let settings: HeartbeatSettings = if config.settings.is_null() {
                HeartbeatSettings::default()
            } else {
                serde_json::from_value(config.settings.clone())
                    .with_context(|| format!("invalid settings for plugin '{}'", config.name))?
            };
            Ok(Arc::new(HeartbeatPlugin::new(settings)))
        }
        other => bail!(
            "unknown plugin '{other}' (available: {})",
            BUILTIN_PLUGINS.join(", ")
        ),
    }
}

#[derive(Debug, Clone, Deserialize)]
struct HeartbeatSettings {
    #[serde(default = "default_interval", with = "humantime_serde")]
    interval: Duration,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            interval: default_interval(),
        }
    }
}

fn default_interval() -> Duration {
    Duration::from_secs(30)
}

/// Logs a beat at a fixed interval until stopped
#[derive(Debug)]
struct HeartbeatPlugin {
    settings: HeartbeatSettings,
    beats: AtomicU64,
}

impl HeartbeatPlugin {
    fn new(settings: HeartbeatSettings) -> Self {
        Self {
            settings,
            beats: AtomicU64::new(0),
        }
    }
}

impl Plugin for HeartbeatPlugin {
    fn name(&self) -> &str {
        "heartbeat"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Periodic liveness log line"
    }

    fn init(&self) -> Result<(), PluginError> {
        if self.settings.interval.is_zero() {
            return Err(PluginError::config("heartbeat interval must be > 0"));
        }
        self.beats.store(0, Ordering::Relaxed);
        Ok(())
    }

    fn run(&self, stop: &StopSignal) -> Result<(), PluginError> {
        while !stop.wait_timeout(self.settings.interval) {
            let beat = self.beats.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::info!(plugin = "heartbeat", beat, "Heartbeat");
        }
        Ok(())
    }

    fn deinit(&self) -> Result<(), PluginError> {
        tracing::debug!(
            plugin = "heartbeat",
            beats = self.beats.load(Ordering::Relaxed),
            "Heartbeat finished"
        );
        Ok(())
    }
}
