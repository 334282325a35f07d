//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    /// Agent identity
    #[serde(default)]
    pub agent: AgentSettings,

    /// Worker thread settings
    #[serde(default)]
    pub workers: WorkerConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Plugins, in registration order
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,
}

impl AgentConfig {
    /// Plugins with `enabled: true`, in declaration order
    pub fn enabled_plugins(&self) -> impl Iterator<Item = &PluginConfig> {
        self.plugins.iter().filter(|p| p.enabled)
    }
}

/// Agent identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSettings {
    /// Agent name, used in log output
    #[serde(default = "default_agent_name")]
    pub name: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
        }
    }
}

fn default_agent_name() -> String {
    "nova-agent".to_string()
}

/// Worker thread configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerConfig {
    /// Thread name prefix; workers are named `<prefix>-<plugin>`
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,

    /// Thread stack size in bytes (platform default when unset)
    #[serde(default)]
    pub stack_size: Option<usize>,

    /// Maximum time to wait for each worker on stop (unbounded when unset)
    #[serde(default, with = "humantime_serde")]
    pub join_timeout: Option<Duration>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: default_thread_name_prefix(),
            stack_size: None,
            join_timeout: None,
        }
    }
}

fn default_thread_name_prefix() -> String {
    "nova-agent".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable text
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Plugin configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginConfig {
    /// Plugin name
    pub name: String,

    /// Whether the plugin is registered at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Plugin-specific settings, passed through untouched
    #[serde(default)]
    pub settings: serde_json::Value,
}

fn default_enabled() -> bool {
    true
}
