//! Configuration validation

use crate::{AgentConfig, ConfigError, Result};
use std::collections::HashSet;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate configuration
pub fn validate_config(config: &AgentConfig) -> Result<()> {
    validate_agent(config)?;
    validate_workers(config)?;
    validate_logging(config)?;
    validate_plugins(config)?;

    Ok(())
}

fn validate_agent(config: &AgentConfig) -> Result<()> {
    if config.agent.name.trim().is_empty() {
        return Err(ConfigError::invalid("agent name cannot be empty"));
    }
    Ok(())
}

fn validate_workers(config: &AgentConfig) -> Result<()> {
    let workers = &config.workers;

    if workers.thread_name_prefix.is_empty() {
        return Err(ConfigError::invalid("thread_name_prefix cannot be empty"));
    }

    if workers.stack_size == Some(0) {
        return Err(ConfigError::invalid("stack_size must be > 0"));
    }

    if let Some(timeout) = workers.join_timeout {
        if timeout.is_zero() {
            return Err(ConfigError::invalid("join_timeout must be > 0"));
        }
        if timeout.as_secs() > 300 {
            tracing::warn!("join_timeout is very high (>5 minutes)");
        }
    }

    Ok(())
}

fn validate_logging(config: &AgentConfig) -> Result<()> {
    validate_log_level(&config.logging.level)
}

/// Check that `level` names a log level, ignoring case
pub fn validate_log_level(level: &str) -> Result<()> {
    if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        return Err(ConfigError::invalid(format!(
            "Invalid log level: {} (must be one of {})",
            level,
            LOG_LEVELS.join(", ")
        )));
    }
    Ok(())
}

fn validate_plugins(config: &AgentConfig) -> Result<()> {
    let mut seen = HashSet::new();

    for plugin in &config.plugins {
        if plugin.name.trim().is_empty() {
            return Err(ConfigError::invalid("plugin name cannot be empty"));
        }

        if !seen.insert(plugin.name.as_str()) {
            return Err(ConfigError::invalid(format!(
                "duplicate plugin name: {}",
                plugin.name
            )));
        }

        if !plugin.enabled {
            tracing::debug!(plugin = %plugin.name, "Plugin disabled in configuration");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PluginConfig;
    use std::time::Duration;

    fn plugin(name: &str) -> PluginConfig {
        PluginConfig {
            name: name.to_string(),
            enabled: true,
            settings: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AgentConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_agent_name() {
        let mut config = AgentConfig::default();
        config.agent.name = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_stack_size() {
        let mut config = AgentConfig::default();
        config.workers.stack_size = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_join_timeout() {
        let mut config = AgentConfig::default();
        config.workers.join_timeout = Some(Duration::ZERO);
        assert!(validate_config(&config).is_err());

        config.workers.join_timeout = Some(Duration::from_secs(10));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = AgentConfig::default();
        config.logging.level = "loud".to_string();
        assert!(validate_config(&config).is_err());

        config.logging.level = "WARN".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_duplicate_plugins() {
        let config = AgentConfig {
            plugins: vec![plugin("heartbeat"), plugin("heartbeat")],
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate plugin name"));
    }

    #[test]
    fn test_empty_plugin_name() {
        let config = AgentConfig {
            plugins: vec![plugin("")],
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
