//! Configuration loading

use crate::{AgentConfig, ConfigError, ConfigFormat, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::Path;

/// Load configuration from a file
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<AgentConfig> {
    let path = path.as_ref();

    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path)?;

    load_from_str(&content, format)
}

/// Expand environment variables in configuration string
/// Supports syntax: ${VAR} and ${VAR:-default}
fn expand_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(:-([^}]*))?\}")
        .map_err(|e| ConfigError::invalid(format!("Invalid regex: {e}")))?;

    let mut result = String::with_capacity(content.len());
    let mut last_match = 0;

    for cap in re.captures_iter(content) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let var_name = var_name.as_str();
        let default_value = cap.get(3).map(|m| m.as_str());

        let value = match (env::var(var_name), default_value) {
            (Ok(val), _) => val,
            (Err(_), Some(default)) => default.to_string(),
            (Err(_), None) => return Err(ConfigError::MissingEnvVar(var_name.to_string())),
        };

        result.push_str(&content[last_match..full_match.start()]);
        result.push_str(&value);
        last_match = full_match.end();
    }

    result.push_str(&content[last_match..]);

    Ok(result)
}

/// Load configuration from a string
pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<AgentConfig> {
    let expanded = expand_env_vars(content)?;

    let config = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(&expanded).map_err(|e| ConfigError::Parse {
            format: "YAML",
            message: e.to_string(),
        })?,
        ConfigFormat::Toml => toml::from_str(&expanded).map_err(|e| ConfigError::Parse {
            format: "TOML",
            message: e.to_string(),
        })?,
        ConfigFormat::Json => serde_json::from_str(&expanded).map_err(|e| ConfigError::Parse {
            format: "JSON",
            message: e.to_string(),
        })?,
    };

    Ok(config)
}

/// Load and validate configuration from a file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AgentConfig> {
    let path = path.as_ref();
    let config = load_from_file(path)?;

    crate::validator::validate_config(&config)?;

    tracing::debug!(
        path = %path.display(),
        plugins = config.plugins.len(),
        "Configuration loaded"
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogFormat;
    use std::io::Write;
    use std::time::Duration;

    const YAML_CONFIG: &str = r#"
agent:
  name: "edge-agent"

workers:
  thread_name_prefix: "edge"
  stack_size: 262144
  join_timeout: "5s"

logging:
  level: "debug"
  format: "json"

plugins:
  - name: "heartbeat"
    settings:
      interval: "2s"
  - name: "disabled-one"
    enabled: false
"#;

    #[test]
    fn test_load_yaml() {
        let config = load_from_str(YAML_CONFIG, ConfigFormat::Yaml).unwrap();

        assert_eq!(config.agent.name, "edge-agent");
        assert_eq!(config.workers.thread_name_prefix, "edge");
        assert_eq!(config.workers.stack_size, Some(262144));
        assert_eq!(config.workers.join_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.plugins.len(), 2);
        assert!(config.plugins[0].enabled);
        assert!(!config.plugins[1].enabled);
        assert_eq!(config.plugins[0].settings["interval"], "2s");
    }

    #[test]
    fn test_load_toml() {
        let content = r#"
[agent]
name = "toml-agent"

[[plugins]]
name = "heartbeat"
"#;
        let config = load_from_str(content, ConfigFormat::Toml).unwrap();
        assert_eq!(config.agent.name, "toml-agent");
        assert_eq!(config.plugins.len(), 1);
        assert_eq!(config.workers.join_timeout, None);
    }

    #[test]
    fn test_load_json_defaults() {
        let config = load_from_str("{}", ConfigFormat::Json).unwrap();
        assert_eq!(config, AgentConfig::default());
    }

    #[test]
    fn test_invalid_yaml() {
        let result = load_from_str("plugins: [yaml", ConfigFormat::Yaml);
        assert!(matches!(result, Err(ConfigError::Parse { format: "YAML", .. })));
    }

    #[test]
    fn test_env_var_substitution() {
        env::set_var("NOVA_TEST_AGENT_NAME", "from-env");

        let content = r#"
agent:
  name: "${NOVA_TEST_AGENT_NAME}"
logging:
  level: "${NOVA_TEST_UNSET_LEVEL:-warn}"
"#;
        let config = load_from_str(content, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.agent.name, "from-env");
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_env_var_missing_without_default() {
        let content = r#"agent: { name: "${NOVA_TEST_DEFINITELY_UNSET}" }"#;
        let result = load_from_str(content, ConfigFormat::Yaml);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(name)) if name == "NOVA_TEST_DEFINITELY_UNSET"));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(YAML_CONFIG.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.agent.name, "edge-agent");
    }

    #[test]
    fn test_load_config_rejects_invalid() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(b"plugins:\n  - name: a\n  - name: a\n").unwrap();

        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_from_file("/nonexistent/agent.yaml");
        assert!(matches!(result, Err(ConfigError::Read(_))));
    }
}
