//! Server Configuration
//!
//! Loaded from an optional TOML file; command-line flags override individual
//! fields after loading.
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8888
//! event_capacity = 10
//!
//! [[things]]
//! kind = "lamp"
//! id = "lamp-1"
//! title = "Hallway Lamp"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use thing_runtime::DEFAULT_EVENT_CAPACITY;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// A thing to host at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThingConfig {
    /// Registered thing type, e.g. `lamp`
    pub kind: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ThingConfig {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            title: None,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Records kept per event name
    pub event_capacity: usize,
    /// Messages buffered per WebSocket subscriber before it is dropped
    pub subscriber_buffer: usize,
    /// How often simulated sensors change, e.g. `"5s"`
    pub sensor_interval: String,
    pub things: Vec<ThingConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8888,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            subscriber_buffer: 64,
            sensor_interval: "5s".to_string(),
            things: vec![
                ThingConfig::new("lamp", "lamp-1"),
                ThingConfig::new("humidity-sensor", "humidity-1"),
            ],
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::PathNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).await?;
        let config = Self::parse(&content)?;
        info!(
            "Loaded config from {} ({} things)",
            path.display(),
            config.things.len()
        );
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subscriber_buffer == 0 {
            return Err(ConfigError::Invalid("subscriber_buffer must be positive".into()));
        }
        self.sensor_interval()?;

        let mut seen = HashSet::new();
        for thing in &self.things {
            if thing.id.is_empty() || thing.id.contains('/') {
                return Err(ConfigError::Invalid(format!("invalid thing id: {:?}", thing.id)));
            }
            if !seen.insert(thing.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate thing id: {}", thing.id)));
            }
        }
        Ok(())
    }

    pub fn sensor_interval(&self) -> Result<Duration, ConfigError> {
        let interval = humantime::parse_duration(&self.sensor_interval).map_err(|e| {
            ConfigError::Invalid(format!("sensor_interval {:?}: {}", self.sensor_interval, e))
        })?;
        if interval.is_zero() {
            return Err(ConfigError::Invalid("sensor_interval must be positive".into()));
        }
        Ok(interval)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8888);
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);
        assert_eq!(config.sensor_interval().unwrap(), Duration::from_secs(5));
        assert_eq!(config.things.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = ServerConfig::parse(
            r#"
port = 9000
event_capacity = 3

[[things]]
kind = "lamp"
id = "porch"
title = "Porch Light"
"#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.event_capacity, 3);
        assert_eq!(config.things.len(), 1);
        assert_eq!(config.things[0].title.as_deref(), Some("Porch Light"));
    }

    #[test]
    fn test_invalid_configs() {
        assert!(matches!(
            ServerConfig::parse("port = \"abc\""),
            Err(ConfigError::TomlParseError(_))
        ));
        assert!(matches!(
            ServerConfig::parse("subscriber_buffer = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(ServerConfig::parse("sensor_interval = \"soon\"").is_err());

        let duplicate = r#"
[[things]]
kind = "lamp"
id = "a"

[[things]]
kind = "lamp"
id = "a"
"#;
        assert!(matches!(ServerConfig::parse(duplicate), Err(ConfigError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("webthing.toml");
        fs::write(&path, "host = \"127.0.0.1\"\nsensor_interval = \"250ms\"\n")
            .await
            .unwrap();

        let config = ServerConfig::load(&path).await.unwrap();
        assert_eq!(config.address(), "127.0.0.1:8888");
        assert_eq!(config.sensor_interval().unwrap(), Duration::from_millis(250));

        let missing = ServerConfig::load(dir.path().join("missing.toml")).await;
        assert!(matches!(missing, Err(ConfigError::PathNotFound(_))));
    }
}
