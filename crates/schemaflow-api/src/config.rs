//! Application configuration.
//!
//! Loaded from an optional TOML file; every key has a default, so an empty
//! file (or none at all) runs against a local Kafka and registry.
//!
//! ```toml
//! topic = "user_events"
//! bootstrap_servers = "localhost:9092"
//! registry_url = "http://localhost:8081"
//! schema_file = "./schema/user_event.avsc"
//! consumer_group = "consumer_group"
//! listen_addr = "0.0.0.0:8000"
//! poll_timeout_ms = 1000
//! transport = "kafka"
//! ```

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which log the pipelines run over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// In-process log; producer and consumer must share the process
    Memory,
    /// Kafka via librdkafka (requires the `kafka` feature)
    Kafka,
}

impl TransportKind {
    /// Where events end up, as told to API callers.
    pub fn log_name(&self) -> &'static str {
        match self {
            TransportKind::Memory => "the in-memory log",
            TransportKind::Kafka => "Kafka",
        }
    }
}

impl std::str::FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(TransportKind::Memory),
            "kafka" => Ok(TransportKind::Kafka),
            other => Err(ConfigError::Invalid(format!(
                "unknown transport '{}', expected 'memory' or 'kafka'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub topic: String,
    pub bootstrap_servers: String,
    pub registry_url: String,
    pub schema_file: PathBuf,
    pub consumer_group: String,
    pub client_id: String,
    pub listen_addr: String,
    pub poll_timeout_ms: u64,
    /// How long shutdown waits for queued messages
    pub flush_timeout_ms: u64,
    pub transport: TransportKind,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            topic: "user_events".to_string(),
            bootstrap_servers: "localhost:9092".to_string(),
            registry_url: "http://localhost:8081".to_string(),
            schema_file: PathBuf::from("./schema/user_event.avsc"),
            consumer_group: "consumer_group".to_string(),
            client_id: "user_event_producer".to_string(),
            listen_addr: "0.0.0.0:8000".to_string(),
            poll_timeout_ms: 1000,
            flush_timeout_ms: 10_000,
            transport: if cfg!(feature = "kafka") {
                TransportKind::Kafka
            } else {
                TransportKind::Memory
            },
        }
    }
}

impl AppConfig {
    /// Defaults when `path` is `None`, otherwise the file's values over them.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            None => Self::default(),
            Some(path) => {
                let contents =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                        path: path.to_path_buf(),
                        source,
                    })?;
                toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topic.trim().is_empty() {
            return Err(ConfigError::Invalid("topic must not be empty".to_string()));
        }
        if self.consumer_group.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "consumer_group must not be empty".to_string(),
            ));
        }
        if self.poll_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_timeout_ms must be greater than zero".to_string(),
            ));
        }
        self.listen_addr()?;
        if self.transport == TransportKind::Kafka && !cfg!(feature = "kafka") {
            return Err(ConfigError::Invalid(
                "transport 'kafka' needs a build with the `kafka` feature".to_string(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr.parse().map_err(|_| {
            ConfigError::Invalid(format!("invalid listen_addr '{}'", self.listen_addr))
        })
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.topic, "user_events");
        assert_eq!(config.bootstrap_servers, "localhost:9092");
        assert_eq!(config.registry_url, "http://localhost:8081");
        assert_eq!(config.schema_file, PathBuf::from("./schema/user_event.avsc"));
        assert_eq!(config.consumer_group, "consumer_group");
        assert_eq!(config.listen_addr().unwrap().port(), 8000);
        assert_eq!(config.poll_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schemaflow.toml");
        std::fs::write(
            &path,
            r#"
                topic = "clicks"
                transport = "memory"
                poll_timeout_ms = 250
            "#,
        )
        .unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.topic, "clicks");
        assert_eq!(config.transport, TransportKind::Memory);
        assert_eq!(config.poll_timeout(), Duration::from_millis(250));
        assert_eq!(config.consumer_group, "consumer_group");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schemaflow.toml");

        std::fs::write(&path, "listen_addr = \"not-an-address\"\ntransport = \"memory\"").unwrap();
        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(ConfigError::Invalid(_))
        ));

        std::fs::write(&path, "poll_timeout_ms = \"soon\"").unwrap();
        assert!(matches!(
            AppConfig::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));

        assert!(matches!(
            AppConfig::load(Some(&dir.path().join("missing.toml"))),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_transport_kind_from_str() {
        assert_eq!("Kafka".parse::<TransportKind>().unwrap(), TransportKind::Kafka);
        assert_eq!("memory".parse::<TransportKind>().unwrap(), TransportKind::Memory);
        assert!("zeromq".parse::<TransportKind>().is_err());
    }
}
