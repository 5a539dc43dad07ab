use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server settings, read from an optional TOML file.
///
/// ```toml
/// bind = "0.0.0.0:5080"
/// log_filter = "deckscribe_server=debug"
/// heartbeat_interval_secs = 30
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub heartbeat_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5080)),
            log_filter: "info".to_string(),
            heartbeat_interval_secs: 15,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&contents)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = ServerConfig::from_toml_str("heartbeat_interval_secs = 30").unwrap();
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(30));
        assert_eq!(config.bind, ServerConfig::default().bind);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn documented_example_parses() {
        let config = ServerConfig::from_toml_str(
            "bind = \"0.0.0.0:5080\"\nlog_filter = \"deckscribe_server=debug\"\nheartbeat_interval_secs = 30\n",
        )
        .unwrap();
        assert_eq!(config.bind.port(), 5080);
        assert_eq!(config.log_filter, "deckscribe_server=debug");
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(ServerConfig::from_toml_str("").unwrap(), ServerConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ServerConfig::from_toml_str("channel = \"signalr\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_heartbeat_is_clamped() {
        let config = ServerConfig { heartbeat_interval_secs: 0, ..ServerConfig::default() };
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(1));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ServerConfig::load(Path::new("/nonexistent/deckscribe.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/deckscribe.toml"));
    }
}
