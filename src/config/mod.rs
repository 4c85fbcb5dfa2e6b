// ABOUTME: Configuration types and parsing for dockgate.yml.
// ABOUTME: Handles YAML parsing, file discovery, transport limits, and static connections.

mod connection;
mod deserialize;
mod env_value;

pub use connection::{
    ConnectionConfig, Credentials, DEFAULT_DOCKER_SOCKET, RegistryConfig, Target, TlsConfig,
};
pub use env_value::{EnvValue, MissingEnvVar};

use crate::error::{Error, Result};
use crate::types::ConfigId;
use deserialize::deserialize_connections;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "dockgate.yml";
pub const CONFIG_FILENAME_ALT: &str = "dockgate.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".dockgate/config.yml";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default)]
    pub limits: TransportLimits,

    /// Per-stream channel capacity between a daemon callback and its consumer.
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,

    #[serde(default)]
    pub store: Option<StoreConfig>,

    #[serde(default)]
    pub docker: DockerSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DockerSection {
    #[serde(default, deserialize_with = "deserialize_connections")]
    pub connections: BTreeMap<ConfigId, ConnectionConfig>,
}

/// Limits applied to every daemon client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransportLimits {
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    #[serde(default = "default_response_timeout", with = "humantime_serde")]
    pub response_timeout: Duration,
}

impl Default for TransportLimits {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            connect_timeout: default_connect_timeout(),
            response_timeout: default_response_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Directory for the file-backed key-value store.
    pub path: PathBuf,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_stream_buffer() -> usize {
    crate::runtime::DEFAULT_STREAM_CAPACITY
}

fn default_max_connections() -> usize {
    100
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_response_timeout() -> Duration {
    Duration::from_secs(45)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            limits: TransportLimits::default(),
            stream_buffer: default_stream_buffer(),
            store: None,
            docker: DockerSection::default(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigFileNotFound(dir.to_path_buf()))
    }

    fn validate(&self) -> Result<()> {
        if self.limits.max_connections == 0 {
            return Err(Error::InvalidConfig(
                "limits.maxConnections must be at least 1".to_string(),
            ));
        }
        if self.stream_buffer == 0 {
            return Err(Error::InvalidConfig(
                "streamBuffer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
