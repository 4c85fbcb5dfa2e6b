// ABOUTME: Connection model for one Docker daemon: target, TLS, and registry settings.
// ABOUTME: Serialized as camelCase JSON in the store and read from YAML for static configs.

use super::env_value::EnvValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Socket a local target uses when no path is given.
pub const DEFAULT_DOCKER_SOCKET: &str = if cfg!(windows) {
    "//./pipe/docker_engine"
} else {
    "/var/run/docker.sock"
};

fn default_socket_path() -> String {
    DEFAULT_DOCKER_SOCKET.to_string()
}

/// How to reach one daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConnectionConfig {
    pub target: Target,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistryConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Target {
    Local {
        #[serde(default = "default_socket_path")]
        path: String,
    },
    Remote {
        host: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TlsConfig {
    /// Directory holding `key.pem`, `cert.pem` and `ca.pem`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegistryConfig {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    pub username: String,
    pub password: EnvValue,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.redacted())
            .finish()
    }
}

impl ConnectionConfig {
    /// Local daemon on the platform default socket.
    pub fn local() -> Self {
        Self::new(Target::Local {
            path: default_socket_path(),
        })
    }

    pub fn remote(host: impl Into<String>) -> Self {
        Self::new(Target::Remote { host: host.into() })
    }

    pub fn new(target: Target) -> Self {
        Self {
            target,
            tls: None,
            registry: None,
        }
    }

    /// Build from a bare `DOCKER_HOST`-style string. Socket schemes become local targets.
    pub fn from_host(host: &str) -> Self {
        let host = host.trim();
        match host
            .strip_prefix("unix://")
            .or_else(|| host.strip_prefix("npipe://"))
        {
            Some(path) => Self::new(Target::Local {
                path: path.to_string(),
            }),
            None => Self::remote(host),
        }
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn with_registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Copy with registry secrets masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Some(credentials) = copy
            .registry
            .as_mut()
            .and_then(|registry| registry.credentials.as_mut())
        {
            credentials.password = credentials.password.redacted();
        }
        copy
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Local { path } => write!(f, "unix://{}", path),
            Target::Remote { host } => write!(f, "{}", host),
        }
    }
}
