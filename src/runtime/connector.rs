// ABOUTME: Builds daemon clients from connection configs.
// ABOUTME: Resolves socket, plain TCP, and TLS endpoints and locates certificate material.

use crate::config::{ConnectionConfig, Credentials, RegistryConfig, Target, TlsConfig, TransportLimits};
use crate::runtime::bollard::BollardClient;
use crate::runtime::error::ConnectionError;
use crate::runtime::traits::DaemonClient;
use bollard::Docker;
use bollard::auth::DockerCredentials;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns a connection config into a ready client. No network I/O happens here.
pub trait ConnectionFactory: Send + Sync {
    fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn DaemonClient>, ConnectionError>;
}

/// Where a client connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonEndpoint {
    /// Unix socket or Windows named pipe path.
    Socket(String),
    /// `host:port` over TCP, optionally TLS.
    Tcp { authority: String, tls: bool },
}

const DEFAULT_PLAIN_PORT: u16 = 2375;
const DEFAULT_TLS_PORT: u16 = 2376;

fn invalid(host: &str, reason: impl Into<String>) -> ConnectionError {
    ConnectionError::InvalidHost {
        host: host.to_string(),
        reason: reason.into(),
    }
}

impl DaemonEndpoint {
    pub fn resolve(target: &Target) -> Result<Self, ConnectionError> {
        match target {
            Target::Local { path } if path.trim().is_empty() => {
                Err(invalid(path, "socket path cannot be empty"))
            }
            Target::Local { path } => Ok(DaemonEndpoint::Socket(path.trim().to_string())),
            Target::Remote { host } => Self::parse(host),
        }
    }

    /// Parse a `DOCKER_HOST`-style URI: `tcp://`, `http://`, `https://`, `unix://` or `npipe://`.
    pub fn parse(host: &str) -> Result<Self, ConnectionError> {
        let trimmed = host.trim();
        let (scheme, rest) = trimmed
            .split_once("://")
            .ok_or_else(|| invalid(host, "missing scheme"))?;
        if rest.is_empty() {
            return Err(invalid(host, "missing address"));
        }

        match scheme {
            "unix" | "npipe" => Ok(DaemonEndpoint::Socket(rest.to_string())),
            "tcp" | "http" => Ok(DaemonEndpoint::Tcp {
                authority: parse_authority(host, rest, DEFAULT_PLAIN_PORT)?,
                tls: false,
            }),
            "https" => Ok(DaemonEndpoint::Tcp {
                authority: parse_authority(host, rest, DEFAULT_TLS_PORT)?,
                tls: true,
            }),
            other => Err(invalid(host, format!("unsupported scheme {:?}", other))),
        }
    }

    /// TCP endpoints use TLS for `https://` hosts or when TLS settings are given.
    pub fn uses_tls(&self, config: &ConnectionConfig) -> bool {
        matches!(self, DaemonEndpoint::Tcp { tls, .. } if *tls || config.tls.is_some())
    }
}

/// Check a config the way a connector would, without building a client.
///
/// Catches a malformed host or missing TLS material before the config is
/// persisted, since either one fails the next registry build.
pub fn validate_connection(config: &ConnectionConfig) -> Result<(), ConnectionError> {
    let endpoint = DaemonEndpoint::resolve(&config.target)?;
    if endpoint.uses_tls(config) {
        TlsMaterial::locate(config.tls.as_ref())?;
    }
    Ok(())
}

fn parse_authority(host: &str, rest: &str, default_port: u16) -> Result<String, ConnectionError> {
    let authority = rest.trim_end_matches('/');
    if authority.is_empty() || authority.contains('/') {
        return Err(invalid(host, "expected host[:port]"));
    }

    // A bracketed IPv6 literal with no port ends in ']'.
    let has_port = !authority.ends_with(']') && authority.contains(':');
    if !has_port {
        return Ok(format!("{}:{}", authority, default_port));
    }

    let (name, port) = authority
        .rsplit_once(':')
        .ok_or_else(|| invalid(host, "expected host[:port]"))?;
    if name.is_empty() {
        return Err(invalid(host, "missing host name"));
    }
    port.parse::<u16>()
        .map_err(|_| invalid(host, format!("invalid port: {}", port)))?;
    Ok(authority.to_string())
}

/// Client key, certificate, and CA bundle for a TLS daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsMaterial {
    pub key: PathBuf,
    pub cert: PathBuf,
    pub ca: PathBuf,
}

impl TlsMaterial {
    /// Find the certificate directory: configured path, then `DOCKER_CERT_PATH`, then `~/.docker`.
    pub fn locate(tls: Option<&TlsConfig>) -> Result<Self, ConnectionError> {
        let dir = tls
            .and_then(|t| t.cert_path.clone())
            .or_else(|| std::env::var_os("DOCKER_CERT_PATH").map(PathBuf::from))
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".docker")))
            .ok_or(ConnectionError::NoCertPath)?;
        Self::in_dir(&dir)
    }

    pub fn in_dir(dir: &Path) -> Result<Self, ConnectionError> {
        let material = Self {
            key: dir.join("key.pem"),
            cert: dir.join("cert.pem"),
            ca: dir.join("ca.pem"),
        };
        for path in [&material.key, &material.cert, &material.ca] {
            std::fs::File::open(path).map_err(|source| ConnectionError::TlsMaterial {
                path: path.clone(),
                source,
            })?;
        }
        Ok(material)
    }
}

fn docker_credentials(registry: &RegistryConfig) -> Result<Option<DockerCredentials>, ConnectionError> {
    let Some(Credentials { username, password }) = registry.credentials.as_ref() else {
        return Ok(None);
    };
    Ok(Some(DockerCredentials {
        username: Some(username.clone()),
        password: Some(password.resolve()?),
        serveraddress: Some(registry.url.clone()),
        ..Default::default()
    }))
}

/// Connects with bollard, sharing one set of transport limits.
#[derive(Debug, Clone, Default)]
pub struct BollardConnector {
    limits: TransportLimits,
}

impl BollardConnector {
    pub fn new(limits: TransportLimits) -> Self {
        Self { limits }
    }

    fn docker(&self, config: &ConnectionConfig) -> Result<Docker, ConnectionError> {
        let timeout = self.limits.response_timeout.as_secs().max(1);
        let host = config.target.to_string();
        let client_error = |source| ConnectionError::Client {
            host: host.clone(),
            source,
        };

        match DaemonEndpoint::resolve(&config.target)? {
            DaemonEndpoint::Socket(path) => {
                if config.tls.is_some() {
                    warn!(host = %host, "TLS settings ignored for a socket connection");
                }
                Docker::connect_with_socket(&path, timeout, bollard::API_DEFAULT_VERSION)
                    .map_err(client_error)
            }
            DaemonEndpoint::Tcp { authority, tls } if tls || config.tls.is_some() => {
                let material = TlsMaterial::locate(config.tls.as_ref())?;
                debug!(host = %host, certs = %material.ca.display(), "using TLS");
                Docker::connect_with_ssl(
                    &format!("https://{}", authority),
                    &material.key,
                    &material.cert,
                    &material.ca,
                    timeout,
                    bollard::API_DEFAULT_VERSION,
                )
                .map_err(client_error)
            }
            DaemonEndpoint::Tcp { authority, .. } => Docker::connect_with_http(
                &format!("http://{}", authority),
                timeout,
                bollard::API_DEFAULT_VERSION,
            )
            .map_err(client_error),
        }
    }
}

impl ConnectionFactory for BollardConnector {
    fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn DaemonClient>, ConnectionError> {
        let docker = self.docker(config)?;
        let credentials = match config.registry.as_ref() {
            Some(registry) => docker_credentials(registry)?,
            None => None,
        };

        info!(
            host = %config.target,
            max_connections = self.limits.max_connections,
            registry_auth = credentials.is_some(),
            "created daemon client"
        );
        Ok(Arc::new(
            BollardClient::new(docker, &self.limits).with_credentials(credentials),
        ))
    }
}
