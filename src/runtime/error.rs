// ABOUTME: Error types for daemon calls and daemon client construction.
// ABOUTME: Bollard errors are folded into these before they leave the runtime layer.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::MissingEnvVar;

/// Failure of a single daemon operation or stream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DaemonError {
    #[error("daemon unreachable: {0}")]
    Unreachable(String),

    #[error("daemon command failed: {message}")]
    CommandFailed {
        status: Option<u16>,
        message: String,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The consumer went away. Streams treat this as a normal end.
    #[error("stream cancelled")]
    Cancelled,
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonErrorKind {
    Unreachable,
    CommandFailed,
    InvalidRequest,
    Cancelled,
}

impl DaemonError {
    pub fn command(message: impl Into<String>) -> Self {
        DaemonError::CommandFailed {
            status: None,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> DaemonErrorKind {
        match self {
            DaemonError::Unreachable(_) => DaemonErrorKind::Unreachable,
            DaemonError::CommandFailed { .. } => DaemonErrorKind::CommandFailed,
            DaemonError::InvalidRequest(_) => DaemonErrorKind::InvalidRequest,
            DaemonError::Cancelled => DaemonErrorKind::Cancelled,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, DaemonError::Cancelled)
    }
}

/// Failure to build a client for a connection config.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid daemon host {host:?}: {reason}")]
    InvalidHost { host: String, reason: String },

    #[error("TLS requested but no certificate directory is configured")]
    NoCertPath,

    #[error("cannot read TLS material {path}: {source}")]
    TlsMaterial {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("registry credentials: {0}")]
    Credentials(#[from] MissingEnvVar),

    #[error("failed to create docker client for {host}: {source}")]
    Client {
        host: String,
        #[source]
        source: bollard::errors::Error,
    },
}
