// ABOUTME: Application-wide error types for dockgate.
// ABOUTME: Uses thiserror for ergonomic error handling.

use crate::registry::RegistryError;
use crate::repository::RepositoryError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration file not found in {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("{unreachable} of {total} daemons unreachable")]
    Unreachable { unreachable: usize, total: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
