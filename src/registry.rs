// ABOUTME: Startup registry mapping each config id to its daemon API.
// ABOUTME: Built once from all repositories; fails fast on any enumeration or client error.

use crate::api::DockerApi;
use crate::repository::{ConfigRepository, RepositoryError, merge_entities};
use crate::runtime::{ConnectionError, ConnectionFactory};
use crate::types::ConfigId;
use futures::future::join_all;
use snafu::{ResultExt, Snafu};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Failure while building the registry.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RegistryError {
    #[snafu(display("failed to list configurations from {repository} repository: {source}"))]
    Enumerate {
        repository: String,
        source: RepositoryError,
    },

    #[snafu(display("failed to create client for {id}: {source}"))]
    Connect {
        id: ConfigId,
        source: ConnectionError,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryErrorKind {
    Enumerate,
    Connect,
}

impl RegistryError {
    pub fn kind(&self) -> RegistryErrorKind {
        match self {
            RegistryError::Enumerate { .. } => RegistryErrorKind::Enumerate,
            RegistryError::Connect { .. } => RegistryErrorKind::Connect,
        }
    }
}

/// No daemon is registered under the requested id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Api service for {0} is not found")]
pub struct ConfigNotFound(pub ConfigId);

/// Immutable map of config id to daemon API.
#[derive(Debug, Default)]
pub struct DaemonRegistry {
    apis: BTreeMap<ConfigId, Arc<DockerApi>>,
}

impl DaemonRegistry {
    /// Enumerate every repository, merge (later repositories win), and build one client per id.
    pub async fn build(
        repositories: &[Arc<dyn ConfigRepository>],
        factory: &dyn ConnectionFactory,
        stream_capacity: usize,
    ) -> Result<Self, RegistryError> {
        let listings = join_all(repositories.iter().map(|repository| async move {
            repository
                .get_all()
                .await
                .map(|entities| (repository.name().to_string(), entities))
                .context(EnumerateSnafu {
                    repository: repository.name(),
                })
        }))
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

        let mut apis = BTreeMap::new();
        for (id, entity) in merge_entities(listings) {
            let client = factory
                .connect(&entity.config)
                .context(ConnectSnafu { id: id.clone() })?;
            info!(
                config = %id,
                target = %entity.config.target,
                read_only = entity.read_only,
                "registered daemon"
            );
            let api = DockerApi::new(id.clone(), client).with_stream_capacity(stream_capacity);
            apis.insert(id, Arc::new(api));
        }

        info!(count = apis.len(), "daemon registry ready");
        Ok(Self { apis })
    }

    pub fn from_apis(apis: impl IntoIterator<Item = DockerApi>) -> Self {
        Self {
            apis: apis
                .into_iter()
                .map(|api| (api.id().clone(), Arc::new(api)))
                .collect(),
        }
    }

    pub fn get(&self, id: &ConfigId) -> Result<Arc<DockerApi>, ConfigNotFound> {
        self.apis
            .get(id)
            .cloned()
            .ok_or_else(|| ConfigNotFound(id.clone()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &ConfigId> {
        self.apis.keys()
    }

    pub fn len(&self) -> usize {
        self.apis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apis.is_empty()
    }

    /// Ping every daemon concurrently, in id order.
    pub async fn ping_all(&self) -> Vec<(ConfigId, bool)> {
        join_all(self.apis.iter().map(|(id, api)| async move {
            (id.clone(), api.ping().await)
        }))
        .await
    }
}
