// ABOUTME: Sources of daemon connection configs: static file entries and a writable store.
// ABOUTME: Defines the repository trait, config entities, and the merge policy across sources.

mod kv;
mod static_repo;
mod store;

pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use static_repo::StaticConfigRepository;
pub use store::StoreConfigRepository;

use crate::config::ConnectionConfig;
use crate::types::ConfigId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// A connection config together with its identity and mutability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntity {
    pub id: ConfigId,
    pub read_only: bool,
    pub config: ConnectionConfig,
}

impl ConfigEntity {
    pub fn new(id: ConfigId, config: ConnectionConfig) -> Self {
        Self {
            id,
            read_only: false,
            config,
        }
    }

    /// Copy safe to return to API clients.
    pub fn redacted(&self) -> Self {
        Self {
            id: self.id.clone(),
            read_only: self.read_only,
            config: self.config.redacted(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("configuration {0} is read-only")]
    ReadOnly(ConfigId),

    #[error("configuration store error: {0}")]
    Store(String),

    #[error("malformed configuration document {key}: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

#[async_trait]
pub trait ConfigRepository: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    async fn get_all(&self) -> Result<Vec<ConfigEntity>>;

    async fn find_by_id(&self, id: &ConfigId) -> Result<Option<ConfigEntity>>;

    async fn save(&self, entity: &ConfigEntity) -> Result<()>;

    async fn delete(&self, id: &ConfigId) -> Result<()>;
}

/// Merge listings in repository order. A later listing wins on duplicate ids.
pub fn merge_entities<I>(listings: I) -> BTreeMap<ConfigId, ConfigEntity>
where
    I: IntoIterator<Item = (String, Vec<ConfigEntity>)>,
{
    let mut merged = BTreeMap::new();
    for (repository, entities) in listings {
        for entity in entities {
            if let Some(previous) = merged.insert(entity.id.clone(), entity) {
                warn!(
                    config = %previous.id,
                    winner = %repository,
                    "duplicate daemon configuration, later repository wins"
                );
            }
        }
    }
    merged
}

/// Ordered repositories plus the one that accepts writes.
///
/// Order matters: on duplicate ids the repository added last wins.
#[derive(Clone, Default)]
pub struct RepositorySet {
    ordered: Vec<Arc<dyn ConfigRepository>>,
    writable: Option<Arc<dyn ConfigRepository>>,
}

impl RepositorySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the repository that receives saves.
    pub fn with_store(mut self, repository: Arc<dyn ConfigRepository>) -> Self {
        self.writable = Some(Arc::clone(&repository));
        self.ordered.push(repository);
        self
    }

    pub fn with_repository(mut self, repository: Arc<dyn ConfigRepository>) -> Self {
        self.ordered.push(repository);
        self
    }

    pub fn repositories(&self) -> &[Arc<dyn ConfigRepository>] {
        &self.ordered
    }

    pub fn has_store(&self) -> bool {
        self.writable.is_some()
    }

    /// All entities after applying the merge policy.
    pub async fn list(&self) -> Result<Vec<ConfigEntity>> {
        let mut listings = Vec::with_capacity(self.ordered.len());
        for repository in &self.ordered {
            listings.push((repository.name().to_string(), repository.get_all().await?));
        }
        Ok(merge_entities(listings).into_values().collect())
    }

    /// Persist `entity` in the writable store.
    ///
    /// Fails with `ReadOnly` when there is no store or a read-only repository
    /// already defines the id.
    pub async fn save(&self, entity: &ConfigEntity) -> Result<()> {
        let Some(store) = self.writable.as_ref() else {
            return Err(RepositoryError::ReadOnly(entity.id.clone()));
        };
        for repository in &self.ordered {
            let existing = repository.find_by_id(&entity.id).await?;
            if existing.is_some_and(|existing| existing.read_only) {
                return Err(RepositoryError::ReadOnly(entity.id.clone()));
            }
        }
        store.save(entity).await
    }

    /// Delete `id` from whichever repository holds it. `Ok(false)` if none does.
    pub async fn delete(&self, id: &ConfigId) -> Result<bool> {
        for repository in self.ordered.iter().rev() {
            if repository.find_by_id(id).await?.is_some() {
                repository.delete(id).await?;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl std::fmt::Debug for RepositorySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.ordered.iter().map(|r| r.name()).collect();
        f.debug_struct("RepositorySet")
            .field("repositories", &names)
            .field("writable", &self.writable.as_ref().map(|r| r.name()))
            .finish()
    }
}
