// ABOUTME: Writable repository persisting connection configs in a key-value store.
// ABOUTME: Keys are the config id bytes; values are the JSON connection document.

use super::kv::KeyValueStore;
use super::{ConfigEntity, ConfigRepository, RepositoryError, Result};
use crate::config::ConnectionConfig;
use crate::types::ConfigId;
use async_trait::async_trait;
use tracing::debug;

/// Every read goes to the store; nothing is cached.
#[derive(Debug, Clone)]
pub struct StoreConfigRepository<S> {
    store: S,
}

impl<S: KeyValueStore> StoreConfigRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn decode(key: &[u8], value: &[u8]) -> Result<ConfigEntity> {
        let id = String::from_utf8_lossy(key).into_owned();
        let config: ConnectionConfig =
            serde_json::from_slice(value).map_err(|source| RepositoryError::Malformed {
                key: id.clone(),
                source,
            })?;
        Ok(ConfigEntity::new(ConfigId::new(id), config))
    }
}

#[async_trait]
impl<S: KeyValueStore> ConfigRepository for StoreConfigRepository<S> {
    fn name(&self) -> &str {
        "store"
    }

    async fn get_all(&self) -> Result<Vec<ConfigEntity>> {
        let entries = self.store.list(b"").await?;
        debug!(count = entries.len(), "listed stored configurations");
        entries
            .iter()
            .map(|(key, value)| Self::decode(key, value))
            .collect()
    }

    async fn find_by_id(&self, id: &ConfigId) -> Result<Option<ConfigEntity>> {
        match self.store.get(id.as_bytes()).await? {
            Some(value) => Self::decode(id.as_bytes(), &value).map(Some),
            None => Ok(None),
        }
    }

    async fn save(&self, entity: &ConfigEntity) -> Result<()> {
        if entity.read_only {
            return Err(RepositoryError::ReadOnly(entity.id.clone()));
        }
        let value = serde_json::to_vec(&entity.config).map_err(|source| {
            RepositoryError::Malformed {
                key: entity.id.to_string(),
                source,
            }
        })?;
        self.store.put(entity.id.as_bytes(), &value).await?;
        debug!(config = %entity.id, "saved configuration");
        Ok(())
    }

    async fn delete(&self, id: &ConfigId) -> Result<()> {
        self.store.delete(id.as_bytes()).await?;
        debug!(config = %id, "deleted configuration");
        Ok(())
    }
}
