// ABOUTME: Read-only repository over connections declared in the config file.

use super::{ConfigEntity, ConfigRepository, RepositoryError, Result};
use crate::config::ConnectionConfig;
use crate::types::ConfigId;
use async_trait::async_trait;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct StaticConfigRepository {
    connections: BTreeMap<ConfigId, ConnectionConfig>,
}

impl StaticConfigRepository {
    pub fn new(connections: BTreeMap<ConfigId, ConnectionConfig>) -> Self {
        Self { connections }
    }

    fn entity(id: &ConfigId, config: &ConnectionConfig) -> ConfigEntity {
        ConfigEntity {
            id: id.clone(),
            read_only: true,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl ConfigRepository for StaticConfigRepository {
    fn name(&self) -> &str {
        "static"
    }

    async fn get_all(&self) -> Result<Vec<ConfigEntity>> {
        Ok(self
            .connections
            .iter()
            .map(|(id, config)| Self::entity(id, config))
            .collect())
    }

    async fn find_by_id(&self, id: &ConfigId) -> Result<Option<ConfigEntity>> {
        Ok(self
            .connections
            .get(id)
            .map(|config| Self::entity(id, config)))
    }

    async fn save(&self, entity: &ConfigEntity) -> Result<()> {
        Err(RepositoryError::ReadOnly(entity.id.clone()))
    }

    async fn delete(&self, id: &ConfigId) -> Result<()> {
        Err(RepositoryError::ReadOnly(id.clone()))
    }
}
