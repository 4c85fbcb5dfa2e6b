// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Accepts connections as a bare host string or as a full connection document.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::ConnectionConfig;
use crate::types::ConfigId;

pub fn deserialize_connections<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<ConfigId, ConnectionConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries: BTreeMap<String, ConnectionEntry> = BTreeMap::deserialize(deserializer)?;
    entries
        .into_iter()
        .map(|(id, entry)| {
            if id.trim().is_empty() {
                return Err(serde::de::Error::custom("connection id cannot be empty"));
            }
            Ok((ConfigId::new(id), entry.into_connection_config()))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConnectionEntry {
    Simple(String),
    Detailed(ConnectionConfig),
}

impl ConnectionEntry {
    fn into_connection_config(self) -> ConnectionConfig {
        match self {
            ConnectionEntry::Simple(host) => ConnectionConfig::from_host(&host),
            ConnectionEntry::Detailed(config) => config,
        }
    }
}
