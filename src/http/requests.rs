// ABOUTME: Request bodies and query strings accepted by the HTTP and WebSocket adapters.

use serde::{Deserialize, Serialize};

/// Image name plus optional tag; an empty tag means `latest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub name: String,
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogContainerRequest {
    pub id: String,
    #[serde(default = "default_follow")]
    pub follow: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail: Option<u64>,
}

fn default_follow() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: String,
}

#[derive(Debug, Deserialize)]
pub struct RepoQuery {
    pub repo: String,
}

#[derive(Debug, Deserialize)]
pub struct ListContainersQuery {
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Deserialize)]
pub struct RenameQuery {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveContainerQuery {
    pub id: String,
    #[serde(default)]
    pub force: bool,
}
