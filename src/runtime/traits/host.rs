// ABOUTME: Host-wide observation: the daemon event feed and swarm state.

use super::SourceResult;
use crate::runtime::error::DaemonError;
use async_trait::async_trait;
use bollard::models::{EventMessage, Swarm};

#[async_trait]
pub trait HostOps: Send + Sync {
    /// Unbounded feed of daemon events.
    fn events(&self) -> SourceResult<EventMessage>;

    async fn inspect_swarm(&self) -> Result<Swarm, DaemonError>;
}
