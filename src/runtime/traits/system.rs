// ABOUTME: Daemon-level queries: liveness, system info, and version.
// ABOUTME: Ping failures always surface as unreachable.

use crate::runtime::error::DaemonError;
use async_trait::async_trait;
use bollard::models::{SystemInfo, SystemVersion};

#[async_trait]
pub trait SystemOps: Send + Sync {
    /// Liveness check bounded by the connect timeout.
    async fn ping(&self) -> Result<(), DaemonError>;

    async fn info(&self) -> Result<SystemInfo, DaemonError>;

    async fn version(&self) -> Result<SystemVersion, DaemonError>;
}
