// ABOUTME: Container operations trait for a Docker daemon.
// ABOUTME: Lifecycle commands, inspection, and the wait, log, and stats streams.

use super::SourceResult;
use super::logs::LogOptions;
use crate::runtime::error::DaemonError;
use crate::types::{ContainerId, ImageRef};
use async_trait::async_trait;
use bollard::container::LogOutput;
use bollard::models::{
    ContainerCreateResponse, ContainerInspectResponse, ContainerStatsResponse, ContainerSummary,
    ContainerTopResponse, ContainerWaitResponse, FilesystemChange,
};

#[async_trait]
pub trait ContainerOps: Send + Sync {
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, DaemonError>;

    async fn create_container(
        &self,
        image: &ImageRef,
    ) -> Result<ContainerCreateResponse, DaemonError>;

    async fn start_container(&self, id: &ContainerId) -> Result<(), DaemonError>;

    async fn stop_container(&self, id: &ContainerId) -> Result<(), DaemonError>;

    async fn kill_container(&self, id: &ContainerId) -> Result<(), DaemonError>;

    async fn restart_container(&self, id: &ContainerId) -> Result<(), DaemonError>;

    async fn pause_container(&self, id: &ContainerId) -> Result<(), DaemonError>;

    async fn unpause_container(&self, id: &ContainerId) -> Result<(), DaemonError>;

    async fn rename_container(&self, id: &ContainerId, name: &str) -> Result<(), DaemonError>;

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), DaemonError>;

    async fn inspect_container(
        &self,
        id: &ContainerId,
    ) -> Result<ContainerInspectResponse, DaemonError>;

    async fn diff_container(&self, id: &ContainerId)
    -> Result<Vec<FilesystemChange>, DaemonError>;

    async fn top_container(&self, id: &ContainerId) -> Result<ContainerTopResponse, DaemonError>;

    fn wait_container(&self, id: &ContainerId) -> SourceResult<ContainerWaitResponse>;

    fn logs(&self, id: &ContainerId, opts: &LogOptions) -> SourceResult<LogOutput>;

    fn stats(&self, id: &ContainerId) -> SourceResult<ContainerStatsResponse>;
}
