// ABOUTME: Per-daemon operation facade used by every transport.
// ABOUTME: Validates requests, logs failures, and wraps daemon streams in the stream adapter.

mod records;

pub use records::{
    HostEvent, LoadProgress, LogRecord, LogStreamType, PullProgress, PushProgress, StatEvent,
    StreamItem, WaitResult,
};

use crate::runtime::{DaemonClient, DaemonError, DaemonStream, ItemStream, LogOptions, SourceResult};
use crate::types::{ConfigId, ContainerId, ImageId, ImageRef};
use bollard::models::{
    ContainerCreateResponse, ContainerInspectResponse, ContainerSummary,
    ContainerTopResponse, CreateImageInfo, FilesystemChange, ImageInspect,
    ImageSearchResponseItem, ImageSummary, Swarm, SystemInfo, SystemVersion,
};
use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Operations against one configured daemon.
///
/// Commands that only succeed or fail return `bool` and log the reason on
/// failure. Queries and streams return the daemon error to the caller.
pub struct DockerApi {
    id: ConfigId,
    client: Arc<dyn DaemonClient>,
    stream_capacity: usize,
}

fn invalid_image(name: &str, tag: &str, err: impl std::fmt::Display) -> DaemonError {
    DaemonError::InvalidRequest(format!("invalid image {:?} (tag {:?}): {}", name, tag, err))
}

impl DockerApi {
    pub fn new(id: ConfigId, client: Arc<dyn DaemonClient>) -> Self {
        Self {
            id,
            client,
            stream_capacity: crate::runtime::DEFAULT_STREAM_CAPACITY,
        }
    }

    pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity.max(1);
        self
    }

    pub fn id(&self) -> &ConfigId {
        &self.id
    }

    fn succeeded(&self, operation: &str, result: Result<(), DaemonError>) -> bool {
        match result {
            Ok(()) => {
                debug!(config = %self.id, operation, "daemon command succeeded");
                true
            }
            Err(err) => {
                error!(config = %self.id, operation, error = %err, "daemon command failed");
                false
            }
        }
    }

    fn logged<T>(&self, operation: &str, result: Result<T, DaemonError>) -> Result<T, DaemonError> {
        result.inspect_err(|err| {
            error!(config = %self.id, operation, error = %err, "daemon call failed")
        })
    }

    fn stream<T>(&self, operation: &str, source: SourceResult<T>) -> Result<ItemStream<T>, DaemonError>
    where
        T: Send + 'static,
    {
        let source = self.logged(operation, source)?;
        let label = format!("{}/{}", self.id, operation);
        Ok(DaemonStream::new(label, source)
            .with_capacity(self.stream_capacity)
            .boxed())
    }

    // ---------------------------------------------------------------------
    // System
    // ---------------------------------------------------------------------

    /// Reachability check. Never fails; an unreachable daemon is `false`.
    pub async fn ping(&self) -> bool {
        self.succeeded("ping", self.client.ping().await)
    }

    pub async fn info(&self) -> Result<SystemInfo, DaemonError> {
        self.logged("info", self.client.info().await)
    }

    pub async fn version(&self) -> Result<SystemVersion, DaemonError> {
        self.logged("version", self.client.version().await)
    }

    // ---------------------------------------------------------------------
    // Images
    // ---------------------------------------------------------------------

    pub async fn list_images(&self) -> Result<Vec<ImageSummary>, DaemonError> {
        self.logged("list_images", self.client.list_images().await)
    }

    pub async fn inspect_image(&self, id: &ImageId) -> Result<ImageInspect, DaemonError> {
        self.logged("inspect_image", self.client.inspect_image(id).await)
    }

    pub async fn search_images(
        &self,
        term: &str,
    ) -> Result<Vec<ImageSearchResponseItem>, DaemonError> {
        if term.trim().is_empty() {
            return self.logged(
                "search_images",
                Err(DaemonError::InvalidRequest("search term cannot be empty".to_string())),
            );
        }
        self.logged("search_images", self.client.search_images(term.trim()).await)
    }

    pub async fn remove_image(&self, id: &ImageId) -> bool {
        self.succeeded("remove_image", self.client.remove_image(id).await)
    }

    /// Import a root filesystem tarball as image `repo`.
    pub async fn create_image(
        &self,
        repo: &str,
        archive: Bytes,
    ) -> Result<Vec<CreateImageInfo>, DaemonError> {
        let reference = ImageRef::parse(repo).map_err(|e| invalid_image(repo, "", e));
        let reference = self.logged("create_image", reference)?;
        let progress = self.client.create_image(&reference, archive).await;
        self.logged("create_image", progress)
    }

    pub async fn load_image(&self, archive: Bytes) -> Result<Vec<LoadProgress>, DaemonError> {
        let output = self.logged("load_image", self.client.load_image(archive).await)?;
        Ok(output.into_iter().map(LoadProgress::from).collect())
    }

    pub async fn save_image(&self, name: &str, tag: &str) -> Result<Bytes, DaemonError> {
        let reference = ImageRef::from_parts(name, tag).map_err(|e| invalid_image(name, tag, e));
        let reference = self.logged("save_image", reference)?;
        let archive = self.logged("save_image", self.client.save_image(&reference).await)?;
        info!(config = %self.id, image = %reference, bytes = archive.len(), "exported image");
        Ok(archive)
    }

    /// Pull progress stream. A bad reference fails before the daemon is contacted.
    pub fn pull_image(&self, name: &str, tag: &str) -> Result<ItemStream<PullProgress>, DaemonError> {
        let reference = ImageRef::from_parts(name, tag).map_err(|e| invalid_image(name, tag, e));
        let reference = self.logged("pull_image", reference)?;
        info!(config = %self.id, image = %reference, "pulling image");
        self.stream("pull_image", self.client.pull_image(&reference))
    }

    pub fn push_image(&self, name: &str, tag: &str) -> Result<ItemStream<PushProgress>, DaemonError> {
        let reference = ImageRef::from_parts(name, tag).map_err(|e| invalid_image(name, tag, e));
        let reference = self.logged("push_image", reference)?;
        info!(config = %self.id, image = %reference, "pushing image");
        self.stream("push_image", self.client.push_image(&reference))
    }

    // ---------------------------------------------------------------------
    // Containers
    // ---------------------------------------------------------------------

    pub async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, DaemonError> {
        self.logged("list_containers", self.client.list_containers(all).await)
    }

    pub async fn create_container(
        &self,
        name: &str,
        tag: &str,
    ) -> Result<ContainerCreateResponse, DaemonError> {
        let reference = ImageRef::from_parts(name, tag).map_err(|e| invalid_image(name, tag, e));
        let reference = self.logged("create_container", reference)?;
        let created = self.client.create_container(&reference).await;
        self.logged("create_container", created)
    }

    pub async fn start_container(&self, id: &ContainerId) -> bool {
        self.succeeded("start_container", self.client.start_container(id).await)
    }

    pub async fn stop_container(&self, id: &ContainerId) -> bool {
        self.succeeded("stop_container", self.client.stop_container(id).await)
    }

    pub async fn kill_container(&self, id: &ContainerId) -> bool {
        self.succeeded("kill_container", self.client.kill_container(id).await)
    }

    pub async fn restart_container(&self, id: &ContainerId) -> bool {
        self.succeeded("restart_container", self.client.restart_container(id).await)
    }

    pub async fn pause_container(&self, id: &ContainerId) -> bool {
        self.succeeded("pause_container", self.client.pause_container(id).await)
    }

    pub async fn unpause_container(&self, id: &ContainerId) -> bool {
        self.succeeded("unpause_container", self.client.unpause_container(id).await)
    }

    pub async fn rename_container(&self, id: &ContainerId, name: &str) -> bool {
        let result = if name.trim().is_empty() {
            Err(DaemonError::InvalidRequest("new name cannot be empty".to_string()))
        } else {
            self.client.rename_container(id, name.trim()).await
        };
        self.succeeded("rename_container", result)
    }

    pub async fn remove_container(&self, id: &ContainerId, force: bool) -> bool {
        self.succeeded("remove_container", self.client.remove_container(id, force).await)
    }

    pub async fn inspect_container(
        &self,
        id: &ContainerId,
    ) -> Result<ContainerInspectResponse, DaemonError> {
        self.logged("inspect_container", self.client.inspect_container(id).await)
    }

    pub async fn diff_container(
        &self,
        id: &ContainerId,
    ) -> Result<Vec<FilesystemChange>, DaemonError> {
        self.logged("diff_container", self.client.diff_container(id).await)
    }

    pub async fn top_container(&self, id: &ContainerId) -> Result<ContainerTopResponse, DaemonError> {
        self.logged("top_container", self.client.top_container(id).await)
    }

    /// Emits the exit status once the container stops.
    pub fn wait_container(&self, id: &ContainerId) -> Result<ItemStream<WaitResult>, DaemonError> {
        self.stream("wait_container", self.client.wait_container(id))
    }

    pub fn log_container(
        &self,
        id: &ContainerId,
        opts: &LogOptions,
    ) -> Result<ItemStream<LogRecord>, DaemonError> {
        let frames = self.stream("log_container", self.client.logs(id, opts))?;
        Ok(frames.map(|frame| frame.map(LogRecord::from)).boxed())
    }

    pub fn stats_container(&self, id: &ContainerId) -> Result<ItemStream<StatEvent>, DaemonError> {
        self.stream("stats_container", self.client.stats(id))
    }

    // ---------------------------------------------------------------------
    // Host
    // ---------------------------------------------------------------------

    pub fn events(&self) -> Result<ItemStream<HostEvent>, DaemonError> {
        self.stream("events", self.client.events())
    }

    pub async fn inspect_swarm(&self) -> Result<Swarm, DaemonError> {
        self.logged("inspect_swarm", self.client.inspect_swarm().await)
    }
}

impl std::fmt::Debug for DockerApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerApi")
            .field("id", &self.id)
            .field("stream_capacity", &self.stream_capacity)
            .finish_non_exhaustive()
    }
}
