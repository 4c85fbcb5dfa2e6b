// ABOUTME: Bollard-based daemon client implementing the capability traits.
// ABOUTME: Maps bollard errors into DaemonError and bounds concurrent calls per client.

use crate::config::TransportLimits;
use crate::runtime::error::DaemonError;
use crate::runtime::stream::PumpSource;
use crate::runtime::traits::{
    ContainerOps, HostOps, ImageOps, LogOptions, SourceResult, SystemOps,
};
use crate::types::{ContainerId, ImageId, ImageRef};
use async_trait::async_trait;
use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::container::LogOutput;
use bollard::models::{
    BuildInfo, ContainerCreateBody, ContainerCreateResponse, ContainerInspectResponse,
    ContainerStatsResponse, ContainerSummary, ContainerTopResponse, ContainerWaitExitError,
    ContainerWaitResponse, CreateImageInfo, EventMessage, FilesystemChange, ImageInspect,
    ImageSearchResponseItem, ImageSummary, PushImageInfo, Swarm, SystemInfo, SystemVersion,
};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, EventsOptions, ImportImageOptions,
    InspectContainerOptions, KillContainerOptions, ListContainersOptions, ListImagesOptions,
    LogsOptions, PushImageOptions, RemoveContainerOptions, RemoveImageOptions,
    RenameContainerOptions, RestartContainerOptions, SearchImagesOptions, StartContainerOptions,
    StatsOptions, StopContainerOptions, TopOptions, WaitContainerOptions,
};
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, TryStreamExt};
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};

// =============================================================================
// Error Mapping Helpers
// =============================================================================

pub(crate) fn map_daemon_error(e: bollard::errors::Error) -> DaemonError {
    match e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } => DaemonError::CommandFailed {
            status: Some(status_code),
            message,
        },
        bollard::errors::Error::RequestTimeoutError => {
            DaemonError::Unreachable("request timed out".to_string())
        }
        e @ bollard::errors::Error::IOError { .. } => DaemonError::Unreachable(e.to_string()),
        other => DaemonError::command(other.to_string()),
    }
}

/// A non-zero exit is reported by bollard as an error; it is a wait result here.
fn map_wait_result(
    result: Result<ContainerWaitResponse, bollard::errors::Error>,
) -> Result<ContainerWaitResponse, DaemonError> {
    match result {
        Ok(response) => Ok(response),
        Err(bollard::errors::Error::DockerContainerWaitError { error, code }) => {
            Ok(ContainerWaitResponse {
                status_code: code,
                error: (!error.is_empty()).then(|| ContainerWaitExitError {
                    message: Some(error),
                }),
            })
        }
        Err(e) => Err(map_daemon_error(e)),
    }
}

// =============================================================================
// BollardClient
// =============================================================================

/// Daemon client over one bollard connection.
///
/// At most `limits.max_connections` request/response calls run at once.
/// Streams are not counted, so idle followers never starve other calls.
pub struct BollardClient {
    client: Docker,
    credentials: Option<DockerCredentials>,
    permits: Semaphore,
    connect_timeout: Duration,
}

impl BollardClient {
    pub fn new(client: Docker, limits: &TransportLimits) -> Self {
        Self {
            client,
            credentials: None,
            permits: Semaphore::new(limits.max_connections.max(1)),
            connect_timeout: limits.connect_timeout,
        }
    }

    pub fn with_credentials(mut self, credentials: Option<DockerCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    async fn permit(&self) -> Result<SemaphorePermit<'_>, DaemonError> {
        self.permits
            .acquire()
            .await
            .map_err(|_| DaemonError::Unreachable("client is shut down".to_string()))
    }

    fn pump<S, T>(&self, stream: S) -> SourceResult<T>
    where
        S: Stream<Item = Result<T, DaemonError>> + Send + 'static,
        T: Send + 'static,
    {
        Ok(Box::new(PumpSource::new(stream)))
    }
}

#[async_trait]
impl SystemOps for BollardClient {
    async fn ping(&self) -> Result<(), DaemonError> {
        // Waiting for a permit counts against the timeout too.
        let attempt = async {
            let _permit = self.permit().await?;
            self.client
                .ping()
                .await
                .map(|_| ())
                .map_err(|e| DaemonError::Unreachable(e.to_string()))
        };
        match tokio::time::timeout(self.connect_timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(DaemonError::Unreachable(format!(
                "no answer within {:?}",
                self.connect_timeout
            ))),
        }
    }

    async fn info(&self) -> Result<SystemInfo, DaemonError> {
        let _permit = self.permit().await?;
        self.client.info().await.map_err(map_daemon_error)
    }

    async fn version(&self) -> Result<SystemVersion, DaemonError> {
        let _permit = self.permit().await?;
        self.client.version().await.map_err(map_daemon_error)
    }
}

#[async_trait]
impl HostOps for BollardClient {
    fn events(&self) -> SourceResult<EventMessage> {
        let stream = self
            .client
            .events(None::<EventsOptions>)
            .map(|result| result.map_err(map_daemon_error));
        self.pump(stream)
    }

    async fn inspect_swarm(&self) -> Result<Swarm, DaemonError> {
        let _permit = self.permit().await?;
        self.client.inspect_swarm().await.map_err(map_daemon_error)
    }
}

#[async_trait]
impl ImageOps for BollardClient {
    async fn list_images(&self) -> Result<Vec<ImageSummary>, DaemonError> {
        let _permit = self.permit().await?;
        self.client
            .list_images(None::<ListImagesOptions>)
            .await
            .map_err(map_daemon_error)
    }

    async fn inspect_image(&self, id: &ImageId) -> Result<ImageInspect, DaemonError> {
        let _permit = self.permit().await?;
        self.client
            .inspect_image(id.as_str())
            .await
            .map_err(map_daemon_error)
    }

    async fn search_images(&self, term: &str) -> Result<Vec<ImageSearchResponseItem>, DaemonError> {
        let _permit = self.permit().await?;
        let opts = SearchImagesOptions {
            term: term.to_string(),
            ..Default::default()
        };
        self.client
            .search_images(opts)
            .await
            .map_err(map_daemon_error)
    }

    async fn remove_image(&self, id: &ImageId) -> Result<(), DaemonError> {
        let _permit = self.permit().await?;
        self.client
            .remove_image(id.as_str(), None::<RemoveImageOptions>, None)
            .await
            .map_err(map_daemon_error)?;
        Ok(())
    }

    async fn create_image(
        &self,
        reference: &ImageRef,
        archive: Bytes,
    ) -> Result<Vec<CreateImageInfo>, DaemonError> {
        let _permit = self.permit().await?;
        let opts = CreateImageOptions {
            from_src: Some("-".to_string()),
            repo: Some(reference.repository()),
            tag: reference.tag().map(str::to_string),
            ..Default::default()
        };
        self.client
            .create_image(Some(opts), Some(bollard::body_full(archive)), None)
            .map_err(map_daemon_error)
            .try_collect()
            .await
    }

    async fn load_image(&self, archive: Bytes) -> Result<Vec<BuildInfo>, DaemonError> {
        let _permit = self.permit().await?;
        self.client
            .import_image(
                ImportImageOptions::default(),
                bollard::body_full(archive),
                None,
            )
            .map_err(map_daemon_error)
            .try_collect()
            .await
    }

    async fn save_image(&self, reference: &ImageRef) -> Result<Bytes, DaemonError> {
        let _permit = self.permit().await?;
        let name = reference.to_string();
        let mut stream = std::pin::pin!(self.client.export_image(&name));
        let mut archive = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            archive.extend_from_slice(&chunk.map_err(map_daemon_error)?);
        }
        Ok(archive.freeze())
    }

    fn pull_image(&self, reference: &ImageRef) -> SourceResult<CreateImageInfo> {
        let opts = CreateImageOptions {
            from_image: Some(reference.to_string()),
            ..Default::default()
        };
        let stream = self
            .client
            .create_image(Some(opts), None, self.credentials.clone())
            .map(|result| result.map_err(map_daemon_error));
        self.pump(stream)
    }

    fn push_image(&self, reference: &ImageRef) -> SourceResult<PushImageInfo> {
        let opts = PushImageOptions {
            tag: reference.tag().map(str::to_string),
            ..Default::default()
        };
        let stream = self
            .client
            .push_image(
                &reference.repository(),
                Some(opts),
                self.credentials.clone(),
            )
            .map(|result| result.map_err(map_daemon_error));
        self.pump(stream)
    }
}

#[async_trait]
impl ContainerOps for BollardClient {
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, DaemonError> {
        let _permit = self.permit().await?;
        let opts = ListContainersOptions {
            all,
            ..Default::default()
        };
        self.client
            .list_containers(Some(opts))
            .await
            .map_err(map_daemon_error)
    }

    async fn create_container(
        &self,
        image: &ImageRef,
    ) -> Result<ContainerCreateResponse, DaemonError> {
        let _permit = self.permit().await?;
        let body = ContainerCreateBody {
            image: Some(image.to_string()),
            ..Default::default()
        };
        self.client
            .create_container(None::<CreateContainerOptions>, body)
            .await
            .map_err(map_daemon_error)
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), DaemonError> {
        let _permit = self.permit().await?;
        self.client
            .start_container(id.as_str(), None::<StartContainerOptions>)
            .await
            .map_err(map_daemon_error)
    }

    async fn stop_container(&self, id: &ContainerId) -> Result<(), DaemonError> {
        let _permit = self.permit().await?;
        self.client
            .stop_container(id.as_str(), None::<StopContainerOptions>)
            .await
            .map_err(map_daemon_error)
    }

    async fn kill_container(&self, id: &ContainerId) -> Result<(), DaemonError> {
        let _permit = self.permit().await?;
        self.client
            .kill_container(id.as_str(), None::<KillContainerOptions>)
            .await
            .map_err(map_daemon_error)
    }

    async fn restart_container(&self, id: &ContainerId) -> Result<(), DaemonError> {
        let _permit = self.permit().await?;
        self.client
            .restart_container(id.as_str(), None::<RestartContainerOptions>)
            .await
            .map_err(map_daemon_error)
    }

    async fn pause_container(&self, id: &ContainerId) -> Result<(), DaemonError> {
        let _permit = self.permit().await?;
        self.client
            .pause_container(id.as_str())
            .await
            .map_err(map_daemon_error)
    }

    async fn unpause_container(&self, id: &ContainerId) -> Result<(), DaemonError> {
        let _permit = self.permit().await?;
        self.client
            .unpause_container(id.as_str())
            .await
            .map_err(map_daemon_error)
    }

    async fn rename_container(&self, id: &ContainerId, name: &str) -> Result<(), DaemonError> {
        let _permit = self.permit().await?;
        self.client
            .rename_container(
                id.as_str(),
                RenameContainerOptions {
                    name: name.to_string(),
                },
            )
            .await
            .map_err(map_daemon_error)
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), DaemonError> {
        let _permit = self.permit().await?;
        let opts = RemoveContainerOptions {
            force,
            ..Default::default()
        };
        self.client
            .remove_container(id.as_str(), Some(opts))
            .await
            .map_err(map_daemon_error)
    }

    async fn inspect_container(
        &self,
        id: &ContainerId,
    ) -> Result<ContainerInspectResponse, DaemonError> {
        let _permit = self.permit().await?;
        self.client
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(map_daemon_error)
    }

    async fn diff_container(
        &self,
        id: &ContainerId,
    ) -> Result<Vec<FilesystemChange>, DaemonError> {
        let _permit = self.permit().await?;
        let changes = self
            .client
            .container_changes(id.as_str())
            .await
            .map_err(map_daemon_error)?;
        Ok(changes.unwrap_or_default())
    }

    async fn top_container(&self, id: &ContainerId) -> Result<ContainerTopResponse, DaemonError> {
        let _permit = self.permit().await?;
        self.client
            .top_processes(id.as_str(), None::<TopOptions>)
            .await
            .map_err(map_daemon_error)
    }

    fn wait_container(&self, id: &ContainerId) -> SourceResult<ContainerWaitResponse> {
        let stream = self
            .client
            .wait_container(id.as_str(), None::<WaitContainerOptions>)
            .map(map_wait_result);
        self.pump(stream)
    }

    fn logs(&self, id: &ContainerId, opts: &LogOptions) -> SourceResult<LogOutput> {
        let log_opts = LogsOptions {
            stdout: true,
            stderr: true,
            follow: opts.follow,
            timestamps: opts.timestamps,
            tail: opts.tail_param(),
            ..Default::default()
        };
        let stream = self
            .client
            .logs(id.as_str(), Some(log_opts))
            .map(|result| result.map_err(map_daemon_error));
        self.pump(stream)
    }

    fn stats(&self, id: &ContainerId) -> SourceResult<ContainerStatsResponse> {
        let opts = StatsOptions {
            stream: true,
            one_shot: false,
        };
        let stream = self
            .client
            .stats(id.as_str(), Some(opts))
            .map(|result| result.map_err(map_daemon_error));
        self.pump(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn server_errors_keep_status() {
        let err = map_daemon_error(bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "No such container: web".to_string(),
        });
        assert_eq!(
            err,
            DaemonError::CommandFailed {
                status: Some(404),
                message: "No such container: web".to_string()
            }
        );
    }

    #[test]
    fn timeouts_are_unreachable() {
        let err = map_daemon_error(bollard::errors::Error::RequestTimeoutError);
        assert!(matches!(err, DaemonError::Unreachable(_)));
    }

    /// A unix socket that accepts connections and never answers.
    #[cfg(unix)]
    fn silent_daemon(dir: &std::path::Path) -> (String, tokio::task::JoinHandle<()>) {
        let path = dir.join("silent.sock");
        let listener = tokio::net::UnixListener::bind(&path).unwrap();
        let held = tokio::spawn(async move {
            let mut connections = Vec::new();
            while let Ok((connection, _)) = listener.accept().await {
                connections.push(connection);
            }
        });
        (path.to_string_lossy().into_owned(), held)
    }

    #[cfg(unix)]
    fn single_slot_client(path: &str) -> BollardClient {
        let docker =
            Docker::connect_with_socket(path, 120, bollard::API_DEFAULT_VERSION).unwrap();
        let limits = TransportLimits {
            max_connections: 1,
            connect_timeout: Duration::from_millis(300),
            ..Default::default()
        };
        BollardClient::new(docker, &limits)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn open_streams_do_not_block_ping() {
        use crate::runtime::stream::DaemonStream;

        let dir = tempfile::tempdir().unwrap();
        let (path, held) = silent_daemon(dir.path());
        let client = single_slot_client(&path);

        let mut events = DaemonStream::new("events", client.events().unwrap());
        let mut logs = DaemonStream::new(
            "logs",
            client
                .logs(&ContainerId::new("web"), &LogOptions::new(true, None))
                .unwrap(),
        );
        let idle = Duration::from_millis(100);
        assert!(tokio::time::timeout(idle, events.next()).await.is_err());
        assert!(tokio::time::timeout(idle, logs.next()).await.is_err());
        assert_eq!(client.permits.available_permits(), 1);

        let ping = tokio::time::timeout(Duration::from_secs(3), client.ping()).await;
        assert!(matches!(ping, Ok(Err(DaemonError::Unreachable(_)))));
        held.abort();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn ping_times_out_while_waiting_for_a_permit() {
        let dir = tempfile::tempdir().unwrap();
        let (path, held) = silent_daemon(dir.path());
        let client = Arc::new(single_slot_client(&path));

        let busy = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.info().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let ping = tokio::time::timeout(Duration::from_secs(3), client.ping()).await;
        assert!(matches!(ping, Ok(Err(DaemonError::Unreachable(_)))));
        busy.abort();
        held.abort();
    }

    #[test]
    fn non_zero_exit_is_a_wait_result() {
        let result = map_wait_result(Err(bollard::errors::Error::DockerContainerWaitError {
            error: "exit status 3".to_string(),
            code: 3,
        }))
        .unwrap();
        assert_eq!(result.status_code, 3);
        assert_eq!(
            result.error.and_then(|e| e.message).as_deref(),
            Some("exit status 3")
        );
    }
}
