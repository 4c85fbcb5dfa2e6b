// ABOUTME: In-process daemon implementing every client trait with scripted behaviour.
// ABOUTME: Records calls and stream subscriptions so tests can assert on cleanup.

use async_trait::async_trait;
use bollard::container::LogOutput;
use bollard::models::{
    BuildInfo, ContainerCreateResponse, ContainerInspectResponse, ContainerStatsResponse,
    ContainerSummary, ContainerTopResponse, ContainerWaitResponse, CreateImageInfo, EventMessage,
    FilesystemChange, ImageInspect, ImageSearchResponseItem, ImageSummary, PushImageInfo, Swarm,
    SystemInfo, SystemVersion,
};
use bytes::Bytes;
use dockgate::config::ConnectionConfig;
use dockgate::runtime::{
    ConnectionError, ConnectionFactory, ContainerOps, DaemonClient, DaemonError, HostOps,
    ImageOps, LogOptions, SourceResult, StreamSink, StreamSource, Subscription, SystemOps,
};
use dockgate::types::{ContainerId, ImageId, ImageRef};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::AbortHandle;

/// How a scripted stream ends after its items.
#[derive(Debug, Clone)]
pub enum StreamEnd {
    Complete,
    Fail(DaemonError),
    /// Never ends on its own, like a followed log.
    Open,
}

/// Counts subscriptions started and closed across every stream of one daemon.
#[derive(Debug, Default)]
pub struct SubscriptionLog {
    started: AtomicUsize,
    closed: AtomicUsize,
}

impl SubscriptionLog {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Delivers `items` from a spawned task, then ends as scripted.
pub struct ScriptedSource<T> {
    items: Vec<T>,
    end: StreamEnd,
    subs: Arc<SubscriptionLog>,
}

impl<T> ScriptedSource<T> {
    pub fn new(items: Vec<T>, end: StreamEnd, subs: Arc<SubscriptionLog>) -> Self {
        Self { items, end, subs }
    }
}

impl<T: Send + 'static> StreamSource<T> for ScriptedSource<T> {
    fn start(self: Box<Self>, sink: StreamSink<T>) -> Result<Box<dyn Subscription>, DaemonError> {
        let ScriptedSource { items, end, subs } = *self;
        subs.started.fetch_add(1, Ordering::SeqCst);

        let task = tokio::spawn(async move {
            for item in items {
                if sink.next(item).await.is_err() {
                    return;
                }
            }
            match end {
                StreamEnd::Complete => sink.complete(),
                StreamEnd::Fail(err) => sink.error(err),
                StreamEnd::Open => std::future::pending::<()>().await,
            }
        });

        Ok(Box::new(LoggedSubscription {
            subs,
            task: task.abort_handle(),
        }))
    }
}

struct LoggedSubscription {
    subs: Arc<SubscriptionLog>,
    task: AbortHandle,
}

impl Subscription for LoggedSubscription {
    fn close(&mut self) -> Result<(), DaemonError> {
        self.subs.closed.fetch_add(1, Ordering::SeqCst);
        self.task.abort();
        Ok(())
    }
}

/// A daemon that answers from memory.
///
/// `set_failing(true)` makes every call fail as if the daemon were down.
pub struct FakeDaemon {
    name: String,
    failing: AtomicBool,
    end: Mutex<StreamEnd>,
    subs: Arc<SubscriptionLog>,
    calls: Mutex<Vec<String>>,
}

impl FakeDaemon {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failing: AtomicBool::new(false),
            end: Mutex::new(StreamEnd::Complete),
            subs: Arc::new(SubscriptionLog::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: impl Into<String>) -> Self {
        let daemon = Self::new(name);
        daemon.set_failing(true);
        daemon
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// How streams opened from now on end.
    pub fn set_stream_end(&self, end: StreamEnd) {
        *self.end.lock().unwrap() = end;
    }

    pub fn subscriptions(&self) -> Arc<SubscriptionLog> {
        Arc::clone(&self.subs)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) -> Result<(), DaemonError> {
        self.calls.lock().unwrap().push(call.into());
        if self.failing.load(Ordering::SeqCst) {
            Err(DaemonError::Unreachable(format!("{} is down", self.name)))
        } else {
            Ok(())
        }
    }

    fn scripted<T: Send + 'static>(&self, call: String, items: Vec<T>) -> SourceResult<T> {
        self.record(call)?;
        let end = self.end.lock().unwrap().clone();
        Ok(Box::new(ScriptedSource::new(items, end, self.subscriptions())))
    }
}

pub fn progress(status: &str) -> CreateImageInfo {
    CreateImageInfo {
        status: Some(status.to_string()),
        ..Default::default()
    }
}

pub fn stdout(line: &str) -> LogOutput {
    LogOutput::StdOut {
        message: Bytes::copy_from_slice(line.as_bytes()),
    }
}

#[async_trait]
impl SystemOps for FakeDaemon {
    async fn ping(&self) -> Result<(), DaemonError> {
        self.record("ping")
    }

    async fn info(&self) -> Result<SystemInfo, DaemonError> {
        self.record("info")?;
        Ok(SystemInfo {
            name: Some(self.name.clone()),
            ..Default::default()
        })
    }

    async fn version(&self) -> Result<SystemVersion, DaemonError> {
        self.record("version")?;
        Ok(SystemVersion {
            api_version: Some("1.47".to_string()),
            ..Default::default()
        })
    }
}

#[async_trait]
impl ImageOps for FakeDaemon {
    async fn list_images(&self) -> Result<Vec<ImageSummary>, DaemonError> {
        self.record("list_images")?;
        Ok(vec![ImageSummary {
            id: "sha256:busybox".to_string(),
            repo_tags: vec!["busybox:latest".to_string()],
            ..Default::default()
        }])
    }

    async fn inspect_image(&self, id: &ImageId) -> Result<ImageInspect, DaemonError> {
        self.record(format!("inspect_image:{}", id))?;
        Ok(ImageInspect {
            id: Some(id.to_string()),
            ..Default::default()
        })
    }

    async fn search_images(&self, term: &str) -> Result<Vec<ImageSearchResponseItem>, DaemonError> {
        self.record(format!("search_images:{}", term))?;
        Ok(vec![ImageSearchResponseItem {
            name: Some(term.to_string()),
            ..Default::default()
        }])
    }

    async fn remove_image(&self, id: &ImageId) -> Result<(), DaemonError> {
        self.record(format!("remove_image:{}", id))
    }

    async fn create_image(
        &self,
        reference: &ImageRef,
        archive: Bytes,
    ) -> Result<Vec<CreateImageInfo>, DaemonError> {
        self.record(format!("create_image:{}:{}", reference, archive.len()))?;
        Ok(vec![progress("imported")])
    }

    async fn load_image(&self, archive: Bytes) -> Result<Vec<BuildInfo>, DaemonError> {
        self.record(format!("load_image:{}", archive.len()))?;
        Ok(vec![BuildInfo {
            stream: Some("Loaded image".to_string()),
            ..Default::default()
        }])
    }

    async fn save_image(&self, reference: &ImageRef) -> Result<Bytes, DaemonError> {
        self.record(format!("save_image:{}", reference))?;
        Ok(Bytes::from_static(b"tar-bytes"))
    }

    fn pull_image(&self, reference: &ImageRef) -> SourceResult<CreateImageInfo> {
        self.scripted(
            format!("pull_image:{}", reference),
            vec![
                progress("Pulling from library"),
                progress("Downloading"),
                progress("Pull complete"),
            ],
        )
    }

    fn push_image(&self, reference: &ImageRef) -> SourceResult<PushImageInfo> {
        self.scripted(
            format!("push_image:{}", reference),
            vec![PushImageInfo {
                status: Some("Pushed".to_string()),
                ..Default::default()
            }],
        )
    }
}

#[async_trait]
impl ContainerOps for FakeDaemon {
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, DaemonError> {
        self.record(format!("list_containers:{}", all))?;
        Ok(vec![ContainerSummary {
            id: Some("c1".to_string()),
            ..Default::default()
        }])
    }

    async fn create_container(
        &self,
        image: &ImageRef,
    ) -> Result<ContainerCreateResponse, DaemonError> {
        self.record(format!("create_container:{}", image))?;
        Ok(ContainerCreateResponse {
            id: "c2".to_string(),
            warnings: Vec::new(),
        })
    }

    async fn start_container(&self, id: &ContainerId) -> Result<(), DaemonError> {
        self.record(format!("start_container:{}", id))
    }

    async fn stop_container(&self, id: &ContainerId) -> Result<(), DaemonError> {
        self.record(format!("stop_container:{}", id))
    }

    async fn kill_container(&self, id: &ContainerId) -> Result<(), DaemonError> {
        self.record(format!("kill_container:{}", id))
    }

    async fn restart_container(&self, id: &ContainerId) -> Result<(), DaemonError> {
        self.record(format!("restart_container:{}", id))
    }

    async fn pause_container(&self, id: &ContainerId) -> Result<(), DaemonError> {
        self.record(format!("pause_container:{}", id))
    }

    async fn unpause_container(&self, id: &ContainerId) -> Result<(), DaemonError> {
        self.record(format!("unpause_container:{}", id))
    }

    async fn rename_container(&self, id: &ContainerId, name: &str) -> Result<(), DaemonError> {
        self.record(format!("rename_container:{}:{}", id, name))
    }

    async fn remove_container(&self, id: &ContainerId, force: bool) -> Result<(), DaemonError> {
        self.record(format!("remove_container:{}:{}", id, force))
    }

    async fn inspect_container(
        &self,
        id: &ContainerId,
    ) -> Result<ContainerInspectResponse, DaemonError> {
        self.record(format!("inspect_container:{}", id))?;
        Ok(ContainerInspectResponse {
            id: Some(id.to_string()),
            ..Default::default()
        })
    }

    async fn diff_container(
        &self,
        id: &ContainerId,
    ) -> Result<Vec<FilesystemChange>, DaemonError> {
        self.record(format!("diff_container:{}", id))?;
        Ok(Vec::new())
    }

    async fn top_container(&self, id: &ContainerId) -> Result<ContainerTopResponse, DaemonError> {
        self.record(format!("top_container:{}", id))?;
        Ok(ContainerTopResponse::default())
    }

    fn wait_container(&self, id: &ContainerId) -> SourceResult<ContainerWaitResponse> {
        self.scripted(
            format!("wait_container:{}", id),
            vec![ContainerWaitResponse {
                status_code: 0,
                error: None,
            }],
        )
    }

    fn logs(&self, id: &ContainerId, opts: &LogOptions) -> SourceResult<LogOutput> {
        self.scripted(
            format!("logs:{}:{}:{}", id, opts.follow, opts.tail_param()),
            vec![stdout("hello"), stdout("world")],
        )
    }

    fn stats(&self, id: &ContainerId) -> SourceResult<ContainerStatsResponse> {
        self.scripted(
            format!("stats:{}", id),
            vec![ContainerStatsResponse::default()],
        )
    }
}

#[async_trait]
impl HostOps for FakeDaemon {
    fn events(&self) -> SourceResult<EventMessage> {
        self.scripted(
            "events".to_string(),
            vec![EventMessage {
                action: Some("start".to_string()),
                ..Default::default()
            }],
        )
    }

    async fn inspect_swarm(&self) -> Result<Swarm, DaemonError> {
        self.record("inspect_swarm")?;
        Ok(Swarm::default())
    }
}

/// Hands out one `FakeDaemon` per target, creating them on demand.
#[derive(Default)]
pub struct FakeFactory {
    daemons: Mutex<HashMap<String, Arc<FakeDaemon>>>,
    refused: HashSet<String>,
    connects: AtomicUsize,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail client creation for `target`.
    pub fn refusing(mut self, target: impl Into<String>) -> Self {
        self.refused.insert(target.into());
        self
    }

    pub fn daemon(&self, target: &str) -> Arc<FakeDaemon> {
        Arc::clone(
            self.daemons
                .lock()
                .unwrap()
                .entry(target.to_string())
                .or_insert_with(|| Arc::new(FakeDaemon::new(target))),
        )
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl ConnectionFactory for FakeFactory {
    fn connect(
        &self,
        config: &ConnectionConfig,
    ) -> Result<Arc<dyn DaemonClient>, ConnectionError> {
        let target = config.target.to_string();
        if self.refused.contains(&target) {
            return Err(ConnectionError::InvalidHost {
                host: target,
                reason: "refused by test".to_string(),
            });
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.daemon(&target))
    }
}
