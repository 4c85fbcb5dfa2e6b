// ABOUTME: Items carried by the gateway's streams and their JSON shape.
// ABOUTME: Log frames become typed records; other items are the daemon's own models.

use bollard::container::LogOutput;
use bollard::models::{
    BuildInfo, ContainerStatsResponse, ContainerWaitResponse, CreateImageInfo, EventMessage,
    PushImageInfo,
};
use serde::{Deserialize, Serialize};

pub type PullProgress = CreateImageInfo;
pub type PushProgress = PushImageInfo;
pub type WaitResult = ContainerWaitResponse;
pub type StatEvent = ContainerStatsResponse;
pub type HostEvent = EventMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogStreamType {
    Stdin,
    Stdout,
    Stderr,
    Raw,
}

/// One frame of container output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(rename = "type")]
    pub stream_type: LogStreamType,
    pub payload: String,
}

impl From<LogOutput> for LogRecord {
    fn from(output: LogOutput) -> Self {
        let (stream_type, message) = match output {
            LogOutput::StdIn { message } => (LogStreamType::Stdin, message),
            LogOutput::StdOut { message } => (LogStreamType::Stdout, message),
            LogOutput::StdErr { message } => (LogStreamType::Stderr, message),
            LogOutput::Console { message } => (LogStreamType::Raw, message),
        };
        LogRecord {
            stream_type,
            payload: String::from_utf8_lossy(&message).into_owned(),
        }
    }
}

/// One line of image-load output. A failed line carries only `error`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadProgress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<BuildInfo> for LoadProgress {
    fn from(info: BuildInfo) -> Self {
        LoadProgress {
            id: info.id,
            stream: info.stream,
            status: info.status,
            error: info.error_detail.and_then(|detail| detail.message),
        }
    }
}

/// Any item a gateway stream can carry. Serializes as the inner item.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StreamItem {
    PullProgress(PullProgress),
    PushProgress(PushProgress),
    WaitResult(WaitResult),
    LogRecord(LogRecord),
    StatEvent(StatEvent),
    HostEvent(HostEvent),
}

impl StreamItem {
    pub fn kind(&self) -> &'static str {
        match self {
            StreamItem::PullProgress(_) => "pull-progress",
            StreamItem::PushProgress(_) => "push-progress",
            StreamItem::WaitResult(_) => "wait-result",
            StreamItem::LogRecord(_) => "log-record",
            StreamItem::StatEvent(_) => "stat-event",
            StreamItem::HostEvent(_) => "host-event",
        }
    }
}

macro_rules! stream_item_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for StreamItem {
                fn from(item: $variant) -> Self {
                    StreamItem::$variant(item)
                }
            }
        )*
    };
}

stream_item_from!(PullProgress, PushProgress, WaitResult, LogRecord, StatEvent, HostEvent);
