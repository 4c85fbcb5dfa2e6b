// ABOUTME: WebSocket sessions for log, pull, and event streams.
// ABOUTME: One JSON request frame in, one JSON text frame per stream item out.

use super::AppState;
use super::requests::{ImageRequest, LogContainerRequest};
use crate::api::{DockerApi, StreamItem};
use crate::runtime::{DaemonError, ItemStream, LogOptions};
use crate::types::{ConfigId, ContainerId};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Logs,
    Pull,
    Events,
}

impl Route {
    fn name(self) -> &'static str {
        match self {
            Route::Logs => "logContainer",
            Route::Pull => "pullImage",
            Route::Events => "events",
        }
    }

    async fn open(
        self,
        api: &DockerApi,
        socket: &mut WebSocket,
    ) -> Result<ItemStream<StreamItem>, String> {
        let opened = match self {
            Route::Logs => {
                let request: LogContainerRequest = read_request(socket).await?;
                let opts = LogOptions::new(request.follow, request.tail);
                api.log_container(&ContainerId::new(request.id), &opts)
                    .map(erase)
            }
            Route::Pull => {
                let request: ImageRequest = read_request(socket).await?;
                api.pull_image(&request.name, &request.tag).map(erase)
            }
            Route::Events => api.events().map(erase),
        };
        opened.map_err(|e| e.to_string())
    }
}

fn erase<T>(items: ItemStream<T>) -> ItemStream<StreamItem>
where
    T: Into<StreamItem> + 'static,
{
    items.map(|item| item.map(Into::into)).boxed()
}

pub async fn log_container(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
) -> Response {
    ws.on_upgrade(move |socket| session(socket, state, config_id, Route::Logs))
}

pub async fn pull_image(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
) -> Response {
    ws.on_upgrade(move |socket| session(socket, state, config_id, Route::Pull))
}

pub async fn events(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
) -> Response {
    ws.on_upgrade(move |socket| session(socket, state, config_id, Route::Events))
}

async fn session(mut socket: WebSocket, state: AppState, config_id: ConfigId, route: Route) {
    let api = match state.registry.get(&config_id) {
        Ok(api) => api,
        Err(not_found) => {
            warn!(config = %config_id, route = route.name(), "websocket for unknown config");
            close_with(socket, Message::Text(not_found.to_string().into())).await;
            return;
        }
    };

    let items = match route.open(&api, &mut socket).await {
        Ok(items) => items,
        Err(message) => {
            close_with(socket, error_frame(message)).await;
            return;
        }
    };

    info!(config = %config_id, route = route.name(), "websocket stream opened");
    forward(socket, items).await;
    info!(config = %config_id, route = route.name(), "websocket stream closed");
}

/// Wait for the first data frame and decode it as the request.
async fn read_request<R: DeserializeOwned>(socket: &mut WebSocket) -> Result<R, String> {
    while let Some(message) = socket.recv().await {
        let decoded = match message.map_err(|e| e.to_string())? {
            Message::Text(text) => serde_json::from_str(text.as_str()),
            Message::Binary(bytes) => serde_json::from_slice(&bytes),
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => continue,
        };
        return decoded.map_err(|e| format!("invalid request: {}", e));
    }
    Err("connection closed before a request was sent".to_string())
}

fn error_frame(message: impl Into<String>) -> Message {
    let body = serde_json::json!({ "error": message.into() });
    Message::Text(body.to_string().into())
}

async fn close_with(mut socket: WebSocket, last: Message) {
    if let Err(e) = socket.send(last).await {
        debug!(error = %e, "failed to send final websocket frame");
    }
    if let Err(e) = socket.send(Message::Close(None)).await {
        debug!(error = %e, "failed to close websocket");
    }
}

/// Pump stream items to the client until either side ends.
///
/// Returning drops `items`, which closes the daemon subscription when the
/// client leaves early.
async fn forward(socket: WebSocket, mut items: ItemStream<StreamItem>) {
    let (mut sender, mut receiver) = socket.split();

    let last = loop {
        tokio::select! {
            item = items.next() => match item {
                Some(Ok(item)) => {
                    let frame = match serde_json::to_string(&item) {
                        Ok(text) => Message::Text(text.into()),
                        Err(e) => break Some(error_frame(e.to_string())),
                    };
                    if let Err(e) = sender.send(frame).await {
                        debug!(error = %e, kind = item.kind(), "client stopped receiving");
                        return;
                    }
                }
                Some(Err(err)) => break Some(stream_error(err)),
                None => break None,
            },
            incoming = receiver.next() => match incoming {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => {
                    debug!("client disconnected, dropping stream");
                    return;
                }
                Some(Ok(_)) => {}
            },
        }
    };

    if let Some(frame) = last {
        if let Err(e) = sender.send(frame).await {
            debug!(error = %e, "failed to send stream error");
        }
    }
    if let Err(e) = sender.send(Message::Close(None)).await {
        debug!(error = %e, "failed to close websocket");
    }
}

fn stream_error(err: DaemonError) -> Message {
    warn!(error = %err, "stream ended with error");
    error_frame(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_frames_are_json_objects() {
        let Message::Text(text) = error_frame("daemon unreachable") else {
            panic!("expected a text frame");
        };
        let body: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(body, serde_json::json!({"error": "daemon unreachable"}));
    }

    #[test]
    fn route_names_match_paths() {
        assert_eq!(Route::Logs.name(), "logContainer");
        assert_eq!(Route::Pull.name(), "pullImage");
        assert_eq!(Route::Events.name(), "events");
    }
}
