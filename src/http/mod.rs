// ABOUTME: REST, NDJSON, and WebSocket adapters over the daemon registry.
// ABOUTME: Builds the axum router and runs the server until shutdown.

mod config;
mod container;
pub mod error;
mod host;
mod image;
pub mod ndjson;
pub mod requests;
mod system;
mod ws;

pub use error::ApiError;
pub use ndjson::MEDIA_TYPE_NDJSON;

use crate::registry::DaemonRegistry;
use crate::repository::RepositorySet;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};

/// Shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: Arc<DaemonRegistry>,
    pub repositories: RepositorySet,
}

impl AppState {
    pub fn new(registry: Arc<DaemonRegistry>, repositories: RepositorySet) -> Self {
        Self {
            registry,
            repositories,
        }
    }
}

fn docker_routes() -> Router<AppState> {
    Router::new()
        // System
        .route("/{config_id}/ping", get(system::ping))
        .route("/{config_id}/info", get(system::info))
        .route("/{config_id}/version", get(system::version))
        // Images
        .route("/image/{config_id}/listOfImages", get(image::list_images))
        .route("/image/{config_id}/inspectImage", get(image::inspect_image))
        .route("/image/{config_id}/searchImages", get(image::search_images))
        .route("/image/{config_id}/removeImage", delete(image::remove_image))
        .route(
            "/image/{config_id}/createImage",
            post(image::create_image).layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/image/{config_id}/loadImage",
            post(image::load_image).layer(DefaultBodyLimit::disable()),
        )
        .route("/image/{config_id}/saveImage", post(image::save_image))
        .route("/image/{config_id}/pullImage", get(image::pull_image))
        .route("/image/{config_id}/pushImage", get(image::push_image))
        // Containers
        .route(
            "/container/{config_id}/listOfContainers",
            get(container::list_containers),
        )
        .route(
            "/container/{config_id}/createContainer",
            post(container::create_container),
        )
        .route(
            "/container/{config_id}/startContainer",
            post(container::start_container),
        )
        .route(
            "/container/{config_id}/stopContainer",
            post(container::stop_container),
        )
        .route(
            "/container/{config_id}/restartContainer",
            post(container::restart_container),
        )
        .route(
            "/container/{config_id}/pauseContainer",
            post(container::pause_container),
        )
        .route(
            "/container/{config_id}/unpauseContainer",
            post(container::unpause_container),
        )
        .route(
            "/container/{config_id}/killContainer",
            delete(container::kill_container),
        )
        .route(
            "/container/{config_id}/renameContainer",
            post(container::rename_container),
        )
        .route(
            "/container/{config_id}/removeContainer",
            delete(container::remove_container),
        )
        .route(
            "/container/{config_id}/inspectContainer",
            get(container::inspect_container),
        )
        .route(
            "/container/{config_id}/diffContainer",
            get(container::diff_container),
        )
        .route(
            "/container/{config_id}/topContainer",
            get(container::top_container),
        )
        .route(
            "/container/{config_id}/waitContainer",
            get(container::wait_container),
        )
        .route(
            "/container/{config_id}/logContainer",
            get(container::log_container),
        )
        .route(
            "/container/{config_id}/statsContainer",
            get(container::stats_container),
        )
        // Host
        .route("/client/{config_id}/events", get(host::events))
        .route("/client/{config_id}/inspectSwarm", get(host::inspect_swarm))
}

fn ws_routes() -> Router<AppState> {
    Router::new()
        .route("/{config_id}/logContainer", get(ws::log_container))
        .route("/{config_id}/pullImage", get(ws::pull_image))
        .route("/{config_id}/events", get(ws::events))
}

/// Creates the gateway router with all endpoints.
#[must_use]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/docker", docker_routes())
        .route("/api/config", get(config::list_configs))
        .route(
            "/api/config/{config_id}",
            put(config::save_config).delete(config::delete_config),
        )
        .nest("/ws/docker", ws_routes())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, daemons = state.registry.len(), "gateway listening");
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
