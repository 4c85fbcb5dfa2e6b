// ABOUTME: Container endpoints: lifecycle commands, inspection, and wait/log/stats streams.

use super::AppState;
use super::error::{Result, command_status};
use super::ndjson::ndjson;
use super::requests::{
    IdQuery, ImageRequest, ListContainersQuery, LogContainerRequest, RemoveContainerQuery,
    RenameQuery,
};
use crate::api::DockerApi;
use crate::runtime::LogOptions;
use crate::types::{ConfigId, ContainerId};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub async fn list_containers(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
    Query(query): Query<ListContainersQuery>,
) -> Result<impl IntoResponse> {
    let api = state.registry.get(&config_id)?;
    Ok(Json(api.list_containers(query.all).await?))
}

pub async fn create_container(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
    Json(request): Json<ImageRequest>,
) -> Result<impl IntoResponse> {
    let api = state.registry.get(&config_id)?;
    let created = api.create_container(&request.name, &request.tag).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Generates a handler for a container command that only reports success.
macro_rules! container_command {
    ($($handler:ident),* $(,)?) => {
        $(
            pub async fn $handler(
                State(state): State<AppState>,
                Path(config_id): Path<ConfigId>,
                Query(query): Query<IdQuery>,
            ) -> Result<StatusCode> {
                let api = state.registry.get(&config_id)?;
                Ok(command_status(
                    DockerApi::$handler(&api, &ContainerId::new(query.id)).await,
                ))
            }
        )*
    };
}

container_command!(
    start_container,
    stop_container,
    kill_container,
    restart_container,
    pause_container,
    unpause_container,
);

pub async fn rename_container(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
    Query(query): Query<RenameQuery>,
) -> Result<StatusCode> {
    let api = state.registry.get(&config_id)?;
    Ok(command_status(
        api.rename_container(&ContainerId::new(query.id), &query.name)
            .await,
    ))
}

pub async fn remove_container(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
    Query(query): Query<RemoveContainerQuery>,
) -> Result<StatusCode> {
    let api = state.registry.get(&config_id)?;
    Ok(command_status(
        api.remove_container(&ContainerId::new(query.id), query.force)
            .await,
    ))
}

pub async fn inspect_container(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
    Query(query): Query<IdQuery>,
) -> Result<impl IntoResponse> {
    let api = state.registry.get(&config_id)?;
    Ok(Json(
        api.inspect_container(&ContainerId::new(query.id)).await?,
    ))
}

pub async fn diff_container(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
    Query(query): Query<IdQuery>,
) -> Result<impl IntoResponse> {
    let api = state.registry.get(&config_id)?;
    Ok(Json(api.diff_container(&ContainerId::new(query.id)).await?))
}

pub async fn top_container(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
    Query(query): Query<IdQuery>,
) -> Result<impl IntoResponse> {
    let api = state.registry.get(&config_id)?;
    Ok(Json(api.top_container(&ContainerId::new(query.id)).await?))
}

pub async fn wait_container(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
    Query(query): Query<IdQuery>,
) -> Result<Response> {
    let api = state.registry.get(&config_id)?;
    Ok(ndjson(api.wait_container(&ContainerId::new(query.id))?))
}

pub async fn log_container(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
    Query(request): Query<LogContainerRequest>,
) -> Result<Response> {
    let api = state.registry.get(&config_id)?;
    let opts = LogOptions::new(request.follow, request.tail);
    Ok(ndjson(
        api.log_container(&ContainerId::new(request.id), &opts)?,
    ))
}

pub async fn stats_container(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
    Query(query): Query<IdQuery>,
) -> Result<Response> {
    let api = state.registry.get(&config_id)?;
    Ok(ndjson(api.stats_container(&ContainerId::new(query.id))?))
}
