// ABOUTME: Daemon liveness, info, and version endpoints.

use super::AppState;
use super::error::{Result, command_status};
use crate::types::ConfigId;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// 200 when the daemon answers, 500 otherwise.
pub async fn ping(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
) -> Result<StatusCode> {
    let api = state.registry.get(&config_id)?;
    Ok(command_status(api.ping().await))
}

pub async fn info(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
) -> Result<impl IntoResponse> {
    let api = state.registry.get(&config_id)?;
    Ok(Json(api.info().await?))
}

pub async fn version(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
) -> Result<impl IntoResponse> {
    let api = state.registry.get(&config_id)?;
    Ok(Json(api.version().await?))
}
