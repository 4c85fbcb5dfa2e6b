// ABOUTME: Host-wide endpoints: the daemon event feed and swarm inspection.

use super::AppState;
use super::error::Result;
use super::ndjson::ndjson;
use crate::types::ConfigId;
use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};

pub async fn events(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
) -> Result<Response> {
    let api = state.registry.get(&config_id)?;
    Ok(ndjson(api.events()?))
}

pub async fn inspect_swarm(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
) -> Result<impl IntoResponse> {
    let api = state.registry.get(&config_id)?;
    Ok(Json(api.inspect_swarm().await?))
}
