// ABOUTME: Connection config management over the repository set.
// ABOUTME: Changes are persisted only; the live registry picks them up on restart.

use super::AppState;
use super::error::{ApiError, Result};
use crate::config::ConnectionConfig;
use crate::registry::ConfigNotFound;
use crate::repository::ConfigEntity;
use crate::runtime::validate_connection;
use crate::types::ConfigId;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::info;

/// All configured daemons with secrets masked.
pub async fn list_configs(State(state): State<AppState>) -> Result<Json<Vec<ConfigEntity>>> {
    let entities = state.repositories.list().await?;
    Ok(Json(entities.iter().map(ConfigEntity::redacted).collect()))
}

pub async fn save_config(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
    Json(config): Json<ConnectionConfig>,
) -> Result<StatusCode> {
    if config_id.as_str().trim().is_empty() {
        return Err(ApiError::BadRequest("config id cannot be empty".to_string()));
    }
    validate_connection(&config).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let entity = ConfigEntity::new(config_id, config);
    state.repositories.save(&entity).await?;
    info!(config = %entity.id, "stored configuration, effective after restart");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_config(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
) -> Result<StatusCode> {
    if state.repositories.delete(&config_id).await? {
        info!(config = %config_id, "deleted configuration, effective after restart");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ConfigNotFound(config_id).into())
    }
}
