// ABOUTME: Image endpoints: listing, inspection, search, archives, and pull/push progress.

use super::AppState;
use super::error::{Result, command_status};
use super::ndjson::ndjson;
use super::requests::{IdQuery, ImageRequest, RepoQuery, SearchQuery};
use crate::types::{ConfigId, ImageId};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

pub async fn list_images(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
) -> Result<impl IntoResponse> {
    let api = state.registry.get(&config_id)?;
    Ok(Json(api.list_images().await?))
}

pub async fn inspect_image(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
    Query(query): Query<IdQuery>,
) -> Result<impl IntoResponse> {
    let api = state.registry.get(&config_id)?;
    Ok(Json(api.inspect_image(&ImageId::new(query.id)).await?))
}

pub async fn search_images(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    let api = state.registry.get(&config_id)?;
    Ok(Json(api.search_images(&query.search).await?))
}

pub async fn remove_image(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
    Query(query): Query<IdQuery>,
) -> Result<StatusCode> {
    let api = state.registry.get(&config_id)?;
    Ok(command_status(
        api.remove_image(&ImageId::new(query.id)).await,
    ))
}

/// Body is a root filesystem tarball.
pub async fn create_image(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
    Query(query): Query<RepoQuery>,
    archive: Bytes,
) -> Result<impl IntoResponse> {
    let api = state.registry.get(&config_id)?;
    Ok(Json(api.create_image(&query.repo, archive).await?))
}

/// Body is a `docker save` archive.
pub async fn load_image(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
    archive: Bytes,
) -> Result<impl IntoResponse> {
    let api = state.registry.get(&config_id)?;
    Ok(Json(api.load_image(archive).await?))
}

pub async fn save_image(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
    Json(request): Json<ImageRequest>,
) -> Result<Response> {
    let api = state.registry.get(&config_id)?;
    let archive = api.save_image(&request.name, &request.tag).await?;
    let file_name = format!(
        "attachment; filename=\"{}.tar\"",
        request.name.replace(['/', ':', '"'], "_")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/x-tar".to_string()),
            (header::CONTENT_DISPOSITION, file_name),
        ],
        archive,
    )
        .into_response())
}

pub async fn pull_image(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
    Query(request): Query<ImageRequest>,
) -> Result<Response> {
    let api = state.registry.get(&config_id)?;
    Ok(ndjson(api.pull_image(&request.name, &request.tag)?))
}

pub async fn push_image(
    State(state): State<AppState>,
    Path(config_id): Path<ConfigId>,
    Query(request): Query<ImageRequest>,
) -> Result<Response> {
    let api = state.registry.get(&config_id)?;
    Ok(ndjson(api.push_image(&request.name, &request.tag)?))
}
