use axum::{
    extract::{Path, State},
    Json,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path as FsPath, PathBuf};
use std::sync::Arc;

use crate::package::{ExportOptions, ExportReport, ExportRequest};
use crate::server::AppState;
use crate::{service, Error, ResourceType};

#[derive(Deserialize)]
pub struct SeedPackageBody {
    pub resources: serde_json::Value,
    /// Relative to the configured output root; the root itself when absent
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub append: bool,
    #[serde(default)]
    pub skip_sentinels: bool,
}

/// Place a client-chosen package directory below `root`.
///
/// Only plain relative paths are accepted, so a request can never write
/// (or clear stale scripts) outside the root.
pub fn package_dir(root: &FsPath, requested: Option<&FsPath>) -> Result<PathBuf, Error> {
    let Some(requested) = requested else {
        return Ok(root.to_path_buf());
    };
    let plain = requested
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !plain || requested.as_os_str().is_empty() {
        return Err(Error::InvalidInput(format!(
            "output_dir must be a relative path below the output root, got {}",
            requested.display()
        )));
    }
    Ok(root.join(requested))
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(e: Error) -> ApiError {
    let status = match &e {
        Error::UnknownResourceType(_) | Error::InvalidInput(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
        Error::NodeNotFound { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::error!(status = status.as_u16(), "{}", e);
    (status, Json(ErrorResponse { error: e.to_string() }))
}

fn join_error(e: tokio::task::JoinError) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: e.to_string() }))
}

pub async fn list_all(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    tracing::debug!("Listing all resources");
    let catalog = tokio::task::spawn_blocking(move || service::list(&state.config, &state.registry, None))
        .await
        .map_err(join_error)?
        .map_err(api_error)?;

    Ok(Json(serde_json::to_value(&catalog).map_err(|e| api_error(e.into()))?))
}

pub async fn list_type(
    State(state): State<Arc<AppState>>,
    Path(resource_type): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ty: ResourceType = resource_type.parse().map_err(api_error)?;
    tracing::debug!(resource_type = %ty, "Listing resources");

    let mut catalog = tokio::task::spawn_blocking(move || service::list(&state.config, &state.registry, Some(ty)))
        .await
        .map_err(join_error)?
        .map_err(api_error)?;

    let records = catalog.resources.shift_remove(&ty).unwrap_or_default();
    Ok(Json(serde_json::Value::Array(
        records.into_iter().map(serde_json::Value::Object).collect(),
    )))
}

pub async fn create_seed_package(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SeedPackageBody>,
) -> Result<Json<ExportReport>, ApiError> {
    let request = ExportRequest::from_value(body.resources).map_err(api_error)?;
    let options = ExportOptions {
        append: body.append,
        skip_sentinels: body.skip_sentinels,
    };
    let output_dir =
        package_dir(&state.config.server.output_root, body.output_dir.as_deref()).map_err(api_error)?;
    tracing::info!(output = %output_dir.display(), "Creating seed package");

    let report = tokio::task::spawn_blocking(move || {
        service::export(&state.config, &state.registry, &request, &output_dir, options)
    })
    .await
    .map_err(join_error)?
    .map_err(api_error)?;

    Ok(Json(report))
}
