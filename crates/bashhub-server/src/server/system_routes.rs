//! System registration routes.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use tracing::{info, instrument};

use super::AppState;
use super::error::ApiError;
use super::extract::JsonObject;
use super::middleware::Identity;
use crate::storage::{NewSystem, System};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemRequest {
    #[serde(default)]
    mac: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    hostname: Option<String>,
    #[serde(default)]
    client_version: Option<String>,
}

/// `POST /api/v1/system`
#[instrument(skip_all, fields(user_id = identity.user_id))]
pub async fn register(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    JsonObject(body): JsonObject<SystemRequest>,
) -> Result<StatusCode, ApiError> {
    let mac = body
        .mac
        .as_deref()
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::BadRequest("mac required".into()))?;

    state
        .db
        .create_system(&NewSystem {
            user_id: identity.user_id,
            mac,
            name: body.name.as_deref(),
            hostname: body.hostname.as_deref(),
            client_version: body.client_version.as_deref(),
        })
        .await?;

    info!(%mac, name = ?body.name, "system registered");
    Ok(StatusCode::CREATED)
}

#[derive(Debug, Deserialize)]
pub struct SystemQuery {
    mac: Option<String>,
}

/// `GET /api/v1/system?mac=`
#[instrument(skip_all, fields(user_id = identity.user_id))]
pub async fn fetch(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    query: Result<Query<SystemQuery>, QueryRejection>,
) -> Result<Json<System>, ApiError> {
    let Query(query) = query?;
    let mac = query
        .mac
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::BadRequest("mac required".into()))?;

    Ok(Json(state.db.get_system(identity.user_id, &mac).await?))
}

/// `PATCH /api/v1/system/{mac}`
#[instrument(skip_all, fields(user_id = identity.user_id, %mac))]
pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(mac): Path<String>,
    JsonObject(body): JsonObject<SystemRequest>,
) -> Result<StatusCode, ApiError> {

    let rows = state
        .db
        .update_system(identity.user_id, &mac, body.hostname.as_deref())
        .await?;

    info!(rows, hostname = ?body.hostname, "system updated");
    Ok(StatusCode::OK)
}
