//! Command history routes.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use bashhub_core::DatabaseError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument};

use super::AppState;
use super::error::ApiError;
use super::extract::JsonObject;
use super::middleware::Identity;
use crate::storage::search::{DEFAULT_LIMIT, has_control_chars};
use crate::storage::{ImportCommand, NewCommand, SearchParams};

/// Exit statuses worth keeping: success and interrupted (Ctrl-C).
const STORED_EXIT_STATUSES: [i64; 2] = [0, 130];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    uuid: String,
    command: String,
    created: i64,
    #[serde(default)]
    path: String,
    #[serde(default)]
    exit_status: i64,
    #[serde(default)]
    process_id: Option<i64>,
    #[serde(default)]
    process_start_time: Option<i64>,
}

/// `POST /api/v1/command`
///
/// Commands that failed for any reason other than an interrupt are
/// acknowledged but not stored.
#[instrument(skip_all, fields(user_id = identity.user_id))]
pub async fn insert(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    JsonObject(body): JsonObject<CommandRequest>,
) -> Result<StatusCode, ApiError> {
    if !STORED_EXIT_STATUSES.contains(&body.exit_status) {
        debug!(uuid = %body.uuid, exit_status = body.exit_status, "command not stored");
        return Ok(StatusCode::OK);
    }

    let rows = state
        .db
        .insert_command(&NewCommand {
            user_id: identity.user_id,
            uuid: &body.uuid,
            command: &body.command,
            path: &body.path,
            exit_status: body.exit_status,
            created: body.created,
            system_name: &identity.system_name,
            process_id: body.process_id,
            process_start_time: body.process_start_time,
        })
        .await?;

    debug!(uuid = %body.uuid, rows, "command stored");
    Ok(StatusCode::OK)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    limit: Option<String>,
    unique: Option<String>,
    path: Option<String>,
    query: Option<String>,
    system_name: Option<String>,
}

impl SearchQuery {
    fn into_params(self, user_id: i64) -> Result<SearchParams, ApiError> {
        for value in [&self.path, &self.query, &self.system_name]
            .into_iter()
            .flatten()
        {
            if has_control_chars(value) {
                return Err(ApiError::BadRequest(
                    "filter contains control characters".into(),
                ));
            }
        }

        if let Some(pattern) = self.query.as_deref().filter(|q| !q.is_empty()) {
            regex::Regex::new(pattern).map_err(|e| ApiError::BadRequest(e.to_string()))?;
        }

        let limit = self
            .limit
            .as_deref()
            .and_then(|l| l.parse::<i64>().ok())
            .unwrap_or(DEFAULT_LIMIT);

        Ok(SearchParams::new(user_id)
            .limit(limit)
            .unique(self.unique.as_deref() == Some("true"))
            .path(self.path.unwrap_or_default())
            .system_name(self.system_name.unwrap_or_default())
            .query(self.query.unwrap_or_default()))
    }
}

/// `GET /api/v1/command/search`
///
/// An empty result is the object `{}` rather than an empty array.
#[instrument(skip_all, fields(user_id = identity.user_id))]
pub async fn search(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let params = query.into_params(identity.user_id)?;

    let hits = state.db.search(&params).await?;
    debug!(rows = hits.len(), unique = params.unique, "search");

    if hits.is_empty() {
        return Ok(Json(json!({})).into_response());
    }
    Ok(Json(hits).into_response())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandView {
    command: String,
    path: String,
    created: i64,
    uuid: String,
    exit_status: i64,
    username: String,
    system_name: String,
    session_id: Option<String>,
    process_id: Option<i64>,
}

/// `GET /api/v1/command/{uuid}`
///
/// Lookup failures, including an unknown uuid, answer 400.
#[instrument(skip_all, fields(user_id = identity.user_id, %uuid))]
pub async fn fetch(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(uuid): Path<String>,
) -> Result<Json<CommandView>, ApiError> {
    let record = state
        .db
        .get_command(identity.user_id, &uuid)
        .await
        .map_err(|e| match e {
            DatabaseError::NotFound(message) => ApiError::BadRequest(message),
            other => ApiError::BadRequest(other.to_string()),
        })?;

    Ok(Json(CommandView {
        command: record.command,
        path: record.path,
        created: record.created,
        uuid: record.uuid,
        exit_status: record.exit_status,
        username: identity.username,
        system_name: record.system_name,
        session_id: record.process_id.map(|pid| pid.to_string()),
        process_id: record.process_id,
    }))
}

/// `DELETE /api/v1/command/{uuid}`
#[instrument(skip_all, fields(user_id = identity.user_id, %uuid))]
pub async fn remove(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(uuid): Path<String>,
) -> Result<StatusCode, ApiError> {
    let rows = state.db.delete_command(identity.user_id, &uuid).await?;
    info!(rows, "command deleted");
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    uuid: String,
    command: String,
    created: i64,
    #[serde(default)]
    path: String,
    #[serde(default)]
    exit_status: i64,
    #[serde(default)]
    system_name: String,
    #[serde(default)]
    session_id: Option<String>,
}

/// `POST /api/v1/import`
///
/// The owner is the token's user; repeated uuids are skipped.
#[instrument(skip_all, fields(user_id = identity.user_id))]
pub async fn import(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    JsonObject(body): JsonObject<ImportRequest>,
) -> Result<StatusCode, ApiError> {
    let rows = state
        .db
        .import_command(&ImportCommand {
            username: &identity.username,
            uuid: &body.uuid,
            command: &body.command,
            path: &body.path,
            exit_status: body.exit_status,
            created: body.created,
            system_name: &body.system_name,
            session_id: body.session_id.as_deref(),
        })
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    debug!(uuid = %body.uuid, rows, "command imported");
    Ok(StatusCode::OK)
}
