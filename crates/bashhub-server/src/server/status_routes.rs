//! Client status view.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::AppState;
use super::error::ApiError;
use super::middleware::Identity;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    process_id: Option<String>,
    start_time: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    username: String,
    total_commands: i64,
    total_sessions: i64,
    total_systems: i64,
    total_commands_today: i64,
    session_name: String,
    session_start_time: i64,
    session_total_commands: i64,
}

fn parse_int(name: &str, raw: Option<&str>) -> Result<i64, ApiError> {
    let raw = raw.unwrap_or_default();
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid {name}: {raw:?}")))
}

/// `GET /api/v1/client-view/status?processId=&startTime=`
#[instrument(skip_all, fields(user_id = identity.user_id))]
pub async fn status(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Json<StatusView>, ApiError> {
    let Query(query) = query?;
    let start_time = parse_int("startTime", query.start_time.as_deref())?;
    let process_id = parse_int("processId", query.process_id.as_deref())?;

    let counts = state.db.status(identity.user_id, process_id).await?;

    Ok(Json(StatusView {
        username: identity.username,
        total_commands: counts.total_commands,
        total_sessions: counts.total_sessions,
        total_systems: counts.total_systems,
        total_commands_today: counts.total_commands_today,
        session_name: process_id.to_string(),
        session_start_time: start_time,
        session_total_commands: counts.session_total_commands,
    }))
}
