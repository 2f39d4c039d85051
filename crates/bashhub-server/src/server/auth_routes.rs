//! Unauthenticated routes: ping, login and user registration.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use bashhub_core::DatabaseError;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use super::AppState;
use super::error::ApiError;
use super::extract::JsonObject;
use crate::auth::password::{hash_password_blocking, verify_password_blocking};

const MISSING_CREDENTIALS: &str = "missing Username or Password";
const INCORRECT_CREDENTIALS: &str = "incorrect Username or Password";

/// `GET /ping`
pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default, alias = "Username")]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    mac: Option<String>,
}

/// `POST /api/v1/login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<JsonObject<LoginRequest>, ApiError>,
) -> Result<Json<Value>, ApiError> {
    let Ok(JsonObject(body)) = payload else {
        return Err(ApiError::Unauthorized(MISSING_CREDENTIALS.into()));
    };
    if body.username.is_empty() || body.password.is_empty() {
        return Err(ApiError::Unauthorized(MISSING_CREDENTIALS.into()));
    }

    let user = match state.db.get_user_by_username(&body.username).await {
        Ok(user) => user,
        Err(DatabaseError::NotFound(_)) => {
            warn!(username = %body.username, "login for unknown user");
            return Err(ApiError::Unauthorized(INCORRECT_CREDENTIALS.into()));
        }
        Err(e) => return Err(e.into()),
    };

    if !verify_password_blocking(body.password, user.password).await? {
        warn!(username = %body.username, "login with wrong password");
        return Err(ApiError::Unauthorized(INCORRECT_CREDENTIALS.into()));
    }

    let system_name = match body.mac.as_deref() {
        Some(mac) if !mac.is_empty() => state
            .db
            .system_name_for(&body.username, mac)
            .await?
            .unwrap_or_default(),
        _ => String::new(),
    };

    let user_id = u64::try_from(user.id)
        .map_err(|_| ApiError::Internal(format!("invalid user id {}", user.id)))?;
    let token = state
        .jwt
        .issue(&user.username, &system_name, user_id)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!(username = %user.username, system_name = %system_name, "login");
    Ok(Json(json!({ "accessToken": token })))
}

#[derive(Debug, Deserialize)]
pub struct NewUserRequest {
    #[serde(default, rename = "Username", alias = "username")]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default, rename = "registrationCode")]
    registration_code: Option<String>,
}

/// `POST /api/v1/user`
#[instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    JsonObject(body): JsonObject<NewUserRequest>,
) -> Result<StatusCode, ApiError> {

    if body.email.is_empty() {
        return Err(ApiError::BadRequest("email required".into()));
    }
    if body.username.is_empty() {
        return Err(ApiError::BadRequest("Username required".into()));
    }
    if body.password.is_empty() {
        return Err(ApiError::BadRequest("password required".into()));
    }
    if state.db.username_exists(&body.username).await? {
        return Err(ApiError::Conflict("Username already taken".into()));
    }
    if state.db.email_exists(&body.email).await? {
        return Err(ApiError::Conflict(
            "This email address is already registered.".into(),
        ));
    }

    let hash = hash_password_blocking(body.password).await?;
    let created = state
        .db
        .create_user(
            &body.username,
            &body.email,
            &hash,
            body.registration_code.as_deref(),
        )
        .await?;
    if !created {
        return Err(ApiError::Conflict("Username already taken".into()));
    }

    info!(username = %body.username, "user created");
    Ok(StatusCode::OK)
}
