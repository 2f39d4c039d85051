//! Bearer token authentication and request deadlines.

use axum::extract::{Query, Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use super::AppState;
use super::error::ApiError;

/// The authenticated caller, inserted into request extensions by
/// [`require_auth`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub system_name: String,
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Find the token in the `Authorization: Bearer` header, then the `token`
/// query parameter, then the `jwt` cookie.
fn find_token(req: &Request) -> Option<String> {
    let headers = req.headers();
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(token.trim().to_string());
    }

    if let Some(token) = Query::<TokenQuery>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty())
    {
        return Some(token);
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| pair.trim().strip_prefix("jwt=").map(str::to_string))
        .filter(|t| !t.is_empty())
}

/// Reject requests without a valid token for a user that still exists.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token =
        find_token(&req).ok_or_else(|| ApiError::Unauthorized("auth header is empty".into()))?;

    let claims = state.jwt.validate(&token).map_err(|e| {
        debug!(error = %e, "token rejected");
        ApiError::Unauthorized(e.to_string())
    })?;

    let user_id = i64::try_from(claims.user_id)
        .map_err(|_| ApiError::Unauthorized("invalid user id".into()))?;

    if !state.db.username_exists(&claims.username).await? {
        warn!(username = %claims.username, "token for unknown user");
        return Err(ApiError::Unauthorized(
            "you don't have permission to access this resource".into(),
        ));
    }

    req.extensions_mut().insert(Identity {
        user_id,
        username: claims.username,
        system_name: claims.system_name,
    });
    Ok(next.run(req).await)
}

/// Fail requests that outlive the configured deadline with a 500.
pub async fn enforce_deadline(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    match tokio::time::timeout(state.request_timeout, next.run(req)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(%path, timeout = ?state.request_timeout, "request timed out");
            ApiError::Internal("request timed out".into()).into_response()
        }
    }
}
