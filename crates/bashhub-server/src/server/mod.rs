//! HTTP surface of the history server.

pub mod auth_routes;
pub mod command_routes;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod status_routes;
pub mod system_routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, patch, post};
use bashhub_core::DatabaseError;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::jwt::TOKEN_TTL_SECS;
use crate::auth::{JwtManager, generate_secret};
use crate::storage::HistoryDatabase;

pub use error::ApiError;
pub use extract::JsonObject;
pub use middleware::Identity;

/// Per-request deadline used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: HistoryDatabase,
    pub jwt: Arc<JwtManager>,
    pub request_timeout: Duration,
}

impl AppState {
    /// Load (or create) the signing secret and build the token manager.
    pub async fn new(db: HistoryDatabase, request_timeout: Duration) -> Result<Self, DatabaseError> {
        let secret = db.signing_secret(&generate_secret()).await?;
        info!("signing secret loaded");

        Ok(Self {
            jwt: Arc::new(JwtManager::new(secret.as_bytes(), TOKEN_TTL_SECS)),
            db,
            request_timeout,
        })
    }
}

/// Build the full router: public routes, token-protected routes, request
/// deadline and access logging.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/v1/command", post(command_routes::insert))
        .route("/api/v1/command/search", get(command_routes::search))
        .route(
            "/api/v1/command/{uuid}",
            get(command_routes::fetch).delete(command_routes::remove),
        )
        .route(
            "/api/v1/system",
            post(system_routes::register).get(system_routes::fetch),
        )
        .route("/api/v1/system/{mac}", patch(system_routes::update))
        .route("/api/v1/client-view/status", get(status_routes::status))
        .route("/api/v1/import", post(command_routes::import))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .route("/ping", get(auth_routes::ping))
        .route("/api/v1/login", post(auth_routes::login))
        .route("/api/v1/user", post(auth_routes::create_user))
        .merge(protected)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::enforce_deadline,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
