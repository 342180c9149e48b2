use crate::refresh::{RefreshCoordinator, RefreshError, RoundEntry};
use crate::registry::{Entity, EntityRegistry};
use crate::snapshot::{Snapshot, SnapshotReader};
use crate::status::StatusRecord;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Shared state for the server status API
pub struct ServersAppState {
    pub registry: Arc<EntityRegistry>,
    pub coordinator: Arc<RefreshCoordinator>,
    pub reader: SnapshotReader,
    /// Staleness threshold for status queries
    pub max_age: Duration,
}

/// Configured server list
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServersListResponse {
    pub servers: Vec<Entity>,
    #[serde(with = "ts_milliseconds")]
    pub last_update: DateTime<Utc>,
}

/// Forced refresh summary
#[derive(Serialize)]
pub struct PingResponse {
    pub results: Vec<RoundEntry>,
    /// Start of the round that produced `results`
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

/// Create server status API router
pub fn create_servers_router(state: Arc<ServersAppState>) -> Router {
    Router::new()
        .route("/api/servers", get(list_servers))
        .route("/api/servers/status", get(list_statuses))
        .route("/api/servers/:id/status", get(get_status))
        .route("/api/ping", get(ping_all))
        .with_state(state)
}

/// GET /api/servers - List all configured servers
async fn list_servers(State(state): State<Arc<ServersAppState>>) -> Json<ServersListResponse> {
    Json(ServersListResponse {
        servers: state.registry.list().to_vec(),
        last_update: Utc::now(),
    })
}

/// GET /api/servers/status - Current status of every server
///
/// Probes first if the cached data is older than the configured max age.
async fn list_statuses(
    State(state): State<Arc<ServersAppState>>,
) -> Result<Json<Snapshot>, ApiError> {
    state
        .coordinator
        .ensure_fresh(state.max_age)
        .await
        .map_err(ApiError::refresh("Failed to fetch server statuses"))?;

    Ok(Json(state.reader.get_snapshot()))
}

/// GET /api/servers/:id/status - Status of one server
async fn get_status(
    State(state): State<Arc<ServersAppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusRecord>, ApiError> {
    if state.registry.get(&id).is_none() {
        return Err(ApiError::NotFound(id));
    }

    state
        .coordinator
        .ensure_fresh(state.max_age)
        .await
        .map_err(ApiError::refresh("Failed to fetch server status"))?;

    let status = state
        .reader
        .get_status(&id)
        .ok_or_else(|| ApiError::NotFound(id))?;

    Ok(Json(status))
}

/// GET /api/ping - Force a refresh of every server
///
/// Joins the in-flight round instead of starting a second one.
async fn ping_all(
    State(state): State<Arc<ServersAppState>>,
) -> Result<Json<PingResponse>, ApiError> {
    let report = state
        .coordinator
        .force_refresh()
        .await
        .map_err(ApiError::refresh("Failed to ping servers"))?;

    Ok(Json(PingResponse {
        results: report.results.clone(),
        timestamp: report.started_at,
    }))
}

/// API error types
#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Refresh {
        context: &'static str,
        source: RefreshError,
    },
}

impl ApiError {
    fn refresh(context: &'static str) -> impl FnOnce(RefreshError) -> ApiError {
        move |source| ApiError::Refresh { context, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(id) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: "Server not found".to_string(),
                    message: format!("No server found with ID: {}", id),
                },
            ),
            ApiError::Refresh { context, source } => {
                error!(error = %source, "{}", context);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: context.to_string(),
                        message: source.to_string(),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
