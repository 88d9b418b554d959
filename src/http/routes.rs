//! HTTP route definitions

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::matchmaking::{SessionDescriptor, SessionHandle, SessionQuery, SessionService};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = match state.config.client_origin.as_deref() {
        // Support multiple origins (comma-separated in CLIENT_ORIGIN)
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
                .collect();
            CorsLayer::new().allow_origin(allowed_origins)
        }
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
    .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/sessions", get(find_sessions_handler))
        .route("/sessions/join", post(join_session_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    characters: usize,
    observers: usize,
    hosted_session: Option<SessionHandle>,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        characters: state.arena.character_count(),
        observers: state.arena.observer_count(),
        hosted_session: state.hosted_session.clone(),
    })
}

// ============================================================================
// Session endpoints
// ============================================================================

#[derive(Deserialize)]
struct FindSessionsParams {
    match_type: Option<String>,
}

#[derive(Serialize)]
struct FindSessionsResponse {
    sessions: Vec<SessionDescriptor>,
}

async fn find_sessions_handler(
    State(state): State<AppState>,
    Query(params): Query<FindSessionsParams>,
) -> Result<Json<FindSessionsResponse>, AppError> {
    let mut sessions = state
        .sessions
        .service()
        .find_sessions(&SessionQuery::default())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if let Some(match_type) = params.match_type.as_deref() {
        sessions.retain(|s| s.match_type() == Some(match_type));
    }

    Ok(Json(FindSessionsResponse { sessions }))
}

async fn join_session_handler(
    State(state): State<AppState>,
) -> Result<Json<SessionDescriptor>, AppError> {
    state
        .sessions
        .join_game_session()
        .await
        .map(Json)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No session with match type {}",
                state.sessions.match_type()
            ))
        })
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
