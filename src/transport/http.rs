//! HTTP transport: an SSE stream per session plus a POST endpoint for
//! client messages.
//!
//! ## Endpoints
//!
//! - `GET /` - Service info
//! - `GET /health` - Liveness and open session count
//! - `GET /sse` - Open a session; the first event names the message endpoint
//! - `POST /messages?sessionId=<id>` - Send a JSON-RPC message to a session

use super::message::{route_message, RouteOutcome};
use super::stream::open_session;
use crate::error::Result;
use crate::registry::{SessionId, SessionMap, SessionRegistry};
use crate::server::Server;
use crate::SERVICE_NAME;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio_stream::StreamExt;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub const SSE_PATH: &str = "/sse";
pub const MESSAGES_PATH: &str = "/messages";
pub const HEALTH_PATH: &str = "/health";

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn SessionRegistry>,
    pub server: Arc<Server>,
}

impl AppState {
    /// State with a fresh multi-session registry.
    pub fn new(server: Arc<Server>) -> Self {
        Self {
            registry: Arc::new(SessionMap::new()),
            server,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Builds the router for the HTTP transport.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route(HEALTH_PATH, get(health))
        .route(SSE_PATH, get(sse_stream))
        .route(MESSAGES_PATH, post(post_message))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `addr` and serves until Ctrl-C.
pub async fn serve(addr: SocketAddr, server: Arc<Server>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Medium MCP server listening on {}", addr);
    info!("  Health: http://{}{}", addr, HEALTH_PATH);
    info!("  SSE: http://{}{}", addr, SSE_PATH);

    axum::serve(listener, build_router(AppState::new(server)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down gracefully..."),
        Err(e) => {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

async fn service_info() -> Json<serde_json::Value> {
    Json(json!({
        "name": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "description": "MCP Server for Medium API Integration",
        "endpoints": {
            "sse": SSE_PATH,
            "messages": MESSAGES_PATH,
            "health": HEALTH_PATH
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "timestamp": timestamp,
        "sessions": state.registry.len()
    }))
}

/// GET /sse - Open a session and stream its outbound messages.
///
/// The session lives as long as the response body: when the client goes
/// away, axum drops the stream and the session is deregistered.
async fn sse_stream(State(state): State<AppState>) -> Response {
    let session = match open_session(
        Arc::clone(&state.registry),
        &state.server,
        SessionId::generate(),
    ) {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to open SSE session: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    let endpoint = format!("{}?sessionId={}", MESSAGES_PATH, session.id());
    let first = tokio_stream::once(Ok::<_, Infallible>(
        Event::default().event("endpoint").data(endpoint),
    ));
    let messages = session.map(|msg| Ok(Event::default().event("message").data(msg)));

    Sse::new(first.chain(messages))
        .keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
        .into_response()
}

/// POST /messages - Route one JSON-RPC message to its session.
async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Response {
    match route_message(state.registry.as_ref(), query.session_id.as_deref(), &body).await {
        RouteOutcome::MissingSession => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing sessionId query parameter" })),
        )
            .into_response(),
        RouteOutcome::UnknownSession => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Session not found" })),
        )
            .into_response(),
        RouteOutcome::InvalidMessage(message) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
        }
        RouteOutcome::Replied(response) => (StatusCode::OK, Json(response)).into_response(),
        RouteOutcome::Accepted => (StatusCode::ACCEPTED, "Accepted").into_response(),
        RouteOutcome::Failed(message) => {
            error!("Error handling message: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message })),
            )
                .into_response()
        }
    }
}
