//! HTTP command ingress.
//!
//! Lets the REST back-end push commands into the hub without holding a
//! socket open:
//!
//! - `POST /internal/command`    → robot partition
//! - `POST /internal/ai-command` → AI partition
//! - `GET  /health`              → partition counts
//!
//! Bodies are relayed verbatim apart from the `type` default on AI
//! commands. Anything that is not a JSON object is a `400`.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use relay_core::Role;
use relay_protocol::wire_types::{MSG_AI_COMMAND_SENT, MSG_COMMAND_SENT};
use relay_protocol::Timestamp;
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::dispatch::Dispatcher;

#[derive(Debug, Clone)]
struct HttpState {
    dispatcher: Dispatcher,
}

pub fn router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .route("/internal/command", post(robot_command))
        .route("/internal/ai-command", post(ai_command))
        .route("/health", get(health))
        .with_state(HttpState { dispatcher })
}

/// Serve `router` on an already bound listener until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("http listener stopped");
    Ok(())
}

async fn robot_command(State(state): State<HttpState>, body: Bytes) -> Response {
    let command = match json_object(&body) {
        Ok(command) => command,
        Err(rejection) => return rejection,
    };

    let command_id = first_of(&command, &["commandId", "command_id"]);
    let report = state
        .dispatcher
        .broadcast(Role::Robot, &Value::Object(command))
        .await;
    info!(command_id = %command_id, robots = report.delivered, "http robot command relayed");

    Json(json!({
        "success": true,
        "message": MSG_COMMAND_SENT,
        "command_id": command_id,
        "delivered": report.delivered,
    }))
    .into_response()
}

async fn ai_command(State(state): State<HttpState>, body: Bytes) -> Response {
    let mut command = match json_object(&body) {
        Ok(command) => command,
        Err(rejection) => return rejection,
    };

    command
        .entry("type")
        .or_insert_with(|| Value::from("ai_request"));

    let request_id = first_of(&command, &["request_id", "requestId"]);
    let report = state
        .dispatcher
        .broadcast(Role::Ai, &Value::Object(command))
        .await;
    info!(request_id = %request_id, ais = report.delivered, "http ai command relayed");

    Json(json!({
        "success": true,
        "message": MSG_AI_COMMAND_SENT,
        "request_id": request_id,
        "delivered": report.delivered,
    }))
    .into_response()
}

async fn health(State(state): State<HttpState>) -> Json<Value> {
    let counts = state.dispatcher.registry().counts().await;
    Json(json!({
        "status": "healthy",
        "timestamp": Timestamp::now(),
        "robots": counts.robots,
        "ais": counts.ais,
        "frontends": counts.frontends,
    }))
}

fn json_object(body: &[u8]) -> Result<Map<String, Value>, Response> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(bad_request("expected a JSON object")),
        Err(e) => {
            debug!(error = %e, "rejected http body");
            Err(bad_request(format!("invalid JSON: {}", e)))
        }
    }
}

fn bad_request(error: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": error.into() }))).into_response()
}

fn first_of(map: &Map<String, Value>, keys: &[&str]) -> Value {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(Value::Null)
}
