// smsmerge Server - HTTP front end
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! HTTP routes and handlers

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use smsmerge::{EngineError, EngineHandle, Message};
use tracing::{debug, error, warn};

use crate::error::ServerError;
use crate::metrics::{encode_metrics, record_send, update_engine_metrics, SendOutcome};

/// Application state shared across handlers.
pub struct AppState {
    pub engine: EngineHandle,
    pub started: Instant,
}

impl AppState {
    pub fn new(engine: EngineHandle) -> Self {
        Self {
            engine,
            started: Instant::now(),
        }
    }
}

/// Build the router with all routes
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/send", any(send_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/status", get(status_handler))
        .with_state(Arc::new(state))
}

/// JSON body of `POST /send`; absent fields are empty
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SendRequest {
    originator: String,
    recipient: String,
    body: String,
}

/// Plain-text error response terminated by a newline
fn reject(status: StatusCode, outcome: SendOutcome, reason: impl std::fmt::Display) -> Response {
    record_send(outcome);
    (status, format!("{}\n", reason)).into_response()
}

/// Send handler - validates and enqueues one message.
async fn send_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    if method != Method::POST {
        warn!("Wrong method - {}", method);
        return reject(
            StatusCode::BAD_REQUEST,
            SendOutcome::WrongMethod,
            "wrong method for uri",
        );
    }

    let body = match body {
        Ok(body) => body,
        Err(e) => {
            warn!("Error reading request - {}", e);
            return reject(
                StatusCode::BAD_REQUEST,
                SendOutcome::ReadError,
                "error reading request",
            );
        }
    };

    let req: SendRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            warn!("Error parsing request - {}", e);
            return reject(
                StatusCode::BAD_REQUEST,
                SendOutcome::ParseError,
                "error parsing request",
            );
        }
    };

    let msg = match Message::new(req.originator, req.recipient, req.body) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Error validating request - {}", e);
            return reject(StatusCode::BAD_REQUEST, SendOutcome::Invalid, e);
        }
    };

    debug!("Accepted {}", msg);
    match enqueue(&state.engine, msg).await {
        Ok(()) => {
            record_send(SendOutcome::Accepted);
            StatusCode::OK.into_response()
        }
        Err(ServerError::Engine(EngineError::Closed)) => reject(
            StatusCode::SERVICE_UNAVAILABLE,
            SendOutcome::Unavailable,
            "service shutting down",
        ),
        Err(e) => {
            error!("Error enqueueing message - {}", e);
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                SendOutcome::InternalError,
                "internal error",
            )
        }
    }
}

/// Run the enqueue in its own task so a dropped connection cannot cancel it
/// halfway through.
async fn enqueue(engine: &EngineHandle, msg: Message) -> Result<(), ServerError> {
    let engine = engine.clone();
    tokio::spawn(async move { engine.enqueue(msg).await }).await??;
    Ok(())
}

/// Health check handler - 503 once the engine has stopped.
async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    if state.engine.is_closed() {
        return (StatusCode::SERVICE_UNAVAILABLE, "engine stopped\n").into_response();
    }
    (StatusCode::OK, "OK").into_response()
}

/// Metrics handler - returns Prometheus text format.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    update_engine_metrics(&state.engine);
    match encode_metrics() {
        Ok(metrics) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4; charset=utf-8")],
            metrics,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics - {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{}\n", e)).into_response()
        }
    }
}

/// Status information response.
#[derive(Debug, Serialize, Deserialize)]
struct StatusResponse {
    version: String,
    uptime_secs: u64,
    pending_groups: usize,
    pending_messages: usize,
    queue_depth: usize,
}

/// Status handler - returns JSON status information.
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started.elapsed().as_secs(),
        pending_groups: state.engine.pending_groups(),
        pending_messages: state.engine.pending_messages(),
        queue_depth: state.engine.queue_depth(),
    })
}
