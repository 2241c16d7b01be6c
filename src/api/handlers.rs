//! HTTP request handlers

use super::sse::turn_stream;
use super::types::{ChatRequest, ChatResponse, ErrorResponse, HealthResponse, TranscriptResponse};
use super::AppState;
use crate::session::SessionError;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::sync::mpsc;

const MESSAGE_REQUIRED: &str = "Message is required";
const AGENT_BUSY: &str = "Agent is busy with another message";
const INTERNAL_ERROR: &str = "Internal server error";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(send_chat))
        .route("/api/chat/stream", post(stream_chat))
        .route("/api/transcript", get(get_transcript))
        .route("/api/health", get(health))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Chat
// ============================================================

/// Pull the message out of the body; malformed JSON is the same as no message
fn message_text(payload: Result<Json<ChatRequest>, JsonRejection>) -> Result<String, AppError> {
    let Json(request) = payload.map_err(|e| {
        tracing::debug!(error = %e, "Rejected chat body");
        AppError::BadRequest
    })?;
    request
        .text()
        .map(str::to_string)
        .ok_or(AppError::BadRequest)
}

async fn send_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let text = message_text(payload)?;

    // The turn runs to completion even if the client disconnects
    let controller = state.controller.clone();
    let turn = tokio::spawn(async move { controller.handle_turn(&text).await });
    let result = turn.await.map_err(|e| {
        tracing::error!(error = %e, "Turn task panicked");
        AppError::Internal
    })??;

    Ok(Json(ChatResponse {
        response: result.text,
    }))
}

async fn stream_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let text = message_text(payload)?;
    let (tx, rx) = mpsc::unbounded_channel();

    // The turn runs to completion even if the client disconnects
    let controller = state.controller.clone();
    let turn = tokio::spawn(async move { controller.handle_turn_streaming(&text, tx).await });

    Ok(turn_stream(rx, turn).into_response())
}

// ============================================================
// Introspection
// ============================================================

async fn get_transcript(State(state): State<AppState>) -> Json<TranscriptResponse> {
    Json(TranscriptResponse {
        session_id: state.controller.session_id(),
        messages: state.controller.transcript(),
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn get_version() -> &'static str {
    concat!("onchain-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

/// Client-facing error. Details stay in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AppError {
    BadRequest,
    Busy,
    Internal,
}

impl AppError {
    pub(super) fn status(self) -> StatusCode {
        match self {
            AppError::BadRequest => StatusCode::BAD_REQUEST,
            AppError::Busy => StatusCode::CONFLICT,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(super) fn message(self) -> &'static str {
        match self {
            AppError::BadRequest => MESSAGE_REQUIRED,
            AppError::Busy => AGENT_BUSY,
            AppError::Internal => INTERNAL_ERROR,
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidRequest => AppError::BadRequest,
            SessionError::SessionBusy => AppError::Busy,
            SessionError::InitializationFailure(_)
            | SessionError::TurnBudgetExceeded { .. }
            | SessionError::TurnExecutionFailure(_) => AppError::Internal,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse::new(self.message()));
        (self.status(), body).into_response()
    }
}
