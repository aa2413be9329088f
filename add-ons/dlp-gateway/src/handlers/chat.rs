//! Chat handler: validates the message, runs it through `QueryProcessor`, and records the
//! exchange in the conversation log.
//!
//! The processor never fails; a gateway fault arrives here as a `System Error: ...` answer
//! and is returned with status 200 like any other answer.

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, response::Response, Json};

#[derive(serde::Deserialize)]
pub(crate) struct ChatRequest {
    #[serde(default)]
    message: String,
}

/// POST /api/chat – `{ "message": "..." }` → `{ "response", "sources", "outcome" }`.
pub(crate) async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    let message = req.message.trim();
    if message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Empty message" })),
        )
            .into_response();
    }

    tracing::info!(target: "dlp::gateway", chars = message.len(), "Chat request received");
    let resolution = state.processor.resolve_traced(message).await;

    // A failed history write never fails the chat response.
    if let Err(e) = state.history.save_exchange(message, &resolution.answer) {
        tracing::warn!(target: "dlp::history", error = %e, "History save failed");
    }

    Json(serde_json::json!({
        "response": resolution.answer,
        "sources": resolution.matched_keys,
        "outcome": resolution.outcome,
    }))
    .into_response()
}
