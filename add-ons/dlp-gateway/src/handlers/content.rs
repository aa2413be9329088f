//! Read-only content endpoints for the UI.

use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

const DEFAULT_HISTORY_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 200;

/// GET /api/guidelines
pub(crate) async fn guidelines() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "guidelines": dlp_core::guidelines() }))
}

/// GET /api/legal-references
pub(crate) async fn legal_references() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "references": dlp_core::legal_references() }))
}

#[derive(serde::Deserialize)]
pub(crate) struct HistoryQuery {
    limit: Option<usize>,
}

/// GET /api/history?limit=N – most recent exchanges, newest first.
pub(crate) async fn history(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let limit = q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).min(MAX_HISTORY_LIMIT);
    let exchanges = state.history.recent_exchanges(limit).map_err(|e| {
        tracing::error!(target: "dlp::history", error = %e, "History read failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(serde_json::json!({ "history": exchanges })))
}
