use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::{extract::State, http::StatusCode, response::IntoResponse, response::Response, Json};
use dlp_core::{FeedbackRecord, HistoryError};

/// POST /api/feedback – `{ type, rating, message, email }`.
/// A body that does not decode is answered with 400 like any other invalid feedback.
pub(crate) async fn feedback(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackRecord>, JsonRejection>,
) -> Response {
    let record = match payload {
        Ok(Json(record)) => record,
        Err(rejection) => {
            tracing::debug!(target: "dlp::gateway", error = %rejection, "Feedback body rejected");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": rejection.body_text() })),
            )
                .into_response();
        }
    };
    match state.history.save_feedback(record) {
        Ok(saved) => Json(serde_json::json!({ "status": "ok", "id": saved.id })).into_response(),
        Err(HistoryError::InvalidFeedback(reason)) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": reason })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(target: "dlp::history", error = %e, "Feedback save failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
