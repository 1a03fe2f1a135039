use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use printsync_infra::SyncError;

pub fn sync_error_to_response(err: SyncError) -> axum::response::Response {
    match err {
        SyncError::InvalidRequest(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_request", msg),
        e @ SyncError::PageFetch { .. } => {
            json_error(StatusCode::BAD_GATEWAY, "page_fetch_failed", e.to_string())
        }
        e @ SyncError::MasterFetch { .. } => {
            json_error(StatusCode::BAD_GATEWAY, "master_fetch_failed", e.to_string())
        }
    }
}

/// Any unreadable JSON body is a 400, whatever axum's own rejection status.
pub fn json_rejection(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
