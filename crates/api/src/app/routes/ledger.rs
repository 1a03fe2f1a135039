use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Forget processed records of a shop so the next batch repeats them.
pub async fn reset(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::LedgerResetRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection(rejection),
    };

    match services
        .ledger
        .reset_processed(&body.shop_id, body.operation)
        .await
    {
        Ok(deleted) => (StatusCode::OK, Json(json!({ "deleted": deleted }))).into_response(),
        Err(e) => errors::json_error(StatusCode::SERVICE_UNAVAILABLE, "ledger_unavailable", e.to_string()),
    }
}
