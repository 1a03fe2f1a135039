use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Request},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::services::AppServices;

/// Largest notification body that is read; real deliveries are a few hundred bytes.
pub const MAX_NOTIFICATION_BYTES: usize = 256 * 1024;

/// Always acknowledged: the sender redelivers anything that is not a 200.
/// Oversized or unreadable bodies are reported as ignored.
pub async fn catalog_notification(
    Extension(services): Extension<Arc<AppServices>>,
    request: Request,
) -> impl IntoResponse {
    let outcome = match axum::body::to_bytes(request.into_body(), MAX_NOTIFICATION_BYTES).await {
        Ok(body) => services.notifications.handle(&body).await,
        Err(e) => services
            .notifications
            .ignore("malformed", format!("unreadable body (limit {MAX_NOTIFICATION_BYTES} bytes): {e}")),
    };
    (StatusCode::OK, Json(outcome))
}
