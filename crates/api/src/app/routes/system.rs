use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use printsync_infra::CATALOG_API;

use crate::app::services::AppServices;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn rate_limits(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(services.limiter.usage(CATALOG_API))
}
