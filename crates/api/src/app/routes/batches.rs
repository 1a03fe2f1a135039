use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use printsync_core::OperationType;
use printsync_infra::BatchRequest;
use printsync_infra::sync::ExpressEnable;

use crate::app::errors;
use crate::app::services::AppServices;

/// `POST /batches/{operation}`: run one window of `operation` over a shop.
///
/// `master-mirror` windows are taken from a dependent shop and copy prices
/// from the master listing.
pub async fn run_batch(
    Extension(services): Extension<Arc<AppServices>>,
    Path(operation): Path<String>,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection(rejection),
    };
    let operation = match operation.parse::<OperationType>() {
        Ok(op) => op,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "unknown_operation", e.to_string()),
    };

    tracing::info!(%operation, shop_id = %request.shop_id, offset = request.offset, "batch requested");

    let result = match operation {
        OperationType::PriceUpdate => services.orchestrator.run(request, &services.pricing).await,
        OperationType::ExpressEnable => services.orchestrator.run(request, &ExpressEnable).await,
        OperationType::MasterMirror => {
            services
                .propagator
                .mirror_batch(&request.shop_id, request.offset, request.limit)
                .await
        }
    };

    match result {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => errors::sync_error_to_response(e),
    }
}
