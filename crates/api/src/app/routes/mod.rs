use axum::{
    Router,
    routing::{get, post},
};

pub mod batches;
pub mod ledger;
pub mod propagation;
pub mod system;
pub mod webhooks;

/// Router for every engine endpoint.
pub fn router() -> Router {
    Router::new()
        .route("/batches/:operation", post(batches::run_batch))
        .route("/propagations", post(propagation::propagate))
        .route("/webhooks/catalog", post(webhooks::catalog_notification))
        .route("/ledger/reset", post(ledger::reset))
        .route("/rate-limits", get(system::rate_limits))
}
