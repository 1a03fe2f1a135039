use serde::Deserialize;

use printsync_core::{OperationType, ProductId, ShopId};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct PropagateRequest {
    pub product_id: ProductId,
}

#[derive(Debug, Deserialize)]
pub struct LedgerResetRequest {
    pub shop_id: ShopId,
    #[serde(default)]
    pub operation: Option<OperationType>,
}
