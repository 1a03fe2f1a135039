//! Batch synchronization: the orchestrator, its per-item transforms, the
//! cross-shop propagator and the webhook router.

pub mod context;
pub mod group;
pub mod orchestrator;
pub mod propagator;
pub mod router;
pub mod transform;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use printsync_core::{DomainError, OperationType, ProductId, ShopId};
use printsync_pricing::PricingError;

use crate::catalog::CatalogError;

pub use context::{CatalogSession, SyncContext};
pub use group::{ProductLinks, PropagationGroup, SharedIdLinks};
pub use orchestrator::BatchOrchestrator;
pub use propagator::{CrossShopPropagator, PropagationResult, PropagationSummary};
pub use router::{NotificationOutcome, NotificationRouter};
pub use transform::{ExpressEnable, ItemTransform, MarginPricing, MirrorMaster, TransformOutcome};

/// Failures that abort a whole invocation. Per-item failures never do.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyncError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to fetch page {page} of shop {shop_id}: {source}")]
    PageFetch {
        shop_id: ShopId,
        page: u32,
        #[source]
        source: CatalogError,
    },

    #[error("failed to fetch master product {product_id}: {source}")]
    MasterFetch {
        product_id: ProductId,
        #[source]
        source: CatalogError,
    },
}

/// Failure while handling one entity; recorded, counted, never fatal.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ItemError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Why an entity was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    AlreadyProcessed,
    NotFound,
    UnknownCategory,
    AlreadyOptimal,
    NotEligible,
    MasterMissing,
    DependentMissing,
    AlreadyInSync,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::AlreadyProcessed => "already-processed",
            SkipReason::NotFound => "not-found",
            SkipReason::UnknownCategory => "unknown-category",
            SkipReason::AlreadyOptimal => "already-optimal",
            SkipReason::NotEligible => "not-eligible",
            SkipReason::MasterMissing => "master-missing",
            SkipReason::DependentMissing => "dependent-missing",
            SkipReason::AlreadyInSync => "already-in-sync",
        }
    }
}

impl core::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input of one batch invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub shop_id: ShopId,
    #[serde(default)]
    pub offset: u64,
    /// Window size; the orchestrator's page size when absent.
    #[serde(default)]
    pub limit: Option<u32>,
}

impl BatchRequest {
    pub fn new(shop_id: ShopId, offset: u64, limit: u32) -> Self {
        Self {
            shop_id,
            offset,
            limit: Some(limit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Updated { changed_variants: usize },
    Skipped { reason: SkipReason },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemResult {
    pub product_id: ProductId,
    #[serde(flatten)]
    pub status: ItemStatus,
}

/// Result of one batch invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub run_id: uuid::Uuid,
    pub operation: OperationType,
    pub shop_id: ShopId,
    pub updated_count: u32,
    /// Includes `already_processed_count`.
    pub skipped_count: u32,
    pub already_processed_count: u32,
    pub error_count: u32,
    pub next_offset: u64,
    pub has_more: bool,
    /// "done/total" over the whole collection.
    pub progress: String,
    pub total: u64,
    pub results: Vec<ItemResult>,
}
