//! Shared collaborators of the sync components and the per-invocation
//! catalog session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use printsync_core::{Product, ProductId, ProductPage, ProductPatch, ShopId};
use printsync_events::EventSink;

use crate::catalog::{CATALOG_API, CatalogApi, CatalogError};
use crate::ledger::IdempotencyLedger;
use crate::rate_limit::{RateLimiter, RetryPolicy};

/// Everything an orchestrator or propagator needs; cheap to clone.
#[derive(Clone)]
pub struct SyncContext {
    pub catalog: Arc<dyn CatalogApi>,
    pub ledger: IdempotencyLedger,
    pub limiter: Arc<RateLimiter>,
    pub retry: RetryPolicy,
    pub pace_delay: Duration,
    pub sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("limiter", &self.limiter)
            .field("retry", &self.retry)
            .field("pace_delay", &self.pace_delay)
            .finish_non_exhaustive()
    }
}

impl SyncContext {
    pub fn session(&self) -> CatalogSession<'_> {
        CatalogSession {
            ctx: self,
            primed: AtomicBool::new(false),
        }
    }
}

/// Catalog access for one invocation.
///
/// Calls are sequential: each waits `pace_delay` after the previous one,
/// reserves a limiter slot and is retried per the retry policy.
pub struct CatalogSession<'a> {
    ctx: &'a SyncContext,
    primed: AtomicBool,
}

impl<'a> CatalogSession<'a> {
    async fn pace(&self) {
        let delay = self.ctx.pace_delay;
        if self.primed.swap(true, Ordering::SeqCst) && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    pub async fn list_products(
        &self,
        shop_id: &ShopId,
        page: u32,
        limit: u32,
    ) -> Result<ProductPage, CatalogError> {
        self.pace().await;
        let catalog: &dyn CatalogApi = &*self.ctx.catalog;
        self.ctx
            .limiter
            .with_retry(CATALOG_API, &self.ctx.retry, &*self.ctx.sink, move || {
                catalog.list_products(shop_id, page, limit)
            })
            .await
    }

    pub async fn get_product(
        &self,
        shop_id: &ShopId,
        product_id: &ProductId,
    ) -> Result<Product, CatalogError> {
        self.pace().await;
        let catalog: &dyn CatalogApi = &*self.ctx.catalog;
        self.ctx
            .limiter
            .with_retry(CATALOG_API, &self.ctx.retry, &*self.ctx.sink, move || {
                catalog.get_product(shop_id, product_id)
            })
            .await
    }

    pub async fn update_product(
        &self,
        shop_id: &ShopId,
        product_id: &ProductId,
        patch: &ProductPatch,
    ) -> Result<(), CatalogError> {
        self.pace().await;
        let catalog: &dyn CatalogApi = &*self.ctx.catalog;
        self.ctx
            .limiter
            .with_retry(CATALOG_API, &self.ctx.retry, &*self.ctx.sink, move || {
                catalog.update_product(shop_id, product_id, patch)
            })
            .await
    }
}
