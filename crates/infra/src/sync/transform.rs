//! Per-item transforms plugged into the [`BatchOrchestrator`].
//!
//! A transform looks at one freshly fetched product and decides the desired
//! state: a patch to write, or a reason to leave it alone.
//!
//! [`BatchOrchestrator`]: super::BatchOrchestrator

use std::sync::Arc;

use async_trait::async_trait;

use printsync_core::{OperationType, Product, ProductPatch, ShopId};
use printsync_pricing::{PricingDecision, PricingPolicy};

use super::context::CatalogSession;
use super::group::ProductLinks;
use super::{ItemError, SkipReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    /// Write `patch`; `changed_variants` is reported in the summary.
    Patch {
        patch: ProductPatch,
        changed_variants: usize,
    },
    Skip(SkipReason),
}

#[async_trait]
pub trait ItemTransform: Send + Sync {
    /// Ledger key of the work this transform performs.
    fn operation(&self) -> OperationType;

    async fn desired_state(
        &self,
        shop_id: &ShopId,
        product: &Product,
        session: &CatalogSession<'_>,
    ) -> Result<TransformOutcome, ItemError>;
}

/// `price-update`: reprice variants whose margin drifted from the target.
#[derive(Debug, Clone)]
pub struct MarginPricing {
    policy: PricingPolicy,
}

impl MarginPricing {
    pub fn new(policy: PricingPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl ItemTransform for MarginPricing {
    fn operation(&self) -> OperationType {
        OperationType::PriceUpdate
    }

    async fn desired_state(
        &self,
        _shop_id: &ShopId,
        product: &Product,
        _session: &CatalogSession<'_>,
    ) -> Result<TransformOutcome, ItemError> {
        match self.policy.decide(product)? {
            PricingDecision::UnknownCategory(_) => Ok(TransformOutcome::Skip(SkipReason::UnknownCategory)),
            PricingDecision::AlreadyOptimal => Ok(TransformOutcome::Skip(SkipReason::AlreadyOptimal)),
            PricingDecision::Reprice { prices, changed } => Ok(TransformOutcome::Patch {
                patch: product.price_patch(&prices)?,
                changed_variants: changed,
            }),
        }
    }
}

/// `express-enable`: turn on express fulfilment where the catalog allows it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressEnable;

#[async_trait]
impl ItemTransform for ExpressEnable {
    fn operation(&self) -> OperationType {
        OperationType::ExpressEnable
    }

    async fn desired_state(
        &self,
        _shop_id: &ShopId,
        product: &Product,
        _session: &CatalogSession<'_>,
    ) -> Result<TransformOutcome, ItemError> {
        if !product.express_eligible {
            return Ok(TransformOutcome::Skip(SkipReason::NotEligible));
        }
        if product.express_enabled {
            return Ok(TransformOutcome::Skip(SkipReason::AlreadyOptimal));
        }
        Ok(TransformOutcome::Patch {
            patch: ProductPatch {
                variants: None,
                express_enabled: Some(true),
            },
            changed_variants: 0,
        })
    }
}

/// `master-mirror`: copy the master listing's prices onto a dependent one.
#[derive(Debug, Clone)]
pub struct MirrorMaster {
    master_shop: ShopId,
    links: Arc<dyn ProductLinks>,
}

impl MirrorMaster {
    pub fn new(master_shop: ShopId, links: Arc<dyn ProductLinks>) -> Self {
        Self { master_shop, links }
    }
}

#[async_trait]
impl ItemTransform for MirrorMaster {
    fn operation(&self) -> OperationType {
        OperationType::MasterMirror
    }

    async fn desired_state(
        &self,
        shop_id: &ShopId,
        product: &Product,
        session: &CatalogSession<'_>,
    ) -> Result<TransformOutcome, ItemError> {
        let Some(master_id) = self.links.master_for(&product.id, shop_id) else {
            return Ok(TransformOutcome::Skip(SkipReason::MasterMissing));
        };
        let master = match session.get_product(&self.master_shop, &master_id).await {
            Ok(master) => master,
            Err(e) if e.is_not_found() => return Ok(TransformOutcome::Skip(SkipReason::MasterMissing)),
            Err(e) => return Err(e.into()),
        };

        match mirror_patch(&master, product)? {
            Some((patch, changed_variants)) => Ok(TransformOutcome::Patch {
                patch,
                changed_variants,
            }),
            None => Ok(TransformOutcome::Skip(SkipReason::AlreadyOptimal)),
        }
    }
}

/// Patch giving `dependent` the master's prices, matched by variant position.
///
/// Variants beyond the master's list keep their price. `None` when nothing
/// would change.
pub fn mirror_patch(
    master: &Product,
    dependent: &Product,
) -> Result<Option<(ProductPatch, usize)>, ItemError> {
    let prices: Vec<_> = dependent
        .variants
        .iter()
        .enumerate()
        .map(|(i, v)| {
            master
                .variants
                .get(i)
                .map(|m| m.current_price)
                .unwrap_or(v.current_price)
        })
        .collect();

    let changed = dependent
        .variants
        .iter()
        .zip(&prices)
        .filter(|(v, price)| v.current_price != **price)
        .count();
    if changed == 0 {
        return Ok(None);
    }
    Ok(Some((dependent.price_patch(&prices)?, changed)))
}
