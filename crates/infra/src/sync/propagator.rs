//! Master → dependent price propagation.
//!
//! The master listing is authoritative: its prices are copied verbatim onto
//! each dependent listing, never recomputed. A dependent that already
//! matches costs no write and no ledger row.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use printsync_core::{OperationType, ProductId, ShopId};
use printsync_events::SyncEvent;

use super::context::SyncContext;
use super::group::{ProductLinks, PropagationGroup};
use super::orchestrator::BatchOrchestrator;
use super::transform::{MirrorMaster, mirror_patch};
use super::{BatchRequest, BatchSummary, ItemStatus, SkipReason, SyncError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropagationResult {
    pub dependent_shop: ShopId,
    pub dependent_product_id: Option<ProductId>,
    #[serde(flatten)]
    pub status: ItemStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropagationSummary {
    pub master_product_id: ProductId,
    pub written: u32,
    pub skipped: u32,
    pub errors: u32,
    pub results: Vec<PropagationResult>,
}

#[derive(Debug, Clone)]
pub struct CrossShopPropagator {
    orchestrator: BatchOrchestrator,
    group: PropagationGroup,
    links: Arc<dyn ProductLinks>,
}

impl CrossShopPropagator {
    pub fn new(
        orchestrator: BatchOrchestrator,
        group: PropagationGroup,
        links: Arc<dyn ProductLinks>,
    ) -> Self {
        Self {
            orchestrator,
            group,
            links,
        }
    }

    pub fn group(&self) -> &PropagationGroup {
        &self.group
    }

    fn ctx(&self) -> &SyncContext {
        self.orchestrator.context()
    }

    /// Push one master product's prices to every dependent shop.
    ///
    /// Only a failure to read the master aborts; dependents fail independently.
    pub async fn propagate(
        &self,
        master_product_id: &ProductId,
    ) -> Result<PropagationSummary, SyncError> {
        let ctx = self.ctx();
        let session = ctx.session();
        let master = session
            .get_product(self.group.master(), master_product_id)
            .await
            .map_err(|source| SyncError::MasterFetch {
                product_id: master_product_id.clone(),
                source,
            })?;

        let mut summary = PropagationSummary {
            master_product_id: master_product_id.clone(),
            written: 0,
            skipped: 0,
            errors: 0,
            results: Vec::with_capacity(self.group.dependents().len()),
        };

        for dependent_shop in self.group.dependents() {
            let linked = self.links.dependent_for(master_product_id, dependent_shop);
            let status = match &linked {
                None => ItemStatus::Skipped {
                    reason: SkipReason::DependentMissing,
                },
                Some(dependent_id) => match session.get_product(dependent_shop, dependent_id).await {
                    Err(e) if e.is_not_found() => ItemStatus::Skipped {
                        reason: SkipReason::DependentMissing,
                    },
                    Err(e) => ItemStatus::Failed {
                        error: e.to_string(),
                    },
                    Ok(dependent) => match mirror_patch(&master, &dependent) {
                        Err(e) => ItemStatus::Failed {
                            error: e.to_string(),
                        },
                        Ok(None) => ItemStatus::Skipped {
                            reason: SkipReason::AlreadyInSync,
                        },
                        Ok(Some((patch, changed_variants))) => {
                            match session.update_product(dependent_shop, dependent_id, &patch).await {
                                Err(e) => ItemStatus::Failed {
                                    error: e.to_string(),
                                },
                                Ok(()) => {
                                    ctx.ledger
                                        .mark_processed(
                                            dependent_id,
                                            dependent_shop,
                                            OperationType::MasterMirror,
                                            Some(json!({
                                                "master_product_id": master_product_id,
                                                "changed_variants": changed_variants,
                                            })),
                                        )
                                        .await;
                                    ItemStatus::Updated { changed_variants }
                                }
                            }
                        }
                    },
                },
            };

            self.emit(master_product_id, dependent_shop, linked.as_ref(), &status);
            match status {
                ItemStatus::Updated { .. } => summary.written += 1,
                ItemStatus::Skipped { .. } => summary.skipped += 1,
                ItemStatus::Failed { .. } => summary.errors += 1,
            }
            summary.results.push(PropagationResult {
                dependent_shop: dependent_shop.clone(),
                dependent_product_id: linked,
                status,
            });
        }

        Ok(summary)
    }

    /// Sweep one window of a dependent shop, mirroring each listing's master.
    pub async fn mirror_batch(
        &self,
        dependent_shop: &ShopId,
        offset: u64,
        limit: Option<u32>,
    ) -> Result<BatchSummary, SyncError> {
        if !self.group.is_dependent(dependent_shop) {
            return Err(SyncError::InvalidRequest(format!(
                "shop {dependent_shop} is not a dependent of master {}",
                self.group.master()
            )));
        }
        let transform = MirrorMaster::new(self.group.master().clone(), self.links.clone());
        let request = BatchRequest {
            shop_id: dependent_shop.clone(),
            offset,
            limit,
        };
        self.orchestrator.run(request, &transform).await
    }

    fn emit(
        &self,
        master_product_id: &ProductId,
        dependent_shop: &ShopId,
        dependent_product_id: Option<&ProductId>,
        status: &ItemStatus,
    ) {
        let master_product_id = master_product_id.clone();
        let dependent_shop = dependent_shop.clone();
        let event = match (status, dependent_product_id) {
            (ItemStatus::Updated { changed_variants }, Some(dependent_product_id)) => {
                SyncEvent::PropagationWritten {
                    master_product_id,
                    dependent_shop,
                    dependent_product_id: dependent_product_id.clone(),
                    changed_variants: *changed_variants,
                }
            }
            (ItemStatus::Skipped { reason }, _) => SyncEvent::PropagationSkipped {
                master_product_id,
                dependent_shop,
                reason: reason.to_string(),
            },
            (ItemStatus::Failed { error }, _) => SyncEvent::PropagationFailed {
                master_product_id,
                dependent_shop,
                error: error.clone(),
            },
            (ItemStatus::Updated { .. }, None) => return,
        };
        self.ctx().sink.emit(event);
    }
}
