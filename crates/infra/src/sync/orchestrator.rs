//! Paginated, rate-limited, idempotent batch runs.
//!
//! One invocation covers the window `[offset, offset + limit)` of a shop's
//! product collection:
//!
//! 1. fetch the upstream pages overlapping the window (fatal on failure)
//! 2. per entity: ledger check, detail fetch, transform, write, ledger mark
//! 3. report counts and the cursor for the next invocation
//!
//! Per-entity failures are isolated and counted. The orchestrator never
//! schedules the next window itself; callers re-invoke with `next_offset`
//! while `has_more` is true.

use serde_json::json;
use uuid::Uuid;

use printsync_core::{OperationType, ProductSummary, ShopId};
use printsync_events::SyncEvent;

use super::context::{CatalogSession, SyncContext};
use super::transform::{ItemTransform, TransformOutcome};
use super::{BatchRequest, BatchSummary, ItemResult, ItemStatus, SkipReason, SyncError};
use crate::config::MAX_BATCH_LIMIT;

#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    ctx: SyncContext,
    page_size: u32,
    upstream_page_size: u32,
}

impl BatchOrchestrator {
    pub fn new(ctx: SyncContext, page_size: u32, upstream_page_size: u32) -> Self {
        Self {
            ctx,
            page_size,
            upstream_page_size: upstream_page_size.max(1),
        }
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    pub async fn run(
        &self,
        request: BatchRequest,
        transform: &dyn ItemTransform,
    ) -> Result<BatchSummary, SyncError> {
        let operation = transform.operation();
        let shop_id = request.shop_id;
        let offset = request.offset;
        let limit = request.limit.unwrap_or(self.page_size);
        if limit == 0 || limit > MAX_BATCH_LIMIT {
            return Err(SyncError::InvalidRequest(format!(
                "limit must be in 1..={MAX_BATCH_LIMIT}, got {limit}"
            )));
        }
        let Some(end) = offset.checked_add(u64::from(limit)) else {
            return Err(SyncError::InvalidRequest(format!(
                "offset {offset} is out of range"
            )));
        };

        let run_id = Uuid::now_v7();
        self.ctx.sink.emit(SyncEvent::BatchStarted {
            run_id,
            operation,
            shop_id: shop_id.clone(),
            offset,
            limit,
        });

        let session = self.ctx.session();
        let (window, total) = match self.fetch_window(&session, &shop_id, offset, end).await {
            Ok(found) => found,
            Err(err) => {
                self.ctx.sink.emit(SyncEvent::BatchAborted {
                    run_id,
                    operation,
                    shop_id: shop_id.clone(),
                    error: err.to_string(),
                });
                return Err(err);
            }
        };

        let mut summary = BatchSummary {
            run_id,
            operation,
            shop_id: shop_id.clone(),
            updated_count: 0,
            skipped_count: 0,
            already_processed_count: 0,
            error_count: 0,
            next_offset: end,
            has_more: end < total,
            progress: format!("{}/{}", end.min(total), total),
            total,
            results: Vec::with_capacity(window.len()),
        };

        for item in window {
            let status = self
                .process_item(&session, run_id, &shop_id, &item, transform)
                .await;
            match &status {
                ItemStatus::Updated { .. } => summary.updated_count += 1,
                ItemStatus::Skipped { reason } => {
                    summary.skipped_count += 1;
                    if *reason == SkipReason::AlreadyProcessed {
                        summary.already_processed_count += 1;
                    }
                }
                ItemStatus::Failed { .. } => summary.error_count += 1,
            }
            summary.results.push(ItemResult {
                product_id: item.id,
                status,
            });
        }

        self.ctx.sink.emit(SyncEvent::BatchCompleted {
            run_id,
            operation,
            shop_id,
            updated: summary.updated_count,
            skipped: summary.skipped_count,
            already_processed: summary.already_processed_count,
            errors: summary.error_count,
            next_offset: summary.next_offset,
            has_more: summary.has_more,
        });
        Ok(summary)
    }

    /// Listing entries in `[offset, end)` plus the collection size.
    async fn fetch_window(
        &self,
        session: &CatalogSession<'_>,
        shop_id: &ShopId,
        offset: u64,
        end: u64,
    ) -> Result<(Vec<ProductSummary>, u64), SyncError> {
        let per_page = u64::from(self.upstream_page_size);
        let first_page = offset / per_page + 1;
        let last_page_needed = (end - 1) / per_page + 1;

        let mut collected = Vec::new();
        let mut total = 0;
        let mut page = first_page;
        while page <= last_page_needed {
            let page_no = u32::try_from(page).map_err(|_| {
                SyncError::InvalidRequest(format!("offset {offset} is out of range"))
            })?;
            let fetched = session
                .list_products(shop_id, page_no, self.upstream_page_size)
                .await
                .map_err(|source| SyncError::PageFetch {
                    shop_id: shop_id.clone(),
                    page: page_no,
                    source,
                })?;
            total = fetched.total;
            let exhausted = fetched.products.is_empty() || fetched.current_page >= fetched.last_page;
            collected.extend(fetched.products);
            if exhausted {
                break;
            }
            page += 1;
        }

        let skip = (offset - (first_page - 1) * per_page) as usize;
        let window = collected
            .into_iter()
            .skip(skip)
            .take((end - offset) as usize)
            .collect();
        Ok((window, total))
    }

    async fn process_item(
        &self,
        session: &CatalogSession<'_>,
        run_id: Uuid,
        shop_id: &ShopId,
        item: &ProductSummary,
        transform: &dyn ItemTransform,
    ) -> ItemStatus {
        let operation = transform.operation();
        let status = self
            .process_item_inner(session, run_id, shop_id, item, transform)
            .await;
        self.emit_item(run_id, operation, shop_id, item, &status);
        status
    }

    async fn process_item_inner(
        &self,
        session: &CatalogSession<'_>,
        run_id: Uuid,
        shop_id: &ShopId,
        item: &ProductSummary,
        transform: &dyn ItemTransform,
    ) -> ItemStatus {
        let operation = transform.operation();
        let ledger = &self.ctx.ledger;

        if ledger.is_processed(&item.id, shop_id, operation).await {
            return skipped(SkipReason::AlreadyProcessed);
        }

        let product = match session.get_product(shop_id, &item.id).await {
            Ok(product) => product,
            Err(e) if e.is_not_found() => return skipped(SkipReason::NotFound),
            Err(e) => return failed(e),
        };

        let (patch, changed_variants) = match transform.desired_state(shop_id, &product, session).await {
            Ok(TransformOutcome::Patch {
                patch,
                changed_variants,
            }) => (patch, changed_variants),
            Ok(TransformOutcome::Skip(reason)) => return skipped(reason),
            Err(e) => return failed(e),
        };

        if let Err(e) = session.update_product(shop_id, &product.id, &patch).await {
            return failed(e);
        }

        // The write landed; a failed mark only costs a redundant re-check later.
        ledger
            .mark_processed(
                &product.id,
                shop_id,
                operation,
                Some(json!({
                    "run_id": run_id,
                    "changed_variants": changed_variants,
                })),
            )
            .await;

        ItemStatus::Updated { changed_variants }
    }

    fn emit_item(
        &self,
        run_id: Uuid,
        operation: OperationType,
        shop_id: &ShopId,
        item: &ProductSummary,
        status: &ItemStatus,
    ) {
        let shop_id = shop_id.clone();
        let product_id = item.id.clone();
        let event = match status {
            ItemStatus::Updated { changed_variants } => SyncEvent::ItemUpdated {
                run_id,
                operation,
                shop_id,
                product_id,
                changed_variants: *changed_variants,
            },
            ItemStatus::Skipped { reason } => SyncEvent::ItemSkipped {
                run_id,
                operation,
                shop_id,
                product_id,
                reason: reason.to_string(),
            },
            ItemStatus::Failed { error } => SyncEvent::ItemFailed {
                run_id,
                operation,
                shop_id,
                product_id,
                error: error.clone(),
            },
        };
        self.ctx.sink.emit(event);
    }
}

fn skipped(reason: SkipReason) -> ItemStatus {
    ItemStatus::Skipped { reason }
}

fn failed(err: impl std::fmt::Display) -> ItemStatus {
    ItemStatus::Failed {
        error: err.to_string(),
    }
}
