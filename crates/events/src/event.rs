use serde::Serialize;
use uuid::Uuid;

use printsync_core::{OperationType, ProductId, ShopId};

/// How loudly a sink should report an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

/// A fact observed by the engine.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **flat** (only ids, counters and rendered error strings)
/// - for observability only; nothing reads them back to make decisions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    BatchStarted {
        run_id: Uuid,
        operation: OperationType,
        shop_id: ShopId,
        offset: u64,
        limit: u32,
    },
    ItemSkipped {
        run_id: Uuid,
        operation: OperationType,
        shop_id: ShopId,
        product_id: ProductId,
        reason: String,
    },
    ItemUpdated {
        run_id: Uuid,
        operation: OperationType,
        shop_id: ShopId,
        product_id: ProductId,
        changed_variants: usize,
    },
    ItemFailed {
        run_id: Uuid,
        operation: OperationType,
        shop_id: ShopId,
        product_id: ProductId,
        error: String,
    },
    BatchCompleted {
        run_id: Uuid,
        operation: OperationType,
        shop_id: ShopId,
        updated: u32,
        skipped: u32,
        already_processed: u32,
        errors: u32,
        next_offset: u64,
        has_more: bool,
    },
    BatchAborted {
        run_id: Uuid,
        operation: OperationType,
        shop_id: ShopId,
        error: String,
    },
    LedgerDegraded {
        action: &'static str,
        operation: OperationType,
        shop_id: ShopId,
        entity_id: ProductId,
        error: String,
    },
    Throttled {
        api: String,
        retry_after_ms: u64,
    },
    RetryScheduled {
        api: String,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    CostTableWarning {
        message: String,
    },
    NotificationIgnored {
        kind: String,
        reason: String,
    },
    PropagationSkipped {
        master_product_id: ProductId,
        dependent_shop: ShopId,
        reason: String,
    },
    PropagationWritten {
        master_product_id: ProductId,
        dependent_shop: ShopId,
        dependent_product_id: ProductId,
        changed_variants: usize,
    },
    PropagationFailed {
        master_product_id: ProductId,
        dependent_shop: ShopId,
        error: String,
    },
}

impl SyncEvent {
    /// Stable event name (e.g. "sync.item.updated").
    pub fn event_type(&self) -> &'static str {
        match self {
            SyncEvent::BatchStarted { .. } => "sync.batch.started",
            SyncEvent::ItemSkipped { .. } => "sync.item.skipped",
            SyncEvent::ItemUpdated { .. } => "sync.item.updated",
            SyncEvent::ItemFailed { .. } => "sync.item.failed",
            SyncEvent::BatchCompleted { .. } => "sync.batch.completed",
            SyncEvent::BatchAborted { .. } => "sync.batch.aborted",
            SyncEvent::LedgerDegraded { .. } => "ledger.degraded",
            SyncEvent::Throttled { .. } => "rate_limit.throttled",
            SyncEvent::RetryScheduled { .. } => "rate_limit.retry_scheduled",
            SyncEvent::CostTableWarning { .. } => "pricing.cost_table.warning",
            SyncEvent::NotificationIgnored { .. } => "notification.ignored",
            SyncEvent::PropagationSkipped { .. } => "propagation.skipped",
            SyncEvent::PropagationWritten { .. } => "propagation.written",
            SyncEvent::PropagationFailed { .. } => "propagation.failed",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            SyncEvent::ItemSkipped { .. }
            | SyncEvent::Throttled { .. }
            | SyncEvent::NotificationIgnored { .. }
            | SyncEvent::PropagationSkipped { .. } => Severity::Debug,
            SyncEvent::BatchStarted { .. }
            | SyncEvent::ItemUpdated { .. }
            | SyncEvent::BatchCompleted { .. }
            | SyncEvent::PropagationWritten { .. } => Severity::Info,
            SyncEvent::LedgerDegraded { .. }
            | SyncEvent::RetryScheduled { .. }
            | SyncEvent::CostTableWarning { .. } => Severity::Warn,
            SyncEvent::ItemFailed { .. }
            | SyncEvent::BatchAborted { .. }
            | SyncEvent::PropagationFailed { .. } => Severity::Error,
        }
    }
}
