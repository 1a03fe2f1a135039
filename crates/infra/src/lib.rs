//! Infrastructure layer: idempotency store, rate limiting, catalog client,
//! batch orchestration and configuration.

pub mod catalog;
pub mod config;
pub mod ledger;
pub mod rate_limit;
pub mod sync;


pub use catalog::{CATALOG_API, CatalogApi, CatalogError, HttpCatalog, InMemoryCatalog};
pub use config::{CatalogSettings, ConfigError, EngineConfig};
pub use ledger::{
    IdempotencyLedger, InMemoryProcessedStore, LedgerError, PostgresProcessedStore,
    ProcessedKey, ProcessedRecord, ProcessedStore,
};
pub use rate_limit::{RateDecision, RateLimiter, RateLimits, RateUsage, RetryPolicy};
pub use sync::{
    BatchOrchestrator, BatchRequest, BatchSummary, CrossShopPropagator, ItemResult, ItemStatus,
    NotificationOutcome, NotificationRouter, PropagationGroup, SkipReason, SyncContext, SyncError,
};
