//! Idempotency ledger.
//!
//! Durable record of completed `(entity, shop, operation)` triples so batch
//! re-runs skip work that already landed upstream. The ledger is advisory:
//! a store outage must never stop a batch, so reads fail open and writes
//! degrade to a warning.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use printsync_core::{OperationType, ProductId, ShopId};
use printsync_events::{EventSink, SyncEvent};

pub use in_memory::InMemoryProcessedStore;
pub use postgres::PostgresProcessedStore;

/// Unique key of a ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessedKey {
    pub entity_id: ProductId,
    pub shop_id: ShopId,
    pub operation: OperationType,
}

impl ProcessedKey {
    pub fn new(entity_id: ProductId, shop_id: ShopId, operation: OperationType) -> Self {
        Self {
            entity_id,
            shop_id,
            operation,
        }
    }
}

/// A completed operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub entity_id: ProductId,
    pub shop_id: ShopId,
    pub operation: OperationType,
    pub metadata: Option<JsonValue>,
    pub processed_at: DateTime<Utc>,
}

impl ProcessedRecord {
    pub fn key(&self) -> ProcessedKey {
        ProcessedKey::new(self.entity_id.clone(), self.shop_id.clone(), self.operation)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger store unavailable: {0}")]
    Unavailable(String),

    #[error("ledger backend error: {0}")]
    Backend(String),

    #[error("corrupt ledger row: {0}")]
    Corrupt(String),
}

/// Storage behind the ledger. Implementations must upsert on the full key.
#[async_trait]
pub trait ProcessedStore: Send + Sync {
    async fn get(&self, key: &ProcessedKey) -> Result<Option<ProcessedRecord>, LedgerError>;

    async fn contains(&self, key: &ProcessedKey) -> Result<bool, LedgerError> {
        Ok(self.get(key).await?.is_some())
    }

    /// Insert or refresh the row for `key`, returning the stored record.
    async fn upsert(
        &self,
        key: ProcessedKey,
        metadata: Option<JsonValue>,
    ) -> Result<ProcessedRecord, LedgerError>;

    /// Delete rows for a shop, optionally limited to one operation.
    /// Returns the number of rows removed.
    async fn delete(
        &self,
        shop_id: &ShopId,
        operation: Option<OperationType>,
    ) -> Result<u64, LedgerError>;
}

#[async_trait]
impl<S> ProcessedStore for Arc<S>
where
    S: ProcessedStore + ?Sized,
{
    async fn get(&self, key: &ProcessedKey) -> Result<Option<ProcessedRecord>, LedgerError> {
        (**self).get(key).await
    }

    async fn contains(&self, key: &ProcessedKey) -> Result<bool, LedgerError> {
        (**self).contains(key).await
    }

    async fn upsert(
        &self,
        key: ProcessedKey,
        metadata: Option<JsonValue>,
    ) -> Result<ProcessedRecord, LedgerError> {
        (**self).upsert(key, metadata).await
    }

    async fn delete(
        &self,
        shop_id: &ShopId,
        operation: Option<OperationType>,
    ) -> Result<u64, LedgerError> {
        (**self).delete(shop_id, operation).await
    }
}

/// Fail-open facade over a [`ProcessedStore`].
#[derive(Clone)]
pub struct IdempotencyLedger {
    store: Arc<dyn ProcessedStore>,
    sink: Arc<dyn EventSink>,
}

impl IdempotencyLedger {
    pub fn new(store: Arc<dyn ProcessedStore>, sink: Arc<dyn EventSink>) -> Self {
        Self { store, sink }
    }

    /// `false` when the store cannot answer; the item is then reprocessed.
    pub async fn is_processed(
        &self,
        entity_id: &ProductId,
        shop_id: &ShopId,
        operation: OperationType,
    ) -> bool {
        let key = ProcessedKey::new(entity_id.clone(), shop_id.clone(), operation);
        match self.store.contains(&key).await {
            Ok(found) => found,
            Err(e) => {
                self.degraded("is_processed", &key, &e);
                false
            }
        }
    }

    /// Records completion. Returns `false` if the store rejected the write.
    pub async fn mark_processed(
        &self,
        entity_id: &ProductId,
        shop_id: &ShopId,
        operation: OperationType,
        metadata: Option<JsonValue>,
    ) -> bool {
        let key = ProcessedKey::new(entity_id.clone(), shop_id.clone(), operation);
        match self.store.upsert(key.clone(), metadata).await {
            Ok(_) => true,
            Err(e) => {
                self.degraded("mark_processed", &key, &e);
                false
            }
        }
    }

    /// Administrative reset. Unlike the batch-path calls, errors surface.
    pub async fn reset_processed(
        &self,
        shop_id: &ShopId,
        operation: Option<OperationType>,
    ) -> Result<u64, LedgerError> {
        self.store.delete(shop_id, operation).await
    }

    pub async fn record(
        &self,
        entity_id: &ProductId,
        shop_id: &ShopId,
        operation: OperationType,
    ) -> Option<ProcessedRecord> {
        let key = ProcessedKey::new(entity_id.clone(), shop_id.clone(), operation);
        match self.store.get(&key).await {
            Ok(record) => record,
            Err(e) => {
                self.degraded("record", &key, &e);
                None
            }
        }
    }

    fn degraded(&self, action: &'static str, key: &ProcessedKey, err: &LedgerError) {
        self.sink.emit(SyncEvent::LedgerDegraded {
            action,
            operation: key.operation,
            shop_id: key.shop_id.clone(),
            entity_id: key.entity_id.clone(),
            error: err.to_string(),
        });
    }
}

impl std::fmt::Debug for IdempotencyLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdempotencyLedger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printsync_events::RecordingSink;

    fn ids() -> (ProductId, ShopId) {
        (ProductId::new("p-1").unwrap(), ShopId::new("shop-1").unwrap())
    }

    #[tokio::test]
    async fn mark_then_query() {
        let ledger = IdempotencyLedger::new(
            Arc::new(InMemoryProcessedStore::new()),
            Arc::new(RecordingSink::new()),
        );
        let (p, s) = ids();

        assert!(!ledger.is_processed(&p, &s, OperationType::PriceUpdate).await);
        assert!(
            ledger
                .mark_processed(&p, &s, OperationType::PriceUpdate, Some(serde_json::json!({"changed": 2})))
                .await
        );
        assert!(ledger.is_processed(&p, &s, OperationType::PriceUpdate).await);
        // Same entity, other operation is independent.
        assert!(!ledger.is_processed(&p, &s, OperationType::ExpressEnable).await);

        let record = ledger.record(&p, &s, OperationType::PriceUpdate).await.unwrap();
        assert_eq!(record.metadata, Some(serde_json::json!({"changed": 2})));
    }

    #[tokio::test]
    async fn store_outage_fails_open_with_warning() {
        let store = Arc::new(InMemoryProcessedStore::new());
        let sink = Arc::new(RecordingSink::new());
        let ledger = IdempotencyLedger::new(store.clone(), sink.clone());
        let (p, s) = ids();

        assert!(ledger.mark_processed(&p, &s, OperationType::PriceUpdate, None).await);
        store.set_unavailable(true);

        assert!(!ledger.is_processed(&p, &s, OperationType::PriceUpdate).await);
        assert!(!ledger.mark_processed(&p, &s, OperationType::PriceUpdate, None).await);
        assert_eq!(sink.of_type("ledger.degraded").len(), 2);

        assert!(ledger.reset_processed(&s, None).await.is_err());
    }

    #[tokio::test]
    async fn reset_is_scoped_to_shop_and_operation() {
        let ledger = IdempotencyLedger::new(
            Arc::new(InMemoryProcessedStore::new()),
            Arc::new(RecordingSink::new()),
        );
        let (p, s) = ids();
        let other = ShopId::new("shop-2").unwrap();

        ledger.mark_processed(&p, &s, OperationType::PriceUpdate, None).await;
        ledger.mark_processed(&p, &s, OperationType::ExpressEnable, None).await;
        ledger.mark_processed(&p, &other, OperationType::PriceUpdate, None).await;

        let deleted = ledger
            .reset_processed(&s, Some(OperationType::PriceUpdate))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(ledger.is_processed(&p, &s, OperationType::ExpressEnable).await);
        assert!(ledger.is_processed(&p, &other, OperationType::PriceUpdate).await);

        assert_eq!(ledger.reset_processed(&s, None).await.unwrap(), 1);
    }
}
