use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;

use printsync_core::{OperationType, ShopId};

use super::{LedgerError, ProcessedKey, ProcessedRecord, ProcessedStore};

/// In-memory ledger store.
///
/// Intended for tests/dev. `set_unavailable(true)` makes every call fail,
/// which is how outage handling is exercised.
#[derive(Debug, Default)]
pub struct InMemoryProcessedStore {
    rows: RwLock<HashMap<ProcessedKey, ProcessedRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryProcessedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), LedgerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("in-memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProcessedStore for InMemoryProcessedStore {
    async fn get(&self, key: &ProcessedKey) -> Result<Option<ProcessedRecord>, LedgerError> {
        self.check_available()?;
        let rows = self
            .rows
            .read()
            .map_err(|_| LedgerError::Backend("lock poisoned".to_string()))?;
        Ok(rows.get(key).cloned())
    }

    async fn upsert(
        &self,
        key: ProcessedKey,
        metadata: Option<JsonValue>,
    ) -> Result<ProcessedRecord, LedgerError> {
        self.check_available()?;
        let mut rows = self
            .rows
            .write()
            .map_err(|_| LedgerError::Backend("lock poisoned".to_string()))?;
        let record = ProcessedRecord {
            entity_id: key.entity_id.clone(),
            shop_id: key.shop_id.clone(),
            operation: key.operation,
            metadata,
            processed_at: Utc::now(),
        };
        rows.insert(key, record.clone());
        Ok(record)
    }

    async fn delete(
        &self,
        shop_id: &ShopId,
        operation: Option<OperationType>,
    ) -> Result<u64, LedgerError> {
        self.check_available()?;
        let mut rows = self
            .rows
            .write()
            .map_err(|_| LedgerError::Backend("lock poisoned".to_string()))?;
        let before = rows.len();
        rows.retain(|key, _| {
            !(key.shop_id == *shop_id && operation.is_none_or(|op| op == key.operation))
        });
        Ok((before - rows.len()) as u64)
    }
}
