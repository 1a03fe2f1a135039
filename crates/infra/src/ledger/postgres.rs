//! Postgres-backed ledger store.
//!
//! Rows live in `processed_records`, unique on
//! `(entity_id, shop_id, operation_type)`. Writes are upserts, so marking the
//! same triple twice refreshes `processed_at` and `metadata` instead of
//! failing.
//!
//! ## Error Mapping
//!
//! | SQLx Error | LedgerError |
//! |------------|-------------|
//! | PoolClosed / PoolTimedOut / Io | `Unavailable` |
//! | Database / other | `Backend` |
//! | Row decode failures | `Corrupt` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{Span, instrument};

use printsync_core::{OperationType, ProductId, ShopId};

use super::{LedgerError, ProcessedKey, ProcessedRecord, ProcessedStore};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS processed_records (
    id             BIGSERIAL PRIMARY KEY,
    entity_id      TEXT        NOT NULL,
    shop_id        TEXT        NOT NULL,
    operation_type TEXT        NOT NULL,
    metadata       JSONB,
    processed_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (entity_id, shop_id, operation_type)
)
"#;

#[derive(Debug, Clone)]
pub struct PostgresProcessedStore {
    pool: Arc<PgPool>,
}

impl PostgresProcessedStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and make sure the table exists.
    pub async fn connect(database_url: &str) -> Result<Self, LedgerError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), LedgerError> {
        sqlx::query(CREATE_TABLE)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl ProcessedStore for PostgresProcessedStore {
    #[instrument(
        skip(self),
        fields(
            entity_id = %key.entity_id,
            shop_id = %key.shop_id,
            operation = %key.operation,
            found = tracing::field::Empty
        ),
        err
    )]
    async fn get(&self, key: &ProcessedKey) -> Result<Option<ProcessedRecord>, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT entity_id, shop_id, operation_type, metadata, processed_at
            FROM processed_records
            WHERE entity_id = $1 AND shop_id = $2 AND operation_type = $3
            "#,
        )
        .bind(key.entity_id.as_str())
        .bind(key.shop_id.as_str())
        .bind(key.operation.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get", e))?;

        Span::current().record("found", row.is_some());
        row.map(|r| record_from_row(&r)).transpose()
    }

    #[instrument(
        skip(self, metadata),
        fields(
            entity_id = %key.entity_id,
            shop_id = %key.shop_id,
            operation = %key.operation
        ),
        err
    )]
    async fn upsert(
        &self,
        key: ProcessedKey,
        metadata: Option<JsonValue>,
    ) -> Result<ProcessedRecord, LedgerError> {
        let row = sqlx::query(
            r#"
            INSERT INTO processed_records (entity_id, shop_id, operation_type, metadata, processed_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (entity_id, shop_id, operation_type)
            DO UPDATE SET metadata = EXCLUDED.metadata, processed_at = EXCLUDED.processed_at
            RETURNING entity_id, shop_id, operation_type, metadata, processed_at
            "#,
        )
        .bind(key.entity_id.as_str())
        .bind(key.shop_id.as_str())
        .bind(key.operation.as_str())
        .bind(metadata)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert", e))?;

        record_from_row(&row)
    }

    #[instrument(skip(self), fields(shop_id = %shop_id, deleted = tracing::field::Empty), err)]
    async fn delete(
        &self,
        shop_id: &ShopId,
        operation: Option<OperationType>,
    ) -> Result<u64, LedgerError> {
        let result = sqlx::query(
            r#"
            DELETE FROM processed_records
            WHERE shop_id = $1 AND ($2::TEXT IS NULL OR operation_type = $2)
            "#,
        )
        .bind(shop_id.as_str())
        .bind(operation.map(|op| op.as_str()))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete", e))?;

        let deleted = result.rows_affected();
        Span::current().record("deleted", deleted);
        Ok(deleted)
    }
}

fn record_from_row(row: &PgRow) -> Result<ProcessedRecord, LedgerError> {
    let corrupt = |e: sqlx::Error| LedgerError::Corrupt(e.to_string());

    let entity_id: String = row.try_get("entity_id").map_err(corrupt)?;
    let shop_id: String = row.try_get("shop_id").map_err(corrupt)?;
    let operation: String = row.try_get("operation_type").map_err(corrupt)?;
    let metadata: Option<JsonValue> = row.try_get("metadata").map_err(corrupt)?;
    let processed_at: DateTime<Utc> = row.try_get("processed_at").map_err(corrupt)?;

    Ok(ProcessedRecord {
        entity_id: ProductId::new(entity_id).map_err(|e| LedgerError::Corrupt(e.to_string()))?,
        shop_id: ShopId::new(shop_id).map_err(|e| LedgerError::Corrupt(e.to_string()))?,
        operation: operation
            .parse()
            .map_err(|e: printsync_core::DomainError| LedgerError::Corrupt(e.to_string()))?,
        metadata,
        processed_at,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> LedgerError {
    match err {
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            LedgerError::Unavailable(format!("{operation}: {err}"))
        }
        sqlx::Error::Database(db_err) => {
            LedgerError::Backend(format!("database error in {operation}: {}", db_err.message()))
        }
        _ => LedgerError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}
