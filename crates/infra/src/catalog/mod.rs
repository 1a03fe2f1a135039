//! Upstream catalog service boundary.
//!
//! Everything the engine knows about products comes through [`CatalogApi`].
//! The HTTP implementation talks to the real service; the in-memory one backs
//! tests and local runs.

pub mod http;
pub mod in_memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use printsync_core::{Product, ProductId, ProductPage, ProductPatch, ShopId};

use crate::rate_limit::{RetryHint, Retryable, Throttled};

pub use http::HttpCatalog;
pub use in_memory::InMemoryCatalog;

/// Rate-limiter key for catalog calls.
pub const CATALOG_API: &str = "catalog";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rejected with {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound(_))
    }
}

impl Retryable for CatalogError {
    fn retry_hint(&self) -> RetryHint {
        match self {
            CatalogError::RateLimited { retry_after } => RetryHint::Transient {
                retry_after: *retry_after,
            },
            CatalogError::Server { .. } | CatalogError::Timeout | CatalogError::Transport(_) => {
                RetryHint::Transient { retry_after: None }
            }
            CatalogError::NotFound(_) | CatalogError::Rejected { .. } | CatalogError::Decode(_) => {
                RetryHint::Permanent
            }
        }
    }
}

impl From<Throttled> for CatalogError {
    fn from(t: Throttled) -> Self {
        CatalogError::RateLimited {
            retry_after: Some(t.retry_after),
        }
    }
}

/// Read/write access to one catalog service.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// One page (1-based) of a shop's products.
    async fn list_products(
        &self,
        shop_id: &ShopId,
        page: u32,
        limit: u32,
    ) -> Result<ProductPage, CatalogError>;

    async fn get_product(
        &self,
        shop_id: &ShopId,
        product_id: &ProductId,
    ) -> Result<Product, CatalogError>;

    async fn update_product(
        &self,
        shop_id: &ShopId,
        product_id: &ProductId,
        patch: &ProductPatch,
    ) -> Result<(), CatalogError>;
}

#[async_trait]
impl<C> CatalogApi for Arc<C>
where
    C: CatalogApi + ?Sized,
{
    async fn list_products(
        &self,
        shop_id: &ShopId,
        page: u32,
        limit: u32,
    ) -> Result<ProductPage, CatalogError> {
        (**self).list_products(shop_id, page, limit).await
    }

    async fn get_product(
        &self,
        shop_id: &ShopId,
        product_id: &ProductId,
    ) -> Result<Product, CatalogError> {
        (**self).get_product(shop_id, product_id).await
    }

    async fn update_product(
        &self,
        shop_id: &ShopId,
        product_id: &ProductId,
        patch: &ProductPatch,
    ) -> Result<(), CatalogError> {
        (**self).update_product(shop_id, product_id, patch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let transient = [
            CatalogError::RateLimited { retry_after: None },
            CatalogError::Server {
                status: 503,
                message: String::new(),
            },
            CatalogError::Timeout,
            CatalogError::Transport("reset".into()),
        ];
        for e in transient {
            assert!(matches!(e.retry_hint(), RetryHint::Transient { .. }), "{e}");
        }

        let permanent = [
            CatalogError::NotFound("p".into()),
            CatalogError::Rejected {
                status: 422,
                message: "bad variant".into(),
            },
            CatalogError::Decode("eof".into()),
        ];
        for e in permanent {
            assert_eq!(e.retry_hint(), RetryHint::Permanent, "{e}");
        }

        assert_eq!(
            CatalogError::RateLimited {
                retry_after: Some(Duration::from_secs(7))
            }
            .retry_hint(),
            RetryHint::Transient {
                retry_after: Some(Duration::from_secs(7))
            }
        );
    }
}
