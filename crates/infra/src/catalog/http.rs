//! reqwest client for the catalog REST API.
//!
//! | call | request |
//! |------|---------|
//! | list | `GET  {base}/shops/{shop}/products.json?limit=&page=` |
//! | get  | `GET  {base}/shops/{shop}/products/{id}.json` |
//! | write| `PUT  {base}/shops/{shop}/products/{id}.json` |
//!
//! Status mapping: 2xx ok, 404 `NotFound`, 429 `RateLimited` (with
//! `Retry-After` seconds when sent), 5xx `Server`, other 4xx `Rejected`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};

use printsync_core::{
    CategoryId, Cents, Product, ProductId, ProductPage, ProductPatch, ProductSummary, ShopId,
    SizeLabel, Variant, VariantId,
};

use super::{CatalogApi, CatalogError};
use crate::config::CatalogSettings;

#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl HttpCatalog {
    pub fn new(settings: &CatalogSettings) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("printsync/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()
            .map_err(|e| CatalogError::Transport(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_token: settings.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder, context: &str) -> Result<reqwest::Response, CatalogError> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(map_transport_error)?;

        if response.status().is_success() {
            return Ok(response);
        }
        Err(error_for_response(response, context).await)
    }
}

fn map_transport_error(err: reqwest::Error) -> CatalogError {
    if err.is_timeout() {
        CatalogError::Timeout
    } else if err.is_decode() {
        CatalogError::Decode(err.to_string())
    } else {
        CatalogError::Transport(err.to_string())
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

async fn error_for_response(response: reqwest::Response, context: &str) -> CatalogError {
    let status = response.status();
    let advised = retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();
    classify_status(status, advised, body, context)
}

fn classify_status(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: String,
    context: &str,
) -> CatalogError {
    match status {
        StatusCode::NOT_FOUND => CatalogError::NotFound(context.to_string()),
        StatusCode::TOO_MANY_REQUESTS => CatalogError::RateLimited { retry_after },
        StatusCode::GATEWAY_TIMEOUT => CatalogError::Timeout,
        s if s.is_server_error() => CatalogError::Server {
            status: s.as_u16(),
            message: body,
        },
        s => CatalogError::Rejected {
            status: s.as_u16(),
            message: body,
        },
    }
}

#[derive(Debug, Deserialize)]
struct ProductListDto {
    #[serde(default)]
    data: Vec<ProductSummaryDto>,
    current_page: u32,
    last_page: u32,
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ProductSummaryDto {
    id: ProductId,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct ProductDto {
    id: ProductId,
    #[serde(default)]
    title: String,
    blueprint_id: u32,
    #[serde(default)]
    variants: Vec<VariantDto>,
    #[serde(default)]
    is_printify_express_eligible: bool,
    #[serde(default)]
    is_printify_express_enabled: bool,
}

#[derive(Debug, Deserialize)]
struct VariantDto {
    id: u64,
    #[serde(default)]
    title: String,
    price: i64,
    #[serde(default)]
    is_enabled: bool,
}

#[derive(Debug, Serialize)]
struct VariantWriteDto {
    id: u64,
    price: i64,
    is_enabled: bool,
}

#[derive(Debug, Serialize)]
struct ProductWriteDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    variants: Option<Vec<VariantWriteDto>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_printify_express_enabled: Option<bool>,
}

/// Variant titles look like `"Black / XL"`; the size is the last segment.
fn size_from_title(title: &str) -> SizeLabel {
    SizeLabel::parse(title.rsplit(" / ").next().unwrap_or(title).trim())
}

impl ProductListDto {
    fn into_page(self, limit: u32) -> ProductPage {
        let total = self.total.unwrap_or_else(|| {
            // Older responses omit `total`; every page but the last is full.
            let full_pages = u64::from(self.last_page.saturating_sub(1)) * u64::from(limit);
            if self.current_page >= self.last_page {
                full_pages + self.data.len() as u64
            } else {
                full_pages + u64::from(limit)
            }
        });
        ProductPage {
            products: self
                .data
                .into_iter()
                .map(|p| ProductSummary {
                    id: p.id,
                    title: p.title,
                })
                .collect(),
            current_page: self.current_page,
            last_page: self.last_page,
            total,
        }
    }
}

impl From<ProductDto> for Product {
    fn from(dto: ProductDto) -> Self {
        Product {
            id: dto.id,
            category_id: CategoryId(dto.blueprint_id),
            title: dto.title,
            variants: dto
                .variants
                .into_iter()
                .map(|v| Variant {
                    id: VariantId(v.id),
                    size_label: size_from_title(&v.title),
                    current_price: Cents(v.price),
                    enabled: v.is_enabled,
                })
                .collect(),
            express_eligible: dto.is_printify_express_eligible,
            express_enabled: dto.is_printify_express_enabled,
        }
    }
}

impl From<&ProductPatch> for ProductWriteDto {
    fn from(patch: &ProductPatch) -> Self {
        ProductWriteDto {
            variants: patch.variants.as_ref().map(|variants| {
                variants
                    .iter()
                    .map(|v| VariantWriteDto {
                        id: v.id.0,
                        price: v.price.get(),
                        is_enabled: v.is_enabled,
                    })
                    .collect()
            }),
            is_printify_express_enabled: patch.express_enabled,
        }
    }
}

#[async_trait]
impl CatalogApi for HttpCatalog {
    async fn list_products(
        &self,
        shop_id: &ShopId,
        page: u32,
        limit: u32,
    ) -> Result<ProductPage, CatalogError> {
        let request = self
            .client
            .get(self.url(&format!("shops/{shop_id}/products.json")))
            .query(&[("limit", limit), ("page", page)]);
        let response = self
            .send(request, &format!("shop {shop_id} products page {page}"))
            .await?;
        let dto: ProductListDto = response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))?;
        Ok(dto.into_page(limit))
    }

    async fn get_product(
        &self,
        shop_id: &ShopId,
        product_id: &ProductId,
    ) -> Result<Product, CatalogError> {
        let request = self
            .client
            .get(self.url(&format!("shops/{shop_id}/products/{product_id}.json")));
        let response = self
            .send(request, &format!("product {product_id} in shop {shop_id}"))
            .await?;
        let dto: ProductDto = response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))?;
        Ok(dto.into())
    }

    async fn update_product(
        &self,
        shop_id: &ShopId,
        product_id: &ProductId,
        patch: &ProductPatch,
    ) -> Result<(), CatalogError> {
        let request = self
            .client
            .put(self.url(&format!("shops/{shop_id}/products/{product_id}.json")))
            .json(&ProductWriteDto::from(patch));
        self.send(request, &format!("product {product_id} in shop {shop_id}"))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use printsync_core::VariantPatch;
    use serde_json::{Value as JsonValue, json};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const TOKEN: &str = "test-token";

    fn authorized(headers: &AxumHeaders) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {TOKEN}"))
    }

    async fn spawn(writes: Arc<Mutex<Vec<JsonValue>>>) -> String {
        let list = |headers: AxumHeaders, Query(q): Query<HashMap<String, String>>| async move {
            if !authorized(&headers) {
                return AxumStatus::UNAUTHORIZED.into_response();
            }
            let page: u32 = q.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
            Json(json!({
                "current_page": page,
                "last_page": 3,
                "data": [{"id": format!("p{page}"), "title": "Tee"}]
            }))
            .into_response()
        };

        let product = |headers: AxumHeaders, Path((_shop, file)): Path<(String, String)>| async move {
            if !authorized(&headers) {
                return AxumStatus::UNAUTHORIZED.into_response();
            }
            match file.as_str() {
                "tee.json" => Json(json!({
                    "id": "tee",
                    "title": "Heavy Cotton Tee",
                    "blueprint_id": 6,
                    "is_printify_express_eligible": true,
                    "variants": [
                        {"id": 1, "title": "Black / M", "price": 1899, "is_enabled": true},
                        {"id": 2, "title": "Black / XXL", "price": 2199, "is_enabled": false}
                    ]
                }))
                .into_response(),
                "busy.json" => (AxumStatus::TOO_MANY_REQUESTS, [("retry-after", "7")], "slow down")
                    .into_response(),
                "broken.json" => (AxumStatus::BAD_GATEWAY, "upstream down").into_response(),
                _ => AxumStatus::NOT_FOUND.into_response(),
            }
        };

        let update = move |Path((_shop, file)): Path<(String, String)>, Json(body): Json<JsonValue>| {
            let writes = writes.clone();
            async move {
                if file == "bad.json" {
                    return (AxumStatus::UNPROCESSABLE_ENTITY, "invalid price").into_response();
                }
                writes.lock().unwrap().push(body);
                AxumStatus::OK.into_response()
            }
        };

        let app = Router::new()
            .route("/shops/:shop/products.json", get(list))
            .route("/shops/:shop/products/:file", get(product).put(update));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    fn client(base_url: String) -> HttpCatalog {
        HttpCatalog::new(&CatalogSettings {
            base_url,
            api_token: TOKEN.to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn shop() -> ShopId {
        ShopId::new("1234").unwrap()
    }

    #[tokio::test]
    async fn reads_pages_and_products() {
        let catalog = client(spawn(Arc::default()).await);

        let page = catalog.list_products(&shop(), 2, 50).await.unwrap();
        assert_eq!(page.current_page, 2);
        assert_eq!(page.products[0].id.as_str(), "p2");
        // No `total` in the body: two full pages before the last one.
        assert_eq!(page.total, 150);

        let product = catalog
            .get_product(&shop(), &ProductId::new("tee").unwrap())
            .await
            .unwrap();
        assert_eq!(product.category_id, CategoryId(6));
        assert!(product.express_eligible);
        assert_eq!(product.variants[1].size_label, SizeLabel::XXL);
        assert_eq!(product.variants[1].current_price, Cents(2199));
        assert!(!product.variants[1].enabled);
    }

    #[tokio::test]
    async fn maps_error_statuses() {
        let catalog = client(spawn(Arc::default()).await);
        let get = |id: &'static str| {
            let catalog = catalog.clone();
            async move {
                catalog
                    .get_product(&shop(), &ProductId::new(id).unwrap())
                    .await
            }
        };

        assert!(matches!(get("missing").await, Err(CatalogError::NotFound(_))));
        assert_eq!(
            get("busy").await,
            Err(CatalogError::RateLimited {
                retry_after: Some(Duration::from_secs(7))
            })
        );
        assert!(matches!(
            get("broken").await,
            Err(CatalogError::Server { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn writes_patch_body() {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let catalog = client(spawn(writes.clone()).await);

        let patch = ProductPatch {
            variants: Some(vec![VariantPatch {
                id: VariantId(1),
                price: Cents(1899),
                is_enabled: true,
            }]),
            express_enabled: None,
        };
        catalog
            .update_product(&shop(), &ProductId::new("tee").unwrap(), &patch)
            .await
            .unwrap();
        assert_eq!(
            writes.lock().unwrap()[0],
            json!({"variants": [{"id": 1, "price": 1899, "is_enabled": true}]})
        );

        let express = ProductPatch {
            variants: None,
            express_enabled: Some(true),
        };
        catalog
            .update_product(&shop(), &ProductId::new("tee").unwrap(), &express)
            .await
            .unwrap();
        assert_eq!(
            writes.lock().unwrap()[1],
            json!({"is_printify_express_enabled": true})
        );

        let rejected = catalog
            .update_product(&shop(), &ProductId::new("bad").unwrap(), &patch)
            .await;
        assert!(matches!(
            rejected,
            Err(CatalogError::Rejected { status: 422, .. })
        ));
    }

    #[test]
    fn only_429_and_5xx_are_transient() {
        use crate::rate_limit::{RetryHint, Retryable};

        let classify = |status: u16| {
            classify_status(StatusCode::from_u16(status).unwrap(), None, String::new(), "p1")
        };
        assert!(matches!(classify(408), CatalogError::Rejected { status: 408, .. }));
        assert_eq!(classify(408).retry_hint(), RetryHint::Permanent);
        assert_eq!(classify(504), CatalogError::Timeout);
        assert!(matches!(classify(504).retry_hint(), RetryHint::Transient { .. }));
        assert!(matches!(classify(429).retry_hint(), RetryHint::Transient { .. }));
    }

    #[test]
    fn size_is_last_title_segment() {
        assert_eq!(size_from_title("Heather Grey / 2XL"), SizeLabel::XXL);
        assert_eq!(size_from_title("S"), SizeLabel::S);
        assert_eq!(size_from_title("White / 11oz"), SizeLabel::Other("11oz".into()));
    }
}
