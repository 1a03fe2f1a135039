use std::sync::Arc;
use std::time::Duration;

use printsync_core::{CategoryId, Cents, Product, ProductId, ShopId, SizeLabel, Variant, VariantId};
use printsync_events::{EventSink, RecordingSink};
use printsync_infra::{
    CatalogError, EngineConfig, InMemoryCatalog, InMemoryProcessedStore, PropagationGroup,
};
use printsync_pricing::CostTable;
use reqwest::StatusCode;
use serde_json::json;

struct TestServer {
    base_url: String,
    catalog: Arc<InMemoryCatalog>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let catalog = Arc::new(InMemoryCatalog::new());
        let sink: Arc<dyn EventSink> = Arc::new(RecordingSink::new());
        let config = EngineConfig {
            pace_delay: Duration::ZERO,
            max_retries: 0,
            ..EngineConfig::default()
        };
        let group = PropagationGroup::new(shop("master"), vec![shop("mirror")]).unwrap();

        let services = printsync_api::app::services::AppServices::new(
            &config,
            Arc::new(CostTable::builtin()),
            catalog.clone(),
            Arc::new(InMemoryProcessedStore::new()),
            group,
            sink,
        )
        .expect("failed to wire services");

        // Same router as prod, bound to an ephemeral port.
        let app = printsync_api::app::build_app(Arc::new(services));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            catalog,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn shop(id: &str) -> ShopId {
    ShopId::new(id).unwrap()
}

fn pid(id: &str) -> ProductId {
    ProductId::new(id).unwrap()
}

/// Category 6 tee with an M and a 2XL variant.
fn tee(id: &str, m_price: i64, xxl_price: i64) -> Product {
    Product {
        id: pid(id),
        category_id: CategoryId(6),
        title: format!("Tee {id}"),
        variants: vec![
            Variant {
                id: VariantId(1),
                size_label: SizeLabel::M,
                current_price: Cents(m_price),
                enabled: true,
            },
            Variant {
                id: VariantId(2),
                size_label: SizeLabel::XXL,
                current_price: Cents(xxl_price),
                enabled: true,
            },
        ],
        express_eligible: false,
        express_enabled: false,
    }
}

fn prices(product: &Product) -> Vec<i64> {
    product.variants.iter().map(|v| v.current_price.get()).collect()
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn price_update_batch_reprices_then_skips_on_rerun() {
    let srv = TestServer::spawn().await;
    let s = shop("storefront");
    srv.catalog.upsert_product(&s, tee("p1", 1500, 1800));
    srv.catalog.upsert_product(&s, tee("p2", 1500, 1800));

    let client = reqwest::Client::new();
    let res = client
        .post(srv.url("/batches/price-update"))
        .json(&json!({ "shop_id": "storefront", "limit": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["operation"], "price-update");
    assert_eq!(body["updated_count"], 2);
    assert_eq!(body["error_count"], 0);
    assert_eq!(body["has_more"], false);
    assert_eq!(body["progress"], "2/2");
    assert_eq!(body["results"][0]["status"], "updated");

    let p1 = srv.catalog.product(&s, &pid("p1")).unwrap();
    assert_eq!(prices(&p1), vec![1899, 2499]);

    let res = client
        .post(srv.url("/batches/price-update"))
        .json(&json!({ "shop_id": "storefront", "limit": 10 }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["updated_count"], 0);
    assert_eq!(body["already_processed_count"], 2);
    assert_eq!(body["skipped_count"], 2);
    assert_eq!(srv.catalog.writes().len(), 2);
}

#[tokio::test]
async fn bad_batch_requests_are_400() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/batches/recreate"))
        .json(&json!({ "shop_id": "storefront" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unknown_operation");

    let res = client
        .post(srv.url("/batches/price-update"))
        .json(&json!({ "shop_id": "storefront", "limit": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_request");

    let res = client
        .post(srv.url("/batches/price-update"))
        .header("content-type", "application/json")
        .body("{\"offset\": 3}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");
}

#[tokio::test]
async fn listing_failure_is_502() {
    let srv = TestServer::spawn().await;
    let s = shop("storefront");
    srv.catalog.fail_listing(
        &s,
        CatalogError::Server {
            status: 500,
            message: "boom".into(),
        },
    );

    let res = reqwest::Client::new()
        .post(srv.url("/batches/express-enable"))
        .json(&json!({ "shop_id": "storefront" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "page_fetch_failed");
}

#[tokio::test]
async fn webhook_from_master_propagates_prices() {
    let srv = TestServer::spawn().await;
    srv.catalog.upsert_product(&shop("master"), tee("p1", 1899, 2499));
    srv.catalog.upsert_product(&shop("mirror"), tee("p1", 1500, 1800));

    let res = reqwest::Client::new()
        .post(srv.url("/webhooks/catalog"))
        .body(r#"{"type":"product:updated","data":{"id":"p1"},"shop_id":"master"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "propagated");
    assert_eq!(body["summary"]["written"], 1);

    let mirrored = srv.catalog.product(&shop("mirror"), &pid("p1")).unwrap();
    assert_eq!(prices(&mirrored), vec![1899, 2499]);
}

#[tokio::test]
async fn unusable_webhooks_are_still_acknowledged() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for body in [
        "not json",
        r#"{"type":"order:created","data":{"id":"1"},"shop_id":"master"}"#,
        r#"{"type":"product:updated","data":{"id":"p1"},"shop_id":"mirror"}"#,
    ] {
        let res = client
            .post(srv.url("/webhooks/catalog"))
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let outcome: serde_json::Value = res.json().await.unwrap();
        assert_eq!(outcome["status"], "ignored", "{body}");
    }
    assert!(srv.catalog.writes().is_empty());
}

#[tokio::test]
async fn oversized_webhook_is_acknowledged() {
    use printsync_api::app::routes::webhooks::MAX_NOTIFICATION_BYTES;

    let srv = TestServer::spawn().await;
    let body = vec![b'x'; MAX_NOTIFICATION_BYTES + 1024];

    let res = reqwest::Client::new()
        .post(srv.url("/webhooks/catalog"))
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let outcome: serde_json::Value = res.json().await.unwrap();
    assert_eq!(outcome["status"], "ignored");
    assert_eq!(outcome["kind"], "malformed");
    assert!(srv.catalog.writes().is_empty());
}

#[tokio::test]
async fn explicit_propagation_reports_missing_master() {
    let srv = TestServer::spawn().await;

    let res = reqwest::Client::new()
        .post(srv.url("/propagations"))
        .json(&json!({ "product_id": "ghost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "master_fetch_failed");
}

#[tokio::test]
async fn ledger_reset_allows_reprocessing() {
    let srv = TestServer::spawn().await;
    let s = shop("storefront");
    srv.catalog.upsert_product(&s, tee("p1", 1500, 1800));
    let client = reqwest::Client::new();

    let run = || {
        client
            .post(srv.url("/batches/price-update"))
            .json(&json!({ "shop_id": "storefront" }))
            .send()
    };
    run().await.unwrap();

    let res = client
        .post(srv.url("/ledger/reset"))
        .json(&json!({ "shop_id": "storefront", "operation": "price-update" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["deleted"], 1);

    // Prices are already at target, so the rerun evaluates but does not write.
    let body: serde_json::Value = run().await.unwrap().json().await.unwrap();
    assert_eq!(body["already_processed_count"], 0);
    assert_eq!(body["results"][0]["reason"], "already-optimal");
    assert_eq!(srv.catalog.writes().len(), 1);
}

#[tokio::test]
async fn rate_limit_usage_reflects_calls() {
    let srv = TestServer::spawn().await;
    srv.catalog.upsert_product(&shop("storefront"), tee("p1", 1500, 1800));
    let client = reqwest::Client::new();

    client
        .post(srv.url("/batches/price-update"))
        .json(&json!({ "shop_id": "storefront" }))
        .send()
        .await
        .unwrap();

    let usage: serde_json::Value = client
        .get(srv.url("/rate-limits"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(usage["api"], "catalog");
    assert_eq!(usage["window_limit"], 90);
    // list + get + update
    assert_eq!(usage["window_used"], 3);
}
