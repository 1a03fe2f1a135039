use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use printsync_core::{Product, ProductId, ProductPage, ProductPatch, ProductSummary, ShopId};

use super::{CatalogApi, CatalogError};

type ProductKey = (ShopId, ProductId);

#[derive(Debug, Default)]
struct State {
    /// Products per shop, in listing order.
    shops: HashMap<ShopId, Vec<Product>>,
    /// Queued failures for the next `update_product` calls on a product.
    update_failures: HashMap<ProductKey, VecDeque<CatalogError>>,
    /// Persistent failure for `list_products` on a shop.
    list_failures: HashMap<ShopId, CatalogError>,
    /// Persistent failure for `get_product`.
    get_failures: HashMap<ProductKey, CatalogError>,
    writes: Vec<(ShopId, ProductId, ProductPatch)>,
}

/// In-memory catalog.
///
/// Intended for tests/dev. Writes are applied to the stored products and
/// logged; failures can be injected per call type.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    state: Mutex<State>,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Insert or replace a product, keeping listing position on replace.
    pub fn upsert_product(&self, shop_id: &ShopId, product: Product) {
        let mut state = self.state();
        let products = state.shops.entry(shop_id.clone()).or_default();
        match products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => products.push(product),
        }
    }

    pub fn remove_product(&self, shop_id: &ShopId, product_id: &ProductId) -> Option<Product> {
        let mut state = self.state();
        let products = state.shops.get_mut(shop_id)?;
        let idx = products.iter().position(|p| &p.id == product_id)?;
        Some(products.remove(idx))
    }

    pub fn product(&self, shop_id: &ShopId, product_id: &ProductId) -> Option<Product> {
        self.state()
            .shops
            .get(shop_id)?
            .iter()
            .find(|p| &p.id == product_id)
            .cloned()
    }

    /// The next `times` updates of this product fail with `error`.
    pub fn fail_updates(&self, shop_id: &ShopId, product_id: &ProductId, error: CatalogError, times: usize) {
        let mut state = self.state();
        let queue = state
            .update_failures
            .entry((shop_id.clone(), product_id.clone()))
            .or_default();
        queue.extend(std::iter::repeat_n(error, times));
    }

    pub fn fail_listing(&self, shop_id: &ShopId, error: CatalogError) {
        self.state().list_failures.insert(shop_id.clone(), error);
    }

    pub fn fail_get(&self, shop_id: &ShopId, product_id: &ProductId, error: CatalogError) {
        self.state()
            .get_failures
            .insert((shop_id.clone(), product_id.clone()), error);
    }

    /// Successful writes, in order.
    pub fn writes(&self) -> Vec<(ShopId, ProductId, ProductPatch)> {
        self.state().writes.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Attempted writes, failed ones included.
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }
}

fn apply_patch(product: &mut Product, patch: &ProductPatch) {
    if let Some(variants) = &patch.variants {
        for vp in variants {
            if let Some(v) = product.variants.iter_mut().find(|v| v.id == vp.id) {
                v.current_price = vp.price;
                v.enabled = vp.is_enabled;
            }
        }
    }
    if let Some(express) = patch.express_enabled {
        product.express_enabled = express;
    }
}

#[async_trait]
impl CatalogApi for InMemoryCatalog {
    async fn list_products(
        &self,
        shop_id: &ShopId,
        page: u32,
        limit: u32,
    ) -> Result<ProductPage, CatalogError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        if let Some(err) = state.list_failures.get(shop_id) {
            return Err(err.clone());
        }
        if limit == 0 {
            return Err(CatalogError::Rejected {
                status: 400,
                message: "limit must be positive".to_string(),
            });
        }

        let products = state.shops.get(shop_id).map(Vec::as_slice).unwrap_or(&[]);
        let total = products.len() as u64;
        let page = page.max(1);
        let last_page = products.len().div_ceil(limit as usize).max(1) as u32;
        let start = (page as usize - 1) * limit as usize;

        Ok(ProductPage {
            products: products
                .iter()
                .skip(start)
                .take(limit as usize)
                .map(|p| ProductSummary {
                    id: p.id.clone(),
                    title: p.title.clone(),
                })
                .collect(),
            current_page: page,
            last_page,
            total,
        })
    }

    async fn get_product(
        &self,
        shop_id: &ShopId,
        product_id: &ProductId,
    ) -> Result<Product, CatalogError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        if let Some(err) = state.get_failures.get(&(shop_id.clone(), product_id.clone())) {
            return Err(err.clone());
        }
        state
            .shops
            .get(shop_id)
            .and_then(|products| products.iter().find(|p| &p.id == product_id))
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("product {product_id} in shop {shop_id}")))
    }

    async fn update_product(
        &self,
        shop_id: &ShopId,
        product_id: &ProductId,
        patch: &ProductPatch,
    ) -> Result<(), CatalogError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        let key = (shop_id.clone(), product_id.clone());
        if let Some(err) = state.update_failures.get_mut(&key).and_then(VecDeque::pop_front) {
            return Err(err);
        }

        let product = state
            .shops
            .get_mut(shop_id)
            .and_then(|products| products.iter_mut().find(|p| &p.id == product_id))
            .ok_or_else(|| CatalogError::NotFound(format!("product {product_id} in shop {shop_id}")))?;
        apply_patch(product, patch);
        state
            .writes
            .push((shop_id.clone(), product_id.clone(), patch.clone()));
        Ok(())
    }
}
