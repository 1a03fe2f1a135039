//! Catalog entities as seen by the engine.
//!
//! The upstream catalog service owns these rows. The engine reads them, decides
//! a desired state and writes a patch back; it never keeps a copy between
//! batches.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::id::{CategoryId, ProductId, ShopId, VariantId};
use crate::money::Cents;
use crate::size::SizeLabel;

/// Role of a shop inside a propagation group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShopRole {
    /// Pricing source of truth.
    Master,
    /// Mirrors the master's prices.
    Dependent,
}

/// A sales destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub id: ShopId,
    pub role: ShopRole,
}

impl Shop {
    pub fn master(id: ShopId) -> Self {
        Self {
            id,
            role: ShopRole::Master,
        }
    }

    pub fn dependent(id: ShopId) -> Self {
        Self {
            id,
            role: ShopRole::Dependent,
        }
    }
}

/// One sellable size/colour combination of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub size_label: SizeLabel,
    pub current_price: Cents,
    pub enabled: bool,
}

/// A product row in one shop, with its ordered variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    pub title: String,
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub express_eligible: bool,
    #[serde(default)]
    pub express_enabled: bool,
}

impl Product {
    /// Patch that rewrites every variant with the given prices (same order as
    /// `self.variants`), keeping each variant's enabled flag.
    pub fn price_patch(&self, prices: &[Cents]) -> Result<ProductPatch, DomainError> {
        if prices.len() != self.variants.len() {
            return Err(DomainError::invariant(format!(
                "price list has {} entries for {} variants",
                prices.len(),
                self.variants.len()
            )));
        }
        let variants = self
            .variants
            .iter()
            .zip(prices)
            .map(|(v, price)| VariantPatch {
                id: v.id,
                price: *price,
                is_enabled: v.enabled,
            })
            .collect();
        Ok(ProductPatch {
            variants: Some(variants),
            express_enabled: None,
        })
    }
}

/// Lightweight listing entry returned by the paginated collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub title: String,
}

/// One upstream page of a shop's products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<ProductSummary>,
    /// 1-based page number.
    pub current_page: u32,
    pub last_page: u32,
    /// Size of the whole collection.
    pub total: u64,
}

/// Variant portion of a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantPatch {
    pub id: VariantId,
    pub price: Cents,
    pub is_enabled: bool,
}

/// Fields to write back to the catalog. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<VariantPatch>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub express_enabled: Option<bool>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.variants.is_none() && self.express_enabled.is_none()
    }

    /// Number of variants whose price differs from `product`.
    pub fn changed_prices(&self, product: &Product) -> usize {
        let Some(variants) = &self.variants else {
            return 0;
        };
        variants
            .iter()
            .filter(|p| {
                product
                    .variants
                    .iter()
                    .find(|v| v.id == p.id)
                    .is_none_or(|v| v.current_price != p.price)
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        Product {
            id: ProductId::new("p1").unwrap(),
            category_id: CategoryId(6),
            title: "Tee".into(),
            variants: vec![
                Variant {
                    id: VariantId(1),
                    size_label: SizeLabel::M,
                    current_price: Cents(1899),
                    enabled: true,
                },
                Variant {
                    id: VariantId(2),
                    size_label: SizeLabel::XXL,
                    current_price: Cents(2199),
                    enabled: false,
                },
            ],
            express_eligible: false,
            express_enabled: false,
        }
    }

    #[test]
    fn price_patch_keeps_enabled_flags() {
        let p = product();
        let patch = p.price_patch(&[Cents(1899), Cents(2399)]).unwrap();
        let variants = patch.variants.as_ref().unwrap();
        assert!(variants[0].is_enabled);
        assert!(!variants[1].is_enabled);
        assert_eq!(patch.changed_prices(&p), 1);
    }

    #[test]
    fn price_patch_rejects_length_mismatch() {
        let p = product();
        assert!(matches!(
            p.price_patch(&[Cents(1)]),
            Err(DomainError::InvariantViolation(_))
        ));
    }
}
