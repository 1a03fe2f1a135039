//! Per-product repricing decisions.

use std::sync::Arc;

use printsync_core::{Cents, CategoryId, Product};

use crate::calculator::{Margin, PriceCalculator, PricingError, actual_margin, needs_update};
use crate::cost::{CostLookupError, CostTable};

/// Outcome of pricing one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PricingDecision {
    /// The category has no cost entry; the product must be left alone.
    UnknownCategory(CategoryId),
    /// Every variant is already within tolerance of the target margin.
    AlreadyOptimal,
    /// New per-variant prices, in variant order, and how many changed.
    Reprice { prices: Vec<Cents>, changed: usize },
}

/// Cost table + calculator + target, applied to whole products.
#[derive(Debug, Clone)]
pub struct PricingPolicy {
    table: Arc<CostTable>,
    calculator: PriceCalculator,
    target: Margin,
    tolerance: f64,
}

impl PricingPolicy {
    pub fn new(
        table: Arc<CostTable>,
        calculator: PriceCalculator,
        target: Margin,
        tolerance: f64,
    ) -> Self {
        Self {
            table,
            calculator,
            target,
            tolerance,
        }
    }

    pub fn target(&self) -> Margin {
        self.target
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// A variant keeps its price while its margin is inside the tolerance
    /// band; otherwise it moves to the charm price for the target margin.
    /// A product whose computed prices equal its current ones is optimal.
    pub fn decide(&self, product: &Product) -> Result<PricingDecision, PricingError> {
        if self.table.get(product.category_id).is_none() {
            return Ok(PricingDecision::UnknownCategory(product.category_id));
        }

        let mut prices = Vec::with_capacity(product.variants.len());
        let mut changed = 0;
        for variant in &product.variants {
            let cost = match self.table.lookup_cost(product.category_id, &variant.size_label) {
                Ok(c) => c,
                Err(CostLookupError::NotFound(id)) => {
                    return Ok(PricingDecision::UnknownCategory(id));
                }
            };
            let current = actual_margin(variant.current_price, cost);
            if !needs_update(current, self.target, self.tolerance) {
                prices.push(variant.current_price);
                continue;
            }
            // Charm rounding can leave a variant out of band at the price it
            // already has; that is not a change.
            let price = self.calculator.compute_price(cost, self.target)?;
            if price != variant.current_price {
                changed += 1;
            }
            prices.push(price);
        }

        if changed == 0 {
            Ok(PricingDecision::AlreadyOptimal)
        } else {
            Ok(PricingDecision::Reprice { prices, changed })
        }
    }
}
