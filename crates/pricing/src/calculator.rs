//! Margin-to-price math.
//!
//! Prices are derived from cost with an exact-margin formula and then lifted
//! to the next "charm" price (e.g. `X.99`). The lift is a ceiling: a charm
//! price is never below the exact-margin price, so rounding can only add
//! margin.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use printsync_core::Cents;

const BPS_PER_WHOLE: i128 = 10_000;

/// Pricing failure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PricingError {
    #[error("invalid cost: {0} (must be > 0)")]
    InvalidCost(Cents),

    #[error("invalid margin: {0}% (must be in 0..100)")]
    InvalidMargin(f64),

    #[error("invalid charm offset: {0} (must be in 0..=99)")]
    InvalidCharmOffset(u8),
}

/// Target margin, stored in basis points so price math stays exact.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Margin(u32);

/// Margin used when none is configured (38%).
pub const DEFAULT_TARGET_MARGIN: Margin = Margin(3_800);

impl Margin {
    /// Build from a percentage (`38.0` means 38%). Must be in `[0, 100)`.
    pub fn from_percent(percent: f64) -> Result<Self, PricingError> {
        if !percent.is_finite() || !(0.0..100.0).contains(&percent) {
            return Err(PricingError::InvalidMargin(percent));
        }
        let bps = (percent * 100.0).round() as u32;
        if bps >= 10_000 {
            return Err(PricingError::InvalidMargin(percent));
        }
        Ok(Self(bps))
    }

    pub fn basis_points(self) -> u32 {
        self.0
    }

    pub fn percent(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl TryFrom<f64> for Margin {
    type Error = PricingError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Margin::from_percent(value)
    }
}

impl From<Margin> for f64 {
    fn from(value: Margin) -> Self {
        value.percent()
    }
}

impl core::fmt::Display for Margin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Computes charm prices for a fixed charm offset.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PriceCalculator {
    charm_offset: u8,
}

impl Default for PriceCalculator {
    fn default() -> Self {
        Self { charm_offset: 99 }
    }
}

impl PriceCalculator {
    pub fn new(charm_offset: u8) -> Result<Self, PricingError> {
        if charm_offset > 99 {
            return Err(PricingError::InvalidCharmOffset(charm_offset));
        }
        Ok(Self { charm_offset })
    }

    pub fn charm_offset(&self) -> u8 {
        self.charm_offset
    }

    /// Smallest charm price `>= cost / (1 - margin)`.
    pub fn compute_price(&self, cost: Cents, margin: Margin) -> Result<Cents, PricingError> {
        if !cost.is_positive() {
            return Err(PricingError::InvalidCost(cost));
        }
        let denominator = BPS_PER_WHOLE - i128::from(margin.basis_points());
        if denominator <= 0 {
            return Err(PricingError::InvalidMargin(margin.percent()));
        }

        // ceil(cost * 10000 / (10000 - bps)) without touching floats.
        let numerator = i128::from(cost.get()) * BPS_PER_WHOLE;
        let raw = (numerator + denominator - 1) / denominator;

        let charm = i128::from(self.charm_offset);
        let mut price = raw - raw.rem_euclid(100) + charm;
        if price < raw {
            price += 100;
        }

        Ok(Cents(price as i64))
    }
}

/// Margin of `price` over `cost`, as a percentage of `price`.
pub fn actual_margin(price: Cents, cost: Cents) -> f64 {
    if price.get() == 0 {
        return f64::NEG_INFINITY;
    }
    (price.get() - cost.get()) as f64 / price.get() as f64 * 100.0
}

/// Whether a price with `actual` margin is far enough from `target` to rewrite.
///
/// Charm rounding makes exact matches impossible, hence the tolerance (in
/// percentage points).
pub fn needs_update(actual: f64, target: Margin, tolerance: f64) -> bool {
    (actual - target.percent()).abs() > tolerance
}
