//! Pricing domain module.
//!
//! Business rules for turning manufacturing cost into sale prices,
//! implemented as deterministic domain logic (no IO, no HTTP, no storage):
//!
//! - [`cost`]: the static category cost table and size-aware lookup
//! - [`calculator`]: margin-to-price math with charm-price ceilings
//! - [`policy`]: per-product repricing decisions built on the two above

pub mod calculator;
pub mod cost;
pub mod policy;

pub use calculator::{DEFAULT_TARGET_MARGIN, Margin, PriceCalculator, PricingError, actual_margin, needs_update};
pub use cost::{DEFAULT_PLUS_SIZE_MULTIPLIER, CostEntry, CostLookupError, CostTable, CostTableError, CostWarning};
pub use policy::{PricingDecision, PricingPolicy};
