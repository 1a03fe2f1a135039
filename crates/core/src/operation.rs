//! Kinds of write the engine performs against a shop.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Operation recorded in the idempotency ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationType {
    /// Recompute variant prices from the cost table.
    PriceUpdate,
    /// Turn on express fulfilment for eligible products.
    ExpressEnable,
    /// Copy the master shop's variant prices onto a dependent listing.
    MasterMirror,
}

impl OperationType {
    pub const ALL: [OperationType; 3] = [
        OperationType::PriceUpdate,
        OperationType::ExpressEnable,
        OperationType::MasterMirror,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::PriceUpdate => "price-update",
            OperationType::ExpressEnable => "express-enable",
            OperationType::MasterMirror => "master-mirror",
        }
    }
}

impl core::fmt::Display for OperationType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationType::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown operation type: {s}")))
    }
}
