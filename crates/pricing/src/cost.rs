//! Category cost table.
//!
//! Static mapping from a product category to its manufacturing cost, with
//! optional per-size overrides. Loaded once at process start and never
//! mutated afterwards.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use printsync_core::{Cents, CategoryId, SizeLabel};

/// Default uplift for plus sizes that have no override at all.
pub const DEFAULT_PLUS_SIZE_MULTIPLIER: f64 = 1.25;

/// Cost of one product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEntry {
    pub category_id: CategoryId,
    pub base_cost: Cents,
    #[serde(default)]
    pub size_overrides: BTreeMap<SizeLabel, Cents>,
}

impl CostEntry {
    pub fn new(category_id: CategoryId, base_cost: Cents) -> Self {
        Self {
            category_id,
            base_cost,
            size_overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, size: SizeLabel, cost: Cents) -> Self {
        self.size_overrides.insert(size, cost);
        self
    }
}

/// Lookup failure. Callers skip the item; they never guess a cost.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CostLookupError {
    #[error("no cost entry for category {0}")]
    NotFound(CategoryId),
}

/// Errors raised while building or loading a table.
#[derive(Debug, Error)]
pub enum CostTableError {
    #[error("category {category_id}: base cost {cost} must be > 0")]
    InvalidBaseCost { category_id: CategoryId, cost: Cents },

    #[error("category {category_id}: {size} override {cost} must be > 0")]
    InvalidOverride {
        category_id: CategoryId,
        size: SizeLabel,
        cost: Cents,
    },

    #[error("category {0} listed more than once")]
    DuplicateCategory(CategoryId),

    #[error("plus size multiplier {0} must be >= 1.0")]
    InvalidMultiplier(f64),

    #[error("failed to read cost table: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse cost table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Data-quality finding: a larger size is cheaper than a smaller one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostWarning {
    pub category_id: CategoryId,
    pub smaller: SizeLabel,
    pub smaller_cost: Cents,
    pub larger: SizeLabel,
    pub larger_cost: Cents,
}

impl core::fmt::Display for CostWarning {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "category {}: {} costs {} but smaller {} costs {}",
            self.category_id, self.larger, self.larger_cost, self.smaller, self.smaller_cost
        )
    }
}

/// On-disk format of an operator-supplied table.
#[derive(Debug, Deserialize)]
struct CostTableFile {
    #[serde(default = "default_multiplier")]
    plus_size_multiplier: f64,
    entries: Vec<CostEntry>,
}

fn default_multiplier() -> f64 {
    DEFAULT_PLUS_SIZE_MULTIPLIER
}

/// Immutable category → cost table.
#[derive(Debug, Clone)]
pub struct CostTable {
    entries: HashMap<CategoryId, CostEntry>,
    plus_size_multiplier_bps: u32,
}

impl CostTable {
    pub fn new(entries: Vec<CostEntry>) -> Result<Self, CostTableError> {
        Self::with_multiplier(entries, DEFAULT_PLUS_SIZE_MULTIPLIER)
    }

    pub fn with_multiplier(
        entries: Vec<CostEntry>,
        plus_size_multiplier: f64,
    ) -> Result<Self, CostTableError> {
        if !plus_size_multiplier.is_finite() || plus_size_multiplier < 1.0 {
            return Err(CostTableError::InvalidMultiplier(plus_size_multiplier));
        }

        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            if !entry.base_cost.is_positive() {
                return Err(CostTableError::InvalidBaseCost {
                    category_id: entry.category_id,
                    cost: entry.base_cost,
                });
            }
            if let Some((size, cost)) = entry.size_overrides.iter().find(|(_, c)| !c.is_positive()) {
                return Err(CostTableError::InvalidOverride {
                    category_id: entry.category_id,
                    size: size.clone(),
                    cost: *cost,
                });
            }
            let id = entry.category_id;
            if map.insert(id, entry).is_some() {
                return Err(CostTableError::DuplicateCategory(id));
            }
        }

        Ok(Self {
            entries: map,
            plus_size_multiplier_bps: (plus_size_multiplier * 10_000.0).round() as u32,
        })
    }

    /// Parse the JSON format `{"plus_size_multiplier": 1.25, "entries": [...]}`.
    pub fn from_json_str(raw: &str) -> Result<Self, CostTableError> {
        let file: CostTableFile = serde_json::from_str(raw)?;
        Self::with_multiplier(file.entries, file.plus_size_multiplier)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CostTableError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Table shipped with the engine (blueprint costs in USD cents).
    pub fn builtin() -> Self {
        Self::new(builtin_entries()).unwrap_or_else(|e| unreachable!("builtin cost table is valid: {e}"))
    }

    /// Built-in entries with a custom plus-size multiplier.
    pub fn builtin_with_multiplier(plus_size_multiplier: f64) -> Result<Self, CostTableError> {
        Self::with_multiplier(builtin_entries(), plus_size_multiplier)
    }

    pub fn get(&self, category_id: CategoryId) -> Option<&CostEntry> {
        self.entries.get(&category_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn plus_size_multiplier(&self) -> f64 {
        f64::from(self.plus_size_multiplier_bps) / 10_000.0
    }

    /// Resolve the cost of one size of a category.
    ///
    /// Order: exact override, then (plus sizes only) the override of the next
    /// smaller plus size, then base cost uplifted by the plus-size multiplier
    /// for plus sizes, or plain base cost for everything else.
    pub fn lookup_cost(
        &self,
        category_id: CategoryId,
        size: &SizeLabel,
    ) -> Result<Cents, CostLookupError> {
        let entry = self
            .entries
            .get(&category_id)
            .ok_or(CostLookupError::NotFound(category_id))?;

        if let Some(cost) = entry.size_overrides.get(size) {
            return Ok(*cost);
        }

        if !size.is_plus() {
            return Ok(entry.base_cost);
        }

        let smaller = size
            .rank()
            .and_then(|rank| rank.checked_sub(1))
            .map(|r| &SizeLabel::RANKED[r])
            .filter(|s| s.is_plus());
        if let Some(cost) = smaller.and_then(|s| entry.size_overrides.get(s)) {
            return Ok(*cost);
        }

        let base = i128::from(entry.base_cost.get());
        let bps = i128::from(self.plus_size_multiplier_bps);
        Ok(Cents(((base * bps + 9_999) / 10_000) as i64))
    }

    /// Non-decreasing-with-size check over ranked overrides.
    pub fn validate(&self) -> Vec<CostWarning> {
        let mut warnings = Vec::new();
        let mut ids: Vec<_> = self.entries.keys().copied().collect();
        ids.sort();

        for id in ids {
            let entry = &self.entries[&id];
            let ranked: Vec<(&SizeLabel, Cents)> = SizeLabel::RANKED
                .iter()
                .filter_map(|s| entry.size_overrides.get(s).map(|c| (s, *c)))
                .collect();
            for pair in ranked.windows(2) {
                let (smaller, smaller_cost) = pair[0];
                let (larger, larger_cost) = pair[1];
                if larger_cost < smaller_cost {
                    warnings.push(CostWarning {
                        category_id: id,
                        smaller: smaller.clone(),
                        smaller_cost,
                        larger: larger.clone(),
                        larger_cost,
                    });
                }
            }
        }
        warnings
    }
}

fn builtin_entries() -> Vec<CostEntry> {
    vec![
        // Unisex heavy cotton tee
        CostEntry::new(CategoryId(6), Cents(1167))
            .with_override(SizeLabel::XXL, Cents(1489))
            .with_override(SizeLabel::XXXL, Cents(1735)),
        // Unisex jersey short sleeve tee
        CostEntry::new(CategoryId(12), Cents(1229))
            .with_override(SizeLabel::XXL, Cents(1541))
            .with_override(SizeLabel::XXXL, Cents(1722))
            .with_override(SizeLabel::XXXXL, Cents(1899)),
        // Unisex heavy blend crewneck sweatshirt
        CostEntry::new(CategoryId(49), Cents(2046))
            .with_override(SizeLabel::XXL, Cents(2359))
            .with_override(SizeLabel::XXXL, Cents(2598)),
        // Unisex heavy blend hooded sweatshirt
        CostEntry::new(CategoryId(77), Cents(2591))
            .with_override(SizeLabel::XXL, Cents(2904))
            .with_override(SizeLabel::XXXL, Cents(3227))
            .with_override(SizeLabel::XXXXL, Cents(3480))
            .with_override(SizeLabel::XXXXXL, Cents(3480)),
        // Ceramic mug 11oz
        CostEntry::new(CategoryId(68), Cents(535)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tee() -> CostEntry {
        CostEntry::new(CategoryId(6), Cents(1167))
            .with_override(SizeLabel::XXL, Cents(1489))
            .with_override(SizeLabel::XXXL, Cents(1735))
    }

    #[test]
    fn exact_override_wins() {
        let table = CostTable::new(vec![tee()]).unwrap();
        assert_eq!(table.lookup_cost(CategoryId(6), &SizeLabel::XXL), Ok(Cents(1489)));
    }

    #[test]
    fn regular_sizes_use_base_cost() {
        let table = CostTable::new(vec![tee()]).unwrap();
        assert_eq!(table.lookup_cost(CategoryId(6), &SizeLabel::M), Ok(Cents(1167)));
        assert_eq!(
            table.lookup_cost(CategoryId(6), &SizeLabel::Other("One size".into())),
            Ok(Cents(1167))
        );
    }

    #[test]
    fn four_xl_falls_back_to_three_xl() {
        let table = CostTable::new(vec![tee()]).unwrap();
        assert_eq!(table.lookup_cost(CategoryId(6), &SizeLabel::XXXXL), Ok(Cents(1735)));
        // No 4XL override to borrow from: 1167 * 1.25 rounded up.
        assert_eq!(table.lookup_cost(CategoryId(6), &SizeLabel::XXXXXL), Ok(Cents(1459)));
    }

    #[test]
    fn fallback_only_looks_one_size_down() {
        let entry = CostEntry::new(CategoryId(1), Cents(1000)).with_override(SizeLabel::XXL, Cents(1300));
        let table = CostTable::with_multiplier(vec![entry], 1.25).unwrap();
        assert_eq!(table.lookup_cost(CategoryId(1), &SizeLabel::XXXL), Ok(Cents(1300)));
        assert_eq!(table.lookup_cost(CategoryId(1), &SizeLabel::XXXXL), Ok(Cents(1250)));
    }

    #[test]
    fn four_xl_without_plus_overrides_uses_multiplier() {
        let table = CostTable::with_multiplier(vec![CostEntry::new(CategoryId(1), Cents(1000))], 1.25)
            .unwrap();
        assert_eq!(table.lookup_cost(CategoryId(1), &SizeLabel::XXXXL), Ok(Cents(1250)));

        // Rounded up, never down.
        let table = CostTable::with_multiplier(vec![CostEntry::new(CategoryId(1), Cents(1001))], 1.25)
            .unwrap();
        assert_eq!(table.lookup_cost(CategoryId(1), &SizeLabel::XXXXL), Ok(Cents(1252)));
    }

    #[test]
    fn unknown_category_is_not_found() {
        let table = CostTable::new(vec![tee()]).unwrap();
        assert_eq!(
            table.lookup_cost(CategoryId(999), &SizeLabel::M),
            Err(CostLookupError::NotFound(CategoryId(999)))
        );
    }

    #[test]
    fn rejects_non_positive_costs() {
        assert!(matches!(
            CostTable::new(vec![CostEntry::new(CategoryId(1), Cents(0))]),
            Err(CostTableError::InvalidBaseCost { .. })
        ));
        let bad = CostEntry::new(CategoryId(1), Cents(100)).with_override(SizeLabel::S, Cents(-1));
        assert!(matches!(
            CostTable::new(vec![bad]),
            Err(CostTableError::InvalidOverride { .. })
        ));
        assert!(matches!(
            CostTable::new(vec![tee(), tee()]),
            Err(CostTableError::DuplicateCategory(_))
        ));
    }

    #[test]
    fn decreasing_override_is_a_warning_not_an_error() {
        let entry = CostEntry::new(CategoryId(3), Cents(900))
            .with_override(SizeLabel::XL, Cents(1200))
            .with_override(SizeLabel::XXL, Cents(1100));
        let table = CostTable::new(vec![entry]).unwrap();
        let warnings = table.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].smaller, SizeLabel::XL);
        assert_eq!(warnings[0].larger, SizeLabel::XXL);
    }

    #[test]
    fn builtin_table_is_clean() {
        let table = CostTable::builtin();
        assert!(table.validate().is_empty());
        assert_eq!(table.get(CategoryId(6)).unwrap().base_cost, Cents(1167));
    }

    #[test]
    fn loads_json_with_size_keys() {
        let raw = r#"{
            "plus_size_multiplier": 1.5,
            "entries": [
                {"category_id": 6, "base_cost": 1167, "size_overrides": {"2XL": 1489, "XXXL": 1735}}
            ]
        }"#;
        let table = CostTable::from_json_str(raw).unwrap();
        assert_eq!(table.lookup_cost(CategoryId(6), &SizeLabel::XXXL), Ok(Cents(1735)));
        assert!((table.plus_size_multiplier() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn json_multiplier_below_one_is_rejected() {
        let raw = r#"{"plus_size_multiplier": 0.5, "entries": []}"#;
        assert!(matches!(
            CostTable::from_json_str(raw),
            Err(CostTableError::InvalidMultiplier(_))
        ));
    }
}
