//! Garment size labels and their ordering.

use serde::{Deserialize, Serialize};

/// Size label of a variant.
///
/// Apparel sizes have a rank (XS < S < ... < 5XL). Anything else (mug
/// volumes, "One size", poster dimensions) is kept verbatim in `Other` and
/// has no rank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SizeLabel {
    XS,
    S,
    M,
    L,
    XL,
    XXL,
    XXXL,
    XXXXL,
    XXXXXL,
    Other(String),
}

impl SizeLabel {
    /// Ranked apparel sizes, smallest first.
    pub const RANKED: [SizeLabel; 9] = [
        SizeLabel::XS,
        SizeLabel::S,
        SizeLabel::M,
        SizeLabel::L,
        SizeLabel::XL,
        SizeLabel::XXL,
        SizeLabel::XXXL,
        SizeLabel::XXXXL,
        SizeLabel::XXXXXL,
    ];

    /// Parse a label as printed by the catalog ("2XL", "XXL", "xl", ...).
    pub fn parse(raw: &str) -> Self {
        let norm = raw.trim().to_ascii_uppercase().replace(' ', "");
        match norm.as_str() {
            "XS" => SizeLabel::XS,
            "S" => SizeLabel::S,
            "M" => SizeLabel::M,
            "L" => SizeLabel::L,
            "XL" => SizeLabel::XL,
            "2XL" | "XXL" => SizeLabel::XXL,
            "3XL" | "XXXL" => SizeLabel::XXXL,
            "4XL" | "XXXXL" => SizeLabel::XXXXL,
            "5XL" | "XXXXXL" => SizeLabel::XXXXXL,
            _ => SizeLabel::Other(raw.trim().to_string()),
        }
    }

    /// Position in [`SizeLabel::RANKED`], `None` for unranked labels.
    pub fn rank(&self) -> Option<usize> {
        Self::RANKED.iter().position(|s| s == self)
    }

    /// 2XL and above. Plus sizes are priced off the nearest smaller plus size.
    pub fn is_plus(&self) -> bool {
        matches!(self.rank(), Some(r) if r >= 5)
    }

    pub fn as_str(&self) -> &str {
        match self {
            SizeLabel::XS => "XS",
            SizeLabel::S => "S",
            SizeLabel::M => "M",
            SizeLabel::L => "L",
            SizeLabel::XL => "XL",
            SizeLabel::XXL => "2XL",
            SizeLabel::XXXL => "3XL",
            SizeLabel::XXXXL => "4XL",
            SizeLabel::XXXXXL => "5XL",
            SizeLabel::Other(s) => s,
        }
    }
}

impl core::fmt::Display for SizeLabel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for SizeLabel {
    fn from(value: String) -> Self {
        SizeLabel::parse(&value)
    }
}

impl From<&str> for SizeLabel {
    fn from(value: &str) -> Self {
        SizeLabel::parse(value)
    }
}

impl From<SizeLabel> for String {
    fn from(value: SizeLabel) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_spellings() {
        assert_eq!(SizeLabel::parse("xxl"), SizeLabel::XXL);
        assert_eq!(SizeLabel::parse("2XL"), SizeLabel::XXL);
        assert_eq!(SizeLabel::parse(" 4xl "), SizeLabel::XXXXL);
        assert_eq!(SizeLabel::parse("11oz"), SizeLabel::Other("11oz".into()));
    }

    #[test]
    fn ranks_and_plus_sizes() {
        assert!(SizeLabel::S.rank() < SizeLabel::XL.rank());
        assert!(SizeLabel::XXL.is_plus());
        assert!(!SizeLabel::XL.is_plus());
        assert_eq!(SizeLabel::Other("One size".into()).rank(), None);
    }
}
