//! Strongly-typed identifiers used across the catalog domain.
//!
//! Shop and product identifiers are opaque strings issued by the upstream
//! catalog service. They end up in URL paths, so only `[A-Za-z0-9_-]` is
//! accepted.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a sales destination (storefront, marketplace).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShopId(String);

/// Identifier of a product row inside one shop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductId(String);

/// Identifier of a product variant (size/colour combination).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(pub u64);

/// Identifier of a product category (the upstream "blueprint").
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub u32);

fn validate_opaque(value: &str, name: &str) -> Result<(), DomainError> {
    if value.is_empty() {
        return Err(DomainError::invalid_id(format!("{name}: empty")));
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(DomainError::invalid_id(format!(
            "{name}: unexpected character {bad:?} in {value:?}"
        )));
    }
    Ok(())
}

macro_rules! impl_string_id {
    ($t:ident, $name:literal) => {
        impl $t {
            /// Validate and wrap an upstream identifier.
            pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
                let value = value.into();
                validate_opaque(&value, $name)?;
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s.trim())
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_string_id!(ShopId, "ShopId");
impl_string_id!(ProductId, "ProductId");

macro_rules! impl_numeric_id {
    ($t:ident, $inner:ty) => {
        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$inner> for $t {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }
    };
}

impl_numeric_id!(VariantId, u64);
impl_numeric_id!(CategoryId, u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_upstream_hex_and_numeric_ids() {
        let product: ProductId = "5d39b411749d0a000f30e0f4".parse().unwrap();
        let shop: ShopId = " 1234567 ".parse().unwrap();
        assert_eq!(product.as_str(), "5d39b411749d0a000f30e0f4");
        assert_eq!(shop.to_string(), "1234567");
    }

    #[test]
    fn rejects_path_characters() {
        let err = ShopId::new("12/../34").unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(_)));
        assert!(ProductId::new("").is_err());
    }

    #[test]
    fn serde_goes_through_validation() {
        let ok: ShopId = serde_json::from_str("\"shop_1\"").unwrap();
        assert_eq!(ok.as_str(), "shop_1");
        assert!(serde_json::from_str::<ShopId>("\"a b\"").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"shop_1\"");
    }
}
