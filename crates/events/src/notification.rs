//! Inbound change notifications (catalog webhooks).
//!
//! The sender retries anything it does not see acknowledged, so parsing is
//! total: every body maps to some variant, and unrecognized or broken
//! payloads become [`CatalogNotification::Unknown`] /
//! [`CatalogNotification::Malformed`] instead of errors.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use printsync_core::{ProductId, ShopId};

/// Recognized webhook payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogNotification {
    ProductUpdated {
        shop_id: ShopId,
        product_id: ProductId,
    },
    ProductDeleted {
        shop_id: ShopId,
        product_id: ProductId,
    },
    PublishStarted {
        shop_id: ShopId,
        product_id: ProductId,
    },
    /// Well-formed envelope with an event type we do not handle.
    Unknown { kind: String },
    /// Body could not be interpreted at all.
    Malformed { reason: String },
}

#[derive(Debug, Deserialize)]
struct RawNotification {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<JsonValue>,
    #[serde(default)]
    shop_id: Option<JsonValue>,
}

#[derive(Debug, Clone, Copy)]
enum RecognizedKind {
    Updated,
    Deleted,
    PublishStarted,
}

/// Upstream sends ids either as strings or bare numbers.
fn id_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl CatalogNotification {
    pub fn parse(body: &[u8]) -> Self {
        let raw: RawNotification = match serde_json::from_slice(body) {
            Ok(raw) => raw,
            Err(e) => {
                return CatalogNotification::Malformed {
                    reason: format!("invalid JSON envelope: {e}"),
                };
            }
        };

        let kind = match raw.kind.as_str() {
            "product:updated" => RecognizedKind::Updated,
            "product:deleted" => RecognizedKind::Deleted,
            "product:publish:started" => RecognizedKind::PublishStarted,
            _ => return CatalogNotification::Unknown { kind: raw.kind },
        };

        let shop_id = match raw.shop_id.as_ref().and_then(id_text).map(ShopId::new) {
            Some(Ok(id)) => id,
            Some(Err(e)) => {
                return CatalogNotification::Malformed {
                    reason: format!("{}: {e}", raw.kind),
                };
            }
            None => {
                return CatalogNotification::Malformed {
                    reason: format!("{}: missing shop_id", raw.kind),
                };
            }
        };

        let product_id = match raw
            .data
            .as_ref()
            .and_then(|d| d.get("id"))
            .and_then(id_text)
            .map(ProductId::new)
        {
            Some(Ok(id)) => id,
            Some(Err(e)) => {
                return CatalogNotification::Malformed {
                    reason: format!("{}: {e}", raw.kind),
                };
            }
            None => {
                return CatalogNotification::Malformed {
                    reason: format!("{}: missing data.id", raw.kind),
                };
            }
        };

        match kind {
            RecognizedKind::Updated => CatalogNotification::ProductUpdated {
                shop_id,
                product_id,
            },
            RecognizedKind::Deleted => CatalogNotification::ProductDeleted {
                shop_id,
                product_id,
            },
            RecognizedKind::PublishStarted => CatalogNotification::PublishStarted {
                shop_id,
                product_id,
            },
        }
    }

    /// Event type as sent by the catalog, or a placeholder for broken bodies.
    pub fn kind(&self) -> &str {
        match self {
            CatalogNotification::ProductUpdated { .. } => "product:updated",
            CatalogNotification::ProductDeleted { .. } => "product:deleted",
            CatalogNotification::PublishStarted { .. } => "product:publish:started",
            CatalogNotification::Unknown { kind } => kind,
            CatalogNotification::Malformed { .. } => "malformed",
        }
    }
}
