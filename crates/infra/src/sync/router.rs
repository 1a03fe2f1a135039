//! Routes inbound catalog notifications to propagation.
//!
//! The sender only needs to know the body arrived; every outcome here,
//! including propagation failure, is reported back as data.

use std::sync::Arc;

use serde::Serialize;

use printsync_events::{CatalogNotification, EventSink, SyncEvent};

use super::propagator::{CrossShopPropagator, PropagationSummary};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationOutcome {
    Propagated { summary: PropagationSummary },
    PropagationFailed { error: String },
    Ignored { kind: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct NotificationRouter {
    propagator: Arc<CrossShopPropagator>,
    sink: Arc<dyn EventSink>,
}

impl NotificationRouter {
    pub fn new(propagator: Arc<CrossShopPropagator>, sink: Arc<dyn EventSink>) -> Self {
        Self { propagator, sink }
    }

    pub async fn handle(&self, body: &[u8]) -> NotificationOutcome {
        let notification = CatalogNotification::parse(body);
        let kind = notification.kind().to_string();

        let reason = match notification {
            CatalogNotification::ProductUpdated {
                shop_id,
                product_id,
            } => {
                if shop_id == *self.propagator.group().master() {
                    return match self.propagator.propagate(&product_id).await {
                        Ok(summary) => NotificationOutcome::Propagated { summary },
                        Err(e) => NotificationOutcome::PropagationFailed {
                            error: e.to_string(),
                        },
                    };
                }
                format!("shop {shop_id} is not the master shop")
            }
            CatalogNotification::ProductDeleted { .. } | CatalogNotification::PublishStarted { .. } => {
                "no action for this event type".to_string()
            }
            CatalogNotification::Unknown { .. } => "unrecognized event type".to_string(),
            CatalogNotification::Malformed { reason } => reason,
        };

        self.ignore(kind, reason)
    }

    /// Acknowledge a delivery without acting on it.
    pub fn ignore(&self, kind: impl Into<String>, reason: impl Into<String>) -> NotificationOutcome {
        let kind = kind.into();
        let reason = reason.into();
        self.sink.emit(SyncEvent::NotificationIgnored {
            kind: kind.clone(),
            reason: reason.clone(),
        });
        NotificationOutcome::Ignored { kind, reason }
    }
}
