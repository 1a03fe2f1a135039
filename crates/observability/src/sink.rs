use printsync_events::{EventSink, Severity, SyncEvent};

/// Renders each [`SyncEvent`] as one `tracing` record.
///
/// The event name goes into `event_type` and the full payload into `payload`
/// (JSON), so the JSON formatter emits one flat, queryable line per event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for TracingSink {
    fn emit(&self, event: SyncEvent) {
        let event_type = event.event_type();
        let payload = serde_json::to_string(&event).unwrap_or_default();

        match event.severity() {
            Severity::Debug => {
                tracing::debug!(target: "printsync", event_type, payload = %payload, "sync event")
            }
            Severity::Info => {
                tracing::info!(target: "printsync", event_type, payload = %payload, "sync event")
            }
            Severity::Warn => {
                tracing::warn!(target: "printsync", event_type, payload = %payload, "sync event")
            }
            Severity::Error => {
                tracing::error!(target: "printsync", event_type, payload = %payload, "sync event")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printsync_core::ShopId;

    #[test]
    fn emitting_without_subscriber_is_harmless() {
        let sink = TracingSink::new();
        sink.emit(SyncEvent::LedgerDegraded {
            action: "is_processed",
            operation: printsync_core::OperationType::PriceUpdate,
            shop_id: ShopId::new("1").unwrap(),
            entity_id: printsync_core::ProductId::new("p").unwrap(),
            error: "connection refused".into(),
        });
    }
}
