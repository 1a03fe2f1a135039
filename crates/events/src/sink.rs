//! Event sinks.
//!
//! Components take an `Arc<dyn EventSink>` instead of logging directly, so the
//! core stays testable and the log backend is swappable.

use std::sync::{Arc, Mutex};

use crate::event::SyncEvent;

/// Destination for [`SyncEvent`]s. Emitting must never fail or block on IO.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SyncEvent);
}

impl<S> EventSink for Arc<S>
where
    S: EventSink + ?Sized,
{
    fn emit(&self, event: SyncEvent) {
        (**self).emit(event)
    }
}

impl std::fmt::Debug for dyn EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn EventSink")
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: SyncEvent) {}
}

/// Keeps every event in memory, in emission order. For tests/dev.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Events whose [`SyncEvent::event_type`] equals `event_type`.
    pub fn of_type(&self, event_type: &str) -> Vec<SyncEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: SyncEvent) {
        // A poisoned lock only means another test thread panicked mid-push.
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_keeps_order_through_arc() {
        let sink = Arc::new(RecordingSink::new());
        let dyn_sink: Arc<dyn EventSink> = sink.clone();
        dyn_sink.emit(SyncEvent::CostTableWarning { message: "a".into() });
        dyn_sink.emit(SyncEvent::NotificationIgnored {
            kind: "x".into(),
            reason: "b".into(),
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type(), "pricing.cost_table.warning");
        assert_eq!(sink.of_type("notification.ignored").len(), 1);
    }
}
