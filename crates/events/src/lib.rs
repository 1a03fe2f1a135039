//! Sync events and inbound change notifications.
//!
//! - [`event`]: structured facts emitted by the engine while it works
//! - [`sink`]: the injectable sink those facts are written to
//! - [`notification`]: payloads pushed to us by the catalog service

pub mod event;
pub mod notification;
pub mod sink;

pub use event::{Severity, SyncEvent};
pub use notification::CatalogNotification;
pub use sink::{EventSink, NoopSink, RecordingSink};
