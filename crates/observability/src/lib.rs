//! Tracing, logging and the `tracing`-backed event sink (shared setup).

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, layers).
pub mod tracing;

/// [`printsync_events::EventSink`] that writes structured `tracing` records.
pub mod sink;

pub use sink::TracingSink;
