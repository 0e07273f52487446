use lazy_static::lazy_static;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;

lazy_static! {
    pub static ref WATCH_EVENTS_RECEIVED: IntCounterVec = IntCounterVec::new(
        Opts::new("watch_events_received", "Events decoded from watch streams"),
        &["collection_id", "event_type"]
    )
    .expect("metric can not be created");

    pub static ref WATCH_EVENTS_MALFORMED: IntCounterVec = IntCounterVec::new(
        Opts::new("watch_events_malformed", "Stream frames dropped as malformed"),
        &["collection_id"]
    )
    .expect("metric can not be created");

    pub static ref WATCH_RECONNECTS: IntCounterVec = IntCounterVec::new(
        Opts::new("watch_reconnects", "Watch stream reconnection attempts"),
        &["collection_id"]
    )
    .expect("metric can not be created");

    pub static ref WATCH_FATAL_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("watch_fatal_failures", "Watch supervisors terminated by a fatal transport failure"),
        &["collection_id"]
    )
    .expect("metric can not be created");

    pub static ref RESOURCE_WRITE_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("resource_write_failures", "Failed status/finalizer writes"),
        &["collection_id", "operation"]
    )
    .expect("metric can not be created");
}

/// Register the engine's metrics with an embedder-owned registry. The engine
/// itself never starts an exporter.
pub fn register_operator_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(WATCH_EVENTS_RECEIVED.clone()))?;
    registry.register(Box::new(WATCH_EVENTS_MALFORMED.clone()))?;
    registry.register(Box::new(WATCH_RECONNECTS.clone()))?;
    registry.register(Box::new(WATCH_FATAL_FAILURES.clone()))?;
    registry.register(Box::new(RESOURCE_WRITE_FAILURES.clone()))?;
    Ok(())
}
