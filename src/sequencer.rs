//! Single ordered delivery channel for all watch notifications.
//!
//! Every supervisor of an operator pushes into one sequencer, and the
//! sequencer invokes exactly one handler at a time, in arrival order,
//! regardless of which collection produced the event. Reconciliation logic
//! for different resources of one controller commonly shares mutable
//! external state (the target cluster); serializing all handling removes an
//! entire class of interleaving races at the cost of throughput.
//!
//! The queue is unbounded: a fast-arriving stream can enqueue arbitrarily
//! far ahead of a slow handler. This is an explicit capacity risk the
//! embedder accepts.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::error;

use crate::ResourceEvent;
use crate::Result;

/// The caller-supplied reconciliation callback for one watched collection.
pub type EventHandler = Arc<dyn Fn(ResourceEvent) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Wrap an async closure into an [`EventHandler`].
pub fn event_handler<F, Fut>(f: F) -> EventHandler
where
    F: Fn(ResourceEvent) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |event| Box::pin(f(event)))
}

struct QueuedEvent {
    event: ResourceEvent,
    handler: EventHandler,
}

/// FIFO queue with a single drain task.
///
/// The next event is not dequeued until the previous handler invocation has
/// completed. A failed handler is logged at error level and the queue
/// continues: one failed reconciliation never stalls or reorders the
/// pipeline.
#[derive(Clone)]
pub struct EventSequencer {
    tx: mpsc::UnboundedSender<QueuedEvent>,
}

impl EventSequencer {
    /// Create the sequencer and spawn its drain task. Must be called from
    /// within a Tokio runtime.
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueuedEvent>();

        tokio::spawn(async move {
            while let Some(QueuedEvent { event, handler }) = rx.recv().await {
                if let Err(e) = (handler)(event.clone()).await {
                    error!(
                        "event handler for {} '{}' failed: {}",
                        event.identity.collection_id, event.identity.name, e
                    );
                }
            }
            debug!("event sequencer drained and closed");
        });

        Self { tx }
    }

    /// Enqueue one notification for ordered delivery.
    pub fn push(
        &self,
        event: ResourceEvent,
        handler: EventHandler,
    ) {
        if self.tx.send(QueuedEvent { event, handler }).is_err() {
            // Drain task gone; only reachable after runtime shutdown.
            error!("event sequencer closed; dropping notification");
        }
    }
}

impl Default for EventSequencer {
    fn default() -> Self {
        Self::new()
    }
}
