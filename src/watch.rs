//! Durable watch supervision.
//!
//! One [`WatchSupervisor`] owns one logical watch against one collection
//! endpoint and keeps it alive forever: on stream error or clean
//! end-of-stream it re-opens the same watch after a fixed short delay,
//! indefinitely. Only a [`TransportError::Fatal`] on establishment ends the
//! supervisor, firing the operator's fatal signal so the embedder decides
//! the shutdown strategy.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::metrics;
use crate::ApiTransport;
use crate::Error;
use crate::EventHandler;
use crate::EventSequencer;
use crate::ResourceEvent;
use crate::ResourceEventType;
use crate::ResourceIdentity;
use crate::TransportError;
use crate::WatchConfig;
use crate::WatchFrame;
use crate::WatchFrameStream;

/// Why one stream incarnation ended.
enum StreamExit {
    /// Stream error or clean end-of-stream; reconnect after the fixed delay.
    Disconnected(String),
    /// `stop()` was called; the supervisor ends.
    Cancelled,
}

pub(crate) struct WatchSupervisor {
    pub(crate) collection_id: String,
    pub(crate) plural: String,
    /// Collection watch endpoint, server-relative.
    pub(crate) path: String,
    pub(crate) transport: Arc<dyn ApiTransport>,
    pub(crate) handler: EventHandler,
    pub(crate) sequencer: EventSequencer,
    pub(crate) settings: WatchConfig,
    pub(crate) cancel: CancellationToken,
    pub(crate) fatal_tx: mpsc::UnboundedSender<Error>,
}

impl WatchSupervisor {
    pub(crate) fn spawn(self) {
        tokio::spawn(self.run());
    }

    async fn run(self) {
        let delay = Duration::from_millis(self.settings.reconnect_delay_ms);
        // Last resourceVersion seen on this watch; only sent back to the
        // server when resume_from_resource_version is enabled.
        let mut last_version: Option<String> = None;

        loop {
            if self.cancel.is_cancelled() {
                debug!("watch on {} stopped", self.collection_id);
                return;
            }

            match self.open(&last_version).await {
                Ok(stream) => match self.consume(stream, &mut last_version).await {
                    StreamExit::Disconnected(reason) => {
                        warn!(
                            "restarting watch on resource {} (reason: {})",
                            self.collection_id, reason
                        );
                    }
                    StreamExit::Cancelled => {
                        debug!("watch on {} stopped", self.collection_id);
                        return;
                    }
                },
                Err(TransportError::Fatal(msg)) => {
                    error!(
                        "fatal failure establishing watch on {}: {}",
                        self.collection_id, msg
                    );
                    metrics::WATCH_FATAL_FAILURES
                        .with_label_values(&[&self.collection_id])
                        .inc();
                    let _ = self.fatal_tx.send(Error::Fatal(format!(
                        "watch on {} failed: {}",
                        self.collection_id, msg
                    )));
                    return;
                }
                Err(e) => {
                    warn!(
                        "restarting watch on resource {} (reason: {})",
                        self.collection_id, e
                    );
                }
            }

            metrics::WATCH_RECONNECTS
                .with_label_values(&[&self.collection_id])
                .inc();

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("watch on {} stopped", self.collection_id);
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn open(
        &self,
        last_version: &Option<String>,
    ) -> std::result::Result<WatchFrameStream, TransportError> {
        let mut params = Vec::new();
        if self.settings.resume_from_resource_version {
            if let Some(version) = last_version {
                params.push(("resourceVersion".to_string(), version.clone()));
            }
        }
        self.transport.open_watch_stream(self.path.clone(), params).await
    }

    async fn consume(
        &self,
        mut stream: WatchFrameStream,
        last_version: &mut Option<String>,
    ) -> StreamExit {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return StreamExit::Cancelled,
                frame = stream.next() => match frame {
                    Some(Ok(frame)) => self.dispatch(frame, last_version),
                    Some(Err(e)) => return StreamExit::Disconnected(e.to_string()),
                    None => return StreamExit::Disconnected("stream closed".to_string()),
                }
            }
        }
    }

    /// Convert one frame into a notification and enqueue it. A malformed
    /// frame aborts only that notification, never the stream.
    fn dispatch(
        &self,
        frame: WatchFrame,
        last_version: &mut Option<String>,
    ) {
        let event_type = match ResourceEventType::from_str(&frame.event_type) {
            Ok(t) => t,
            Err(e) => {
                warn!("dropping frame on {}: {}", self.collection_id, e);
                metrics::WATCH_EVENTS_MALFORMED
                    .with_label_values(&[&self.collection_id])
                    .inc();
                return;
            }
        };

        match ResourceIdentity::with_plural(&self.plural, &frame.object) {
            Ok(identity) => {
                *last_version = Some(identity.resource_version.clone());
                metrics::WATCH_EVENTS_RECEIVED
                    .with_label_values(&[&self.collection_id, &frame.event_type])
                    .inc();
                self.sequencer.push(
                    ResourceEvent {
                        identity,
                        event_type,
                        object: frame.object,
                    },
                    self.handler.clone(),
                );
            }
            Err(e) => {
                warn!("dropping frame on {}: {}", self.collection_id, e);
                metrics::WATCH_EVENTS_MALFORMED
                    .with_label_values(&[&self.collection_id])
                    .inc();
            }
        }
    }
}
