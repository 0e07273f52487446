//! Operator Engine Error Hierarchy
//!
//! Defines error types for the operator runtime, categorized by the layer
//! they originate from: transport, watch-stream decoding, configuration and
//! definition registration.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level failures (connection, request transmission)
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Watch stream decoding failures
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// Configuration loading/validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Custom resource definition registration failures.
    /// Any response other than success or 409 (already exists) lands here.
    #[error("Definition registration failed: {0}")]
    Registration(String),

    /// Unrecoverable failures surfaced through the operator's fatal signal
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection establishment or mid-request transmission failure.
    /// Watch supervisors treat this as transient and reconnect.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Failures the transport has classified as unrecoverable (e.g. an
    /// auth rejection on watch establishment). Watch supervisors do NOT
    /// retry these; they end the supervisor and fire the operator's
    /// fatal signal.
    #[error("Fatal transport failure: {0}")]
    Fatal(String),

    /// Request/response body encoding errors
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// A stream frame whose object is missing one of the identity fields
    /// (metadata.name, metadata.resourceVersion, apiVersion, kind).
    /// Drops that single notification, never the stream.
    #[error("Malformed event object for '{collection_id}'")]
    MalformedEvent { collection_id: String },

    /// A stream frame carrying an event type other than ADDED/MODIFIED/DELETED
    #[error("Unknown watch event type '{0}'")]
    UnknownEventType(String),
}
