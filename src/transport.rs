//! The transport seam between the operator engine and the API server.
//!
//! The engine never opens sockets itself. A concrete [`ApiTransport`] owns
//! the server address, TLS material and authentication, and exposes exactly
//! two capabilities: plain request/response and a line-delimited watch
//! stream. All paths handed to the transport are server-relative URIs.

use futures::stream::BoxStream;
use serde::Deserialize;
use serde_json::Value;

#[cfg(test)]
use mockall::automock;

use crate::TransportError;

/// HTTP verbs the engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
}

/// Body encoding for write requests.
///
/// `MergePatchJson` must be sent as `application/merge-patch+json`
/// (RFC 7386) so the server applies the body key-by-key instead of as a
/// full replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    MergePatchJson,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub content_type: ContentType,
}

impl ApiRequest {
    pub fn post(path: String, body: Value) -> Self {
        Self {
            method: Method::Post,
            path,
            body: Some(body),
            content_type: ContentType::Json,
        }
    }

    pub fn put(path: String, body: Value) -> Self {
        Self {
            method: Method::Put,
            path,
            body: Some(body),
            content_type: ContentType::Json,
        }
    }

    pub fn merge_patch(path: String, body: Value) -> Self {
        Self {
            method: Method::Patch,
            path,
            body: Some(body),
            content_type: ContentType::MergePatchJson,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One decoded line of a watch stream: `{"type": "...", "object": {...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchFrame {
    #[serde(rename = "type")]
    pub event_type: String,
    pub object: Value,
}

impl WatchFrame {
    pub fn new(
        event_type: impl Into<String>,
        object: Value,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            object,
        }
    }
}

pub type WatchFrameStream = BoxStream<'static, std::result::Result<WatchFrame, TransportError>>;

#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ApiTransport: Send + Sync + 'static {
    /// Send one request and await the full response. An HTTP-level error
    /// status is NOT a transport error; it comes back as an [`ApiResponse`]
    /// so callers can apply their own policy (e.g. 409 on registration).
    async fn request(
        &self,
        request: ApiRequest,
    ) -> std::result::Result<ApiResponse, TransportError>;

    /// Open a streaming watch against a collection endpoint. The transport
    /// adds the `watch=true` query parameter itself; `params` carries any
    /// extra parameters (e.g. `resourceVersion` on resume).
    ///
    /// Returning [`TransportError::Fatal`] here ends the calling supervisor
    /// permanently; any other error is retried forever.
    async fn open_watch_stream(
        &self,
        path: String,
        params: Vec<(String, String)>,
    ) -> std::result::Result<WatchFrameStream, TransportError>;

    /// Server-relative path of the custom resource definitions endpoint.
    fn definitions_path(&self) -> String {
        "/apis/apiextensions.k8s.io/v1/customresourcedefinitions".to_string()
    }
}
