//! Status-subresource and finalizer writes.
//!
//! Writes address the object through the path builder registered at
//! `watch_resource` time, send a minimal body carrying the identity's
//! `resourceVersion`, and never throw: a conflict (stale resourceVersion),
//! an error status or a transport failure is logged and surfaced as `None`.
//! Callers re-derive a fresh identity from a later notification and retry
//! if the write must eventually land.

use std::sync::Arc;

use serde_json::json;
use serde_json::Value;
use tracing::error;

use crate::metrics;
use crate::operator::Registry;
use crate::ApiRequest;
use crate::ApiTransport;
use crate::ResourceIdentity;

pub(crate) struct StatusUpdater {
    pub(crate) transport: Arc<dyn ApiTransport>,
    pub(crate) registry: Arc<Registry>,
}

impl StatusUpdater {
    /// Full replacement of the `status` subresource (HTTP PUT semantics).
    /// The server rejects the write when the identity's `resourceVersion`
    /// is stale.
    pub(crate) async fn set_status(
        &self,
        identity: &ResourceIdentity,
        status: Value,
    ) -> Option<ResourceIdentity> {
        let request = ApiRequest::put(
            format!("{}/status", self.object_path(identity)?),
            self.status_body(identity, status),
        );
        self.send(identity, request, "set_status").await
    }

    /// RFC 7386 JSON merge patch of the `status` subresource; only the keys
    /// present in `status` are altered.
    pub(crate) async fn patch_status(
        &self,
        identity: &ResourceIdentity,
        status: Value,
    ) -> Option<ResourceIdentity> {
        let request = ApiRequest::merge_patch(
            format!("{}/status", self.object_path(identity)?),
            self.status_body(identity, status),
        );
        self.send(identity, request, "patch_status").await
    }

    /// Merge patch limited to `metadata.finalizers`. Never replaces anything
    /// else on the object: other controllers may hold their own finalizers
    /// concurrently.
    pub(crate) async fn set_finalizers(
        &self,
        identity: &ResourceIdentity,
        finalizers: Vec<String>,
    ) -> Option<ResourceIdentity> {
        let request = ApiRequest::merge_patch(
            self.object_path(identity)?,
            json!({ "metadata": { "finalizers": finalizers } }),
        );
        self.send(identity, request, "set_finalizers").await
    }

    /// Minimal write body: discriminators, coordinates, resourceVersion and
    /// the status payload. Deliberately never carries `spec` or unrelated
    /// metadata, so concurrent edits to those are not clobbered.
    fn status_body(
        &self,
        identity: &ResourceIdentity,
        status: Value,
    ) -> Value {
        let mut body = json!({
            "apiVersion": identity.api_version,
            "kind": identity.kind,
            "metadata": {
                "name": identity.name,
                "resourceVersion": identity.resource_version,
            },
            "status": status,
        });
        if let Some(namespace) = &identity.namespace {
            body["metadata"]["namespace"] = json!(namespace);
        }
        body
    }

    /// Server-relative path of the object itself.
    fn object_path(
        &self,
        identity: &ResourceIdentity,
    ) -> Option<String> {
        let Some(registration) = self.registry.get(&identity.collection_id) else {
            error!(
                "no watch registered for collection '{}'; dropping write",
                identity.collection_id
            );
            return None;
        };
        Some(format!(
            "{}/{}",
            (registration.path_builder)(identity),
            identity.name
        ))
    }

    async fn send(
        &self,
        identity: &ResourceIdentity,
        request: ApiRequest,
        operation: &str,
    ) -> Option<ResourceIdentity> {
        match self.transport.request(request).await {
            Ok(response) if response.is_success() => {
                // Chainable identity carrying the server's new resourceVersion.
                match ResourceIdentity::with_id(&identity.collection_id, &response.body) {
                    Ok(fresh) => Some(fresh),
                    Err(e) => {
                        error!(
                            "{} on '{}' succeeded but response body is unusable: {}",
                            operation, identity.name, e
                        );
                        None
                    }
                }
            }
            Ok(response) => {
                error!(
                    "{} on '{}' rejected with status {}",
                    operation, identity.name, response.status
                );
                metrics::RESOURCE_WRITE_FAILURES
                    .with_label_values(&[&identity.collection_id, operation])
                    .inc();
                None
            }
            Err(e) => {
                error!("{} on '{}' failed: {}", operation, identity.name, e);
                metrics::RESOURCE_WRITE_FAILURES
                    .with_label_values(&[&identity.collection_id, operation])
                    .inc();
                None
            }
        }
    }
}
