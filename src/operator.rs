//! The operator composition root.
//!
//! An [`Operator`] owns the transport, the watch registry and the single
//! event sequencer. The embedder supplies an [`OperatorHooks`] whose `init`
//! registers definitions and watches once at startup; reconciliation
//! handlers then call back into the status/finalizer primitives.
//!
//! ## Example Usage
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use op_engine::*;
//! # struct MyHooks;
//! # #[async_trait::async_trait]
//! # impl OperatorHooks for MyHooks {
//! #     async fn init(&self, _operator: &Operator) -> Result<()> {
//! #         Ok(())
//! #     }
//! # }
//! # async fn run(transport: Arc<dyn ApiTransport>) -> Result<()> {
//! let operator = Arc::new(Operator::new(transport));
//! operator.start(&MyHooks).await?;
//! if let Some(fatal) = operator.fatal_signal().await {
//!     operator.stop();
//!     return Err(fatal);
//! }
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::event_handler;
use crate::finalizer;
use crate::status::StatusUpdater;
use crate::watch::WatchSupervisor;
use crate::ApiRequest;
use crate::ApiTransport;
use crate::Error;
use crate::EventSequencer;
use crate::OperatorConfig;
use crate::ResourceEvent;
use crate::ResourceIdentity;
use crate::Result;

#[cfg(test)]
use mockall::automock;

/// Builds the server-relative collection path for one object identity.
/// Registered per collection so later writes never re-derive
/// group/version/plural.
pub(crate) type PathBuilder = Box<dyn Fn(&ResourceIdentity) -> String + Send + Sync>;

pub(crate) struct WatchRegistration {
    pub(crate) path_builder: PathBuilder,
    pub(crate) cancel: CancellationToken,
}

pub(crate) type Registry = DashMap<String, WatchRegistration>;

/// Startup hook supplied by the concrete controller: register definitions
/// and watches here. Invoked exactly once by [`Operator::start`].
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait OperatorHooks: Send + Sync {
    async fn init(
        &self,
        operator: &Operator,
    ) -> Result<()>;
}

/// Watch coordinates extracted from an installed definition document. Using
/// these for `watch_resource` keeps watches from disagreeing with the
/// definition actually installed.
#[derive(Debug, Clone)]
pub struct DefinitionCoordinates {
    pub group: String,
    pub versions: Vec<DefinitionVersion>,
    pub plural: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefinitionVersion {
    pub name: String,
    #[serde(default)]
    pub served: bool,
    #[serde(default)]
    pub storage: bool,
}

#[derive(Debug, Deserialize)]
struct DefinitionDocument {
    metadata: DefinitionMetadata,
    spec: DefinitionSpec,
}

#[derive(Debug, Deserialize)]
struct DefinitionMetadata {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DefinitionSpec {
    group: String,
    #[serde(default)]
    versions: Vec<DefinitionVersion>,
    names: DefinitionNames,
}

#[derive(Debug, Deserialize)]
struct DefinitionNames {
    plural: String,
}

pub struct Operator {
    transport: Arc<dyn ApiTransport>,
    config: OperatorConfig,
    registry: Arc<Registry>,
    sequencer: EventSequencer,
    updater: StatusUpdater,
    cancel: CancellationToken,
    fatal_tx: mpsc::UnboundedSender<Error>,
    fatal_rx: Mutex<mpsc::UnboundedReceiver<Error>>,
}

impl Operator {
    /// Construct an operator with default configuration. Must be called from
    /// within a Tokio runtime (the sequencer spawns its drain task here).
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self::with_config(transport, OperatorConfig::default())
    }

    pub fn with_config(
        transport: Arc<dyn ApiTransport>,
        config: OperatorConfig,
    ) -> Self {
        let registry = Arc::new(Registry::new());
        let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();
        Self {
            updater: StatusUpdater {
                transport: transport.clone(),
                registry: registry.clone(),
            },
            transport,
            config,
            registry,
            sequencer: EventSequencer::new(),
            cancel: CancellationToken::new(),
            fatal_tx,
            fatal_rx: Mutex::new(fatal_rx),
        }
    }

    /// Run the operator, typically called from main(). Invokes the hooks'
    /// `init` once; a registration failure propagates out of here.
    pub async fn start(
        &self,
        hooks: &dyn OperatorHooks,
    ) -> Result<()> {
        hooks.init(self).await
    }

    /// Abort every registered watch stream. Does not cancel a handler
    /// currently executing inside the sequencer and does not drain queued
    /// notifications: events may still be processed briefly after stop.
    pub fn stop(&self) {
        self.cancel.cancel();
        for registration in self.registry.iter() {
            registration.cancel.cancel();
        }
        debug!("operator stopped; all watch streams aborted");
    }

    /// Resolves when a supervisor terminates on a fatal transport failure.
    /// The caller decides the shutdown strategy; the engine never exits the
    /// process itself. `None` once the operator is fully shut down.
    pub async fn fatal_signal(&self) -> Option<Error> {
        self.fatal_rx.lock().await.recv().await
    }

    /// Register a custom resource definition from an already-parsed
    /// document. A 409 (already exists) response counts as success, so
    /// registration is idempotent; any other non-success response is fatal.
    pub async fn register_definition(
        &self,
        document: Value,
    ) -> Result<DefinitionCoordinates> {
        let parsed: DefinitionDocument = serde_json::from_value(document.clone())
            .map_err(|e| Error::Registration(format!("malformed definition document: {e}")))?;

        let request = ApiRequest::post(self.transport.definitions_path(), document);
        let response = self.transport.request(request).await?;

        if response.is_success() {
            info!(
                "registered custom resource definition '{}'",
                parsed.metadata.name
            );
        } else if response.status == 409 {
            // API returns a 409 Conflict if the definition already exists.
            debug!(
                "custom resource definition '{}' already registered",
                parsed.metadata.name
            );
        } else {
            return Err(Error::Registration(format!(
                "'{}' rejected with status {}",
                parsed.metadata.name, response.status
            )));
        }

        Ok(DefinitionCoordinates {
            group: parsed.spec.group,
            versions: parsed.spec.versions,
            plural: parsed.spec.names.plural,
        })
    }

    /// Watch a resource collection. `group` is empty for core resources.
    /// Spawns a supervisor that keeps the watch alive forever; `handler` is
    /// invoked through the operator's single sequencer, one event at a time
    /// across all watched collections.
    pub async fn watch_resource<F, Fut>(
        &self,
        group: &str,
        version: &str,
        plural: &str,
        namespace: Option<&str>,
        handler: F,
    ) -> Result<()>
    where
        F: Fn(ResourceEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let api_version = if group.is_empty() {
            version.to_string()
        } else {
            format!("{group}/{version}")
        };
        let id = format!("{plural}.{api_version}");

        if self.registry.contains_key(&id) {
            warn!("watch on {id} already registered; replacing its path builder");
        }

        // The path builder scopes by the *object's* namespace so writes on a
        // namespaced object land on the right path even when the watch
        // itself is cluster-wide.
        let path_builder = {
            let group = group.to_string();
            let version = version.to_string();
            let plural = plural.to_string();
            Box::new(move |identity: &ResourceIdentity| {
                collection_path(&group, &version, &plural, identity.namespace.as_deref())
            })
        };

        let cancel = self.cancel.child_token();
        self.registry.insert(
            id.clone(),
            WatchRegistration {
                path_builder,
                cancel: cancel.clone(),
            },
        );

        WatchSupervisor {
            collection_id: id.clone(),
            plural: plural.to_string(),
            path: collection_path(group, version, plural, namespace),
            transport: self.transport.clone(),
            handler: event_handler(handler),
            sequencer: self.sequencer.clone(),
            settings: self.config.watch,
            cancel,
            fatal_tx: self.fatal_tx.clone(),
        }
        .spawn();

        info!("watching resource {id}");
        Ok(())
    }

    /// Set the status subresource of a resource (full replace). On conflict
    /// or transport failure the error is logged and `None` is returned; the
    /// caller retries from a fresh identity if the write must land.
    pub async fn set_status(
        &self,
        identity: &ResourceIdentity,
        status: Value,
    ) -> Option<ResourceIdentity> {
        self.updater.set_status(identity, status).await
    }

    /// Patch the status subresource (RFC 7386 JSON merge patch): only the
    /// keys present in `status` are altered.
    pub async fn patch_status(
        &self,
        identity: &ResourceIdentity,
        status: Value,
    ) -> Option<ResourceIdentity> {
        self.updater.patch_status(identity, status).await
    }

    /// Set (or clear) this engine's view of the resource's finalizer list
    /// via a merge patch limited to `metadata.finalizers`.
    pub async fn set_finalizers(
        &self,
        identity: &ResourceIdentity,
        finalizers: Vec<String>,
    ) -> Option<ResourceIdentity> {
        self.updater.set_finalizers(identity, finalizers).await
    }

    /// Handle deletion of a resource using a unique finalizer. Call this on
    /// every Added/Modified event; returns `true` when the event was fully
    /// handled by the protocol and must not be reconciled further.
    /// `delete_action` runs to completion before the finalizer is removed
    /// and must tolerate at-least-once invocation.
    pub async fn handle_resource_finalizer<F, Fut>(
        &self,
        event: &ResourceEvent,
        finalizer: &str,
        delete_action: F,
    ) -> Result<bool>
    where
        F: FnOnce(ResourceEvent) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        finalizer::handle_resource_finalizer(&self.updater, event, finalizer, delete_action).await
    }
}

/// Server-relative collection path: `/apis/{group}/{version}/` for grouped
/// resources, `/api/{version}/` for core, plus the namespace scope when set.
fn collection_path(
    group: &str,
    version: &str,
    plural: &str,
    namespace: Option<&str>,
) -> String {
    let mut path = if group.is_empty() {
        format!("/api/{version}/")
    } else {
        format!("/apis/{group}/{version}/")
    };
    if let Some(namespace) = namespace {
        path.push_str(&format!("namespaces/{namespace}/"));
    }
    path.push_str(plural);
    path
}
