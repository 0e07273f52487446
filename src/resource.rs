//! Resource identity and event types.
//!
//! A [`ResourceIdentity`] captures everything a later write needs to address
//! one server-side object: coordinates, discriminators and the opaque
//! `resourceVersion` token the server uses for optimistic-concurrency
//! conflict detection. Identities are constructed fresh per inbound stream
//! frame and are deliberately cheap value types.

use serde::Deserialize;
use serde_json::Value;

use crate::Result;
use crate::WatchError;

/// The watch event type, mirroring the wire values `ADDED`/`MODIFIED`/`DELETED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceEventType {
    Added,
    Modified,
    Deleted,
}

impl std::str::FromStr for ResourceEventType {
    type Err = WatchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ADDED" => Ok(ResourceEventType::Added),
            "MODIFIED" => Ok(ResourceEventType::Modified),
            "DELETED" => Ok(ResourceEventType::Deleted),
            other => Err(WatchError::UnknownEventType(other.to_string())),
        }
    }
}

/// Identity/version metadata for one server-side object.
///
/// `collection_id` identifies the *watched collection*
/// (`"{plural}.{apiVersion}"`), not the individual object. The
/// `resource_version` must be echoed back verbatim on writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdentity {
    pub collection_id: String,
    pub name: String,
    pub namespace: Option<String>,
    pub resource_version: String,
    pub api_version: String,
    pub kind: String,
}

impl ResourceIdentity {
    /// Build an identity for an object of a watched collection, deriving the
    /// collection id from the plural name and the object's `apiVersion`.
    pub fn with_plural(
        plural: &str,
        object: &Value,
    ) -> Result<Self> {
        let api_version = object.get("apiVersion").and_then(Value::as_str).unwrap_or("");
        Self::from_object(format!("{}.{}", plural, api_version), object)
    }

    /// Build an identity echoing an existing collection id. Used to re-derive
    /// a fresh identity from a write response body.
    pub fn with_id(
        id: &str,
        object: &Value,
    ) -> Result<Self> {
        Self::from_object(id.to_string(), object)
    }

    fn from_object(
        collection_id: String,
        object: &Value,
    ) -> Result<Self> {
        let malformed = || WatchError::MalformedEvent {
            collection_id: collection_id.clone(),
        };

        let metadata = object.get("metadata").ok_or_else(malformed)?;
        let name = non_empty(metadata.get("name")).ok_or_else(malformed)?;
        let resource_version = non_empty(metadata.get("resourceVersion")).ok_or_else(malformed)?;
        let api_version = non_empty(object.get("apiVersion")).ok_or_else(malformed)?;
        let kind = non_empty(object.get("kind")).ok_or_else(malformed)?;
        let namespace = non_empty(metadata.get("namespace"));

        Ok(Self {
            collection_id,
            name,
            namespace,
            resource_version,
            api_version,
            kind,
        })
    }
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A change notification on a watched resource. Created per inbound stream
/// frame, handed to the registered handler exactly once, then discarded.
#[derive(Debug, Clone)]
pub struct ResourceEvent {
    pub identity: ResourceIdentity,
    pub event_type: ResourceEventType,
    pub object: Value,
}

/// The subset of `metadata` the finalizer protocol inspects.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ObjectMetadata {
    #[serde(default)]
    pub deletion_timestamp: Option<String>,
    #[serde(default)]
    pub finalizers: Option<Vec<String>>,
}

impl ObjectMetadata {
    /// Extract `metadata` from a raw object. `None` when the object carries
    /// no metadata block at all.
    pub(crate) fn of(object: &Value) -> Option<Self> {
        object
            .get("metadata")
            .and_then(|m| serde_json::from_value(m.clone()).ok())
    }
}
