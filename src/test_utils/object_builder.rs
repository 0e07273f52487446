use serde_json::json;
use serde_json::Value;

use crate::ResourceEvent;
use crate::ResourceEventType;
use crate::ResourceIdentity;
use crate::WatchFrame;

/// Builds raw API objects for tests.
pub struct RawObjectBuilder {
    api_version: String,
    kind: String,
    name: String,
    namespace: Option<String>,
    resource_version: String,
    deletion_timestamp: Option<String>,
    finalizers: Option<Vec<String>>,
    spec: Option<Value>,
}

impl RawObjectBuilder {
    pub fn new(
        name: &str,
        resource_version: &str,
    ) -> Self {
        Self {
            api_version: "example.io/v1".to_string(),
            kind: "Widget".to_string(),
            name: name.to_string(),
            namespace: None,
            resource_version: resource_version.to_string(),
            deletion_timestamp: None,
            finalizers: None,
            spec: None,
        }
    }

    pub fn api_version(
        mut self,
        api_version: &str,
    ) -> Self {
        self.api_version = api_version.to_string();
        self
    }

    pub fn kind(
        mut self,
        kind: &str,
    ) -> Self {
        self.kind = kind.to_string();
        self
    }

    pub fn namespace(
        mut self,
        namespace: &str,
    ) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    pub fn deletion_timestamp(
        mut self,
        timestamp: &str,
    ) -> Self {
        self.deletion_timestamp = Some(timestamp.to_string());
        self
    }

    pub fn finalizers(
        mut self,
        finalizers: &[&str],
    ) -> Self {
        self.finalizers = Some(finalizers.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn spec(
        mut self,
        spec: Value,
    ) -> Self {
        self.spec = Some(spec);
        self
    }

    pub fn build(self) -> Value {
        let mut metadata = json!({
            "name": self.name,
            "resourceVersion": self.resource_version,
        });
        if let Some(namespace) = self.namespace {
            metadata["namespace"] = json!(namespace);
        }
        if let Some(timestamp) = self.deletion_timestamp {
            metadata["deletionTimestamp"] = json!(timestamp);
        }
        if let Some(finalizers) = self.finalizers {
            metadata["finalizers"] = json!(finalizers);
        }
        let mut object = json!({
            "apiVersion": self.api_version,
            "kind": self.kind,
            "metadata": metadata,
        });
        if let Some(spec) = self.spec {
            object["spec"] = spec;
        }
        object
    }
}

/// A well-formed `widgets.example.io/v1` object.
pub fn widget(
    name: &str,
    resource_version: &str,
) -> Value {
    RawObjectBuilder::new(name, resource_version).build()
}

pub fn added(object: Value) -> WatchFrame {
    WatchFrame::new("ADDED", object)
}

pub fn modified(object: Value) -> WatchFrame {
    WatchFrame::new("MODIFIED", object)
}

pub fn deleted(object: Value) -> WatchFrame {
    WatchFrame::new("DELETED", object)
}

/// Build the event a watch on `plural` would deliver for `object`.
pub fn event_for(
    plural: &str,
    event_type: ResourceEventType,
    object: Value,
) -> ResourceEvent {
    let identity = ResourceIdentity::with_plural(plural, &object).expect("well-formed test object");
    ResourceEvent {
        identity,
        event_type,
        object,
    }
}
