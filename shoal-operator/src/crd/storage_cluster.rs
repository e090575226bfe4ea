use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::ResourceRequirements;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Deletion-guard token held on every live StorageCluster.
pub const FINALIZER: &str = "storagecluster.shoal.io";

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "shoal.io",
    version = "v1alpha1",
    kind = "StorageCluster",
    plural = "storageclusters",
    shortname = "stc",
    namespaced,
    status = "StorageClusterStatus",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct StorageClusterSpec {
    /// Container image for the backend cluster delegate; falls back to the
    /// operator-wide default when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_image: Option<String>,
    /// Container image for the object-gateway delegate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_image: Option<String>,
    /// Requested backend capacity in device units. Growing this value
    /// triggers a capacity expansion on the backend cluster.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_count: Option<i32>,
    /// Raw configuration entries rendered into the backend config object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<BTreeMap<String, String>>,
    /// Per-daemon resource-requirement overrides, merged over the built-in
    /// defaults table (keys: monitor, manager, storage-node, gateway-core,
    /// gateway-db, gateway-db-vol).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<BTreeMap<String, ResourceRequirements>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorageClusterStatus {
    /// Current lifecycle phase. Re-derived every reconcile pass; may
    /// transiently carry a raw child state while a spec update is in flight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// K8s-style conditions, at most one record per type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// Child resources this cluster manages, keyed by identity.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_objects: Vec<RelatedObject>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: ConditionType,
    pub status: ConditionStatus,
    /// Machine-readable reason for the last transition.
    pub reason: String,
    /// Human-readable detail.
    pub message: String,
    /// Last time the status value changed (not the message).
    #[serde(rename = "lastTransitionTime")]
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Build a condition stamped with the current time. The store adjusts
    /// the timestamp on upsert to preserve earlier transitions.
    pub fn new(
        type_: ConditionType,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_,
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionType {
    /// The last reconcile pass ran to completion.
    ReconcileComplete,
    Available,
    Progressing,
    Degraded,
    Upgradeable,
    /// Connection to the external backend is being established.
    ExternalConnecting,
    /// Connection to the external backend is established.
    ExternalConnected,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// Reference to a child resource, keyed by (kind, namespace, name).
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RelatedObject {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub namespace: String,
}

impl RelatedObject {
    pub fn same_identity(&self, other: &RelatedObject) -> bool {
        self.kind == other.kind && self.namespace == other.namespace && self.name == other.name
    }
}

impl StorageCluster {
    pub fn has_finalizer(&self) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|t| t == FINALIZER))
    }

    pub fn deletion_requested(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }
}
