use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ResourceRequirements;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// External storage-backend cluster delegate. The reef operator owns the
/// lifecycle; this operator only converges the spec and watches the state it
/// reports back.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "reef.io",
    version = "v1",
    kind = "ReefCluster",
    plural = "reefclusters",
    namespaced,
    status = "ReefClusterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ReefClusterSpec {
    /// Connection to an externally provisioned cluster instead of local
    /// daemon provisioning.
    pub external: ExternalSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Host path used by reef daemons for local state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir_host_path: Option<String>,
    /// Requested capacity in device units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<BTreeMap<String, ResourceRequirements>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSpec {
    pub enable: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReefClusterStatus {
    /// Raw state string reported by the reef operator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// States the reef operator is known to report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReefState {
    Creating,
    Updating,
    Connecting,
    Connected,
    Error,
}

impl ReefState {
    /// Parse a reported state string. Returns `None` for values this
    /// operator does not recognize; empty strings are the caller's concern.
    pub fn parse(s: &str) -> Option<ReefState> {
        match s {
            "Creating" => Some(ReefState::Creating),
            "Updating" => Some(ReefState::Updating),
            "Connecting" => Some(ReefState::Connecting),
            "Connected" => Some(ReefState::Connected),
            "Error" => Some(ReefState::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReefState::Creating => "Creating",
            ReefState::Updating => "Updating",
            ReefState::Connecting => "Connecting",
            ReefState::Connected => "Connected",
            ReefState::Error => "Error",
        }
    }
}

impl ReefCluster {
    /// Reported state, if any. Empty strings count as unreported.
    pub fn reported_state(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.state.as_deref())
            .filter(|s| !s.is_empty())
    }
}
