use k8s_openapi::api::core::v1::ResourceRequirements;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Object-gateway delegate (S3-compatible frontend). Owned by the tern
/// operator; this operator converges the spec and observes the phase.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "tern.io",
    version = "v1alpha1",
    kind = "ObjectGateway",
    plural = "objectgateways",
    namespaced,
    status = "ObjectGatewayStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ObjectGatewaySpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core_resources: Option<ResourceRequirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_resources: Option<ResourceRequirements>,
    /// Storage request for the gateway database volume.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_volume_resources: Option<ResourceRequirements>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectGatewayStatus {
    /// Raw phase string reported by the tern operator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Phases the tern operator is known to report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayPhase {
    Verifying,
    Creating,
    Connecting,
    Configuring,
    Ready,
    Rejected,
}

impl GatewayPhase {
    pub fn parse(s: &str) -> Option<GatewayPhase> {
        match s {
            "Verifying" => Some(GatewayPhase::Verifying),
            "Creating" => Some(GatewayPhase::Creating),
            "Connecting" => Some(GatewayPhase::Connecting),
            "Configuring" => Some(GatewayPhase::Configuring),
            "Ready" => Some(GatewayPhase::Ready),
            "Rejected" => Some(GatewayPhase::Rejected),
            _ => None,
        }
    }
}

impl ObjectGateway {
    pub fn reported_phase(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.phase.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_covers_known_phases() {
        for s in [
            "Verifying",
            "Creating",
            "Connecting",
            "Configuring",
            "Ready",
            "Rejected",
        ] {
            assert!(GatewayPhase::parse(s).is_some(), "{s} should parse");
        }
        assert_eq!(GatewayPhase::parse("Paused"), None);
    }
}
