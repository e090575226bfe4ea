//! Ordered ensure steps run by the reconcile pass. Each step drives one
//! dependent subsystem and reports observations through [`PassContext`]
//! instead of touching the persisted status directly, except for the
//! external connection pair which tracks the backend verbatim.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ResourceRequirements;
use kube::core::ObjectMeta;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;

use crate::config::OperatorConfig;
use crate::controller::ReconcileErr;
use crate::crd::storage_cluster::{Condition, StorageCluster};
use crate::defaults;
use crate::store::ClusterStore;

pub mod backend_config;
pub mod gateway;
pub mod quickstarts;
pub mod reef;


/// Phase hints raised by steps, consumed by phase derivation after the
/// last step has run.
#[derive(Clone, Copy, Debug, Default)]
pub struct SideSignals {
    pub expansion: bool,
    pub connecting: bool,
    pub connected: bool,
}

/// Scratch state threaded through one reconcile pass. The aggregate holds
/// negative conditions only; a pass that ends with it empty asserts the
/// all-clear bundle instead. `entry_phase` is the phase as persisted when
/// the pass began; interim phase writes never touch it, so steps can test
/// against the pre-pass state.
#[derive(Default)]
pub struct PassContext {
    pub aggregate: Vec<Condition>,
    pub signals: SideSignals,
    pub entry_phase: Option<String>,
}

impl PassContext {
    pub fn starting_from(entry_phase: Option<String>) -> Self {
        PassContext {
            entry_phase,
            ..PassContext::default()
        }
    }
}

#[async_trait]
pub trait ReconcileStep: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(
        &self,
        store: &dyn ClusterStore,
        owner: &mut StorageCluster,
        pass: &mut PassContext,
    ) -> Result<(), ReconcileErr>;
}

/// Production step order. Backend config precedes the backend itself so a
/// fresh reef cluster mounts a config map that already exists.
pub fn default_steps(cfg: &OperatorConfig) -> Vec<Box<dyn ReconcileStep>> {
    vec![
        Box::new(backend_config::BackendConfigStep),
        Box::new(reef::ReefClusterStep::new(cfg.backend_image.clone())),
        Box::new(gateway::ObjectGatewayStep::new(cfg.gateway_image.clone())),
        Box::new(quickstarts::QuickStartStep::new(cfg.quickstart_dir.clone())),
    ]
}

/// Metadata shared by every owned child: owner namespace, app label and a
/// controller owner reference when the owner has been persisted.
pub(crate) fn child_meta(owner: &StorageCluster, name: String) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: owner.meta().namespace.clone(),
        labels: Some(BTreeMap::from([("app".to_string(), owner.name_any())])),
        owner_references: owner.controller_owner_ref(&()).map(|r| vec![r]),
        ..ObjectMeta::default()
    }
}

/// Per-daemon resource requirements: spec override when present, built-in
/// profile otherwise.
pub(crate) fn resource_or_default(owner: &StorageCluster, key: &str) -> ResourceRequirements {
    owner
        .spec
        .resources
        .as_ref()
        .and_then(|m| m.get(key))
        .cloned()
        .unwrap_or_else(|| defaults::resource_requirements(key))
}
