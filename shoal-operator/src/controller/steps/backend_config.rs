//! Backend configuration step. Renders spec-level config overrides into the
//! `<owner>-reef-config` config map the backend pods mount.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::ResourceExt;
use std::collections::BTreeMap;

use crate::controller::ReconcileErr;
use crate::controller::convergence::{ChildKind, converge};
use crate::controller::steps::{PassContext, ReconcileStep, child_meta};
use crate::crd::storage_cluster::StorageCluster;
use crate::store::{ClusterStore, StoreError};

const CONFIG_KEY: &str = "config";

pub fn config_map_name(owner: &str) -> String {
    format!("{owner}-reef-config")
}

/// Render the override map as an ini fragment under `[global]`. BTreeMap
/// iteration keeps the output stable across passes.
fn render_backend_config(overrides: Option<&BTreeMap<String, String>>) -> String {
    let mut out = String::from("[global]\n");
    if let Some(map) = overrides {
        for (key, value) in map {
            out.push_str(&format!("{key} = {value}\n"));
        }
    }
    out
}

fn desired_config_map(owner: &StorageCluster) -> ConfigMap {
    ConfigMap {
        metadata: child_meta(owner, config_map_name(&owner.name_any())),
        data: Some(BTreeMap::from([(
            CONFIG_KEY.to_string(),
            render_backend_config(owner.spec.config.as_ref()),
        )])),
        ..ConfigMap::default()
    }
}

struct ConfigMapKind;

#[async_trait]
impl ChildKind for ConfigMapKind {
    type Resource = ConfigMap;

    fn kind(&self) -> &'static str {
        "ConfigMap"
    }

    fn api_version(&self) -> &'static str {
        "v1"
    }

    fn track_related(&self) -> bool {
        false
    }

    fn observed_state(&self, _found: &ConfigMap) -> Option<String> {
        None
    }

    fn specs_equal(&self, desired: &ConfigMap, found: &ConfigMap) -> bool {
        desired.data == found.data
    }

    fn copy_spec(&self, desired: &ConfigMap, onto: &mut ConfigMap) {
        onto.data = desired.data.clone();
    }

    async fn get(
        &self,
        store: &dyn ClusterStore,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, StoreError> {
        store.get_config_map(namespace, name).await
    }

    async fn create(
        &self,
        store: &dyn ClusterStore,
        obj: &ConfigMap,
    ) -> Result<ConfigMap, StoreError> {
        store.create_config_map(obj).await
    }

    async fn update(
        &self,
        store: &dyn ClusterStore,
        obj: &ConfigMap,
    ) -> Result<ConfigMap, StoreError> {
        store.update_config_map(obj).await
    }
}

pub struct BackendConfigStep;

#[async_trait]
impl ReconcileStep for BackendConfigStep {
    fn name(&self) -> &'static str {
        "backend-config"
    }

    async fn run(
        &self,
        store: &dyn ClusterStore,
        owner: &mut StorageCluster,
        _pass: &mut PassContext,
    ) -> Result<(), ReconcileErr> {
        let desired = desired_config_map(owner);
        converge(&ConfigMapKind, store, owner, desired).await?;
        Ok(())
    }
}
