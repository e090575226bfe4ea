//! Typed access to the objects this operator reads and writes. The trait is
//! the seam between reconcile logic and the API server: production uses
//! [`KubeStore`], tests substitute mocks or an in-memory map.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
#[cfg(test)]
use mockall::automock;

use crate::crd::object_gateway::ObjectGateway;
use crate::crd::quickstart::QuickStart;
use crate::crd::reef_cluster::ReefCluster;
use crate::crd::storage_cluster::StorageCluster;

mod kube_store;

pub use kube_store::KubeStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("conflict updating {kind} {name}")]
    Conflict { kind: &'static str, name: String },
    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: &'static str, name: String },
    #[error("{kind} object is missing metadata field {field}")]
    IncompleteMeta {
        kind: &'static str,
        field: &'static str,
    },
    #[error(transparent)]
    Api(#[from] kube::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Object-store operations the control loop depends on. Gets resolve
/// not-found to `Ok(None)`; creates and updates surface conflicts so the
/// whole pass can retry. Updates are whole-object replaces checked against
/// the resource version carried on the object.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterStore: Send + Sync {
    async fn get_cluster(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<StorageCluster>, StoreError>;
    async fn list_clusters(&self) -> Result<Vec<StorageCluster>, StoreError>;
    async fn update_cluster(&self, sc: &StorageCluster) -> Result<StorageCluster, StoreError>;
    async fn update_cluster_status(
        &self,
        sc: &StorageCluster,
    ) -> Result<StorageCluster, StoreError>;

    async fn get_reef_cluster(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ReefCluster>, StoreError>;
    async fn create_reef_cluster(&self, rc: &ReefCluster) -> Result<ReefCluster, StoreError>;
    async fn update_reef_cluster(&self, rc: &ReefCluster) -> Result<ReefCluster, StoreError>;
    async fn delete_reef_cluster(&self, namespace: &str, name: &str) -> Result<(), StoreError>;

    async fn get_gateway(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ObjectGateway>, StoreError>;
    async fn create_gateway(&self, gw: &ObjectGateway) -> Result<ObjectGateway, StoreError>;
    async fn update_gateway(&self, gw: &ObjectGateway) -> Result<ObjectGateway, StoreError>;
    async fn delete_gateway(&self, namespace: &str, name: &str) -> Result<(), StoreError>;

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, StoreError>;
    async fn create_config_map(&self, cm: &ConfigMap) -> Result<ConfigMap, StoreError>;
    async fn update_config_map(&self, cm: &ConfigMap) -> Result<ConfigMap, StoreError>;

    async fn get_quickstart(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<QuickStart>, StoreError>;
    async fn create_quickstart(&self, qs: &QuickStart) -> Result<QuickStart, StoreError>;
    async fn update_quickstart(&self, qs: &QuickStart) -> Result<QuickStart, StoreError>;
}
