use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::{Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{ClusterStore, StoreError};
use crate::crd::object_gateway::ObjectGateway;
use crate::crd::quickstart::QuickStart;
use crate::crd::reef_cluster::ReefCluster;
use crate::crd::storage_cluster::StorageCluster;

/// [`ClusterStore`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn fetch<K>(
        &self,
        kind: &'static str,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        self.api::<K>(namespace)
            .get_opt(name)
            .await
            .map_err(|e| classify(kind, name, e))
    }

    async fn create<K>(&self, kind: &'static str, obj: &K) -> Result<K, StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Serialize + Debug,
        K::DynamicType: Default,
    {
        let (namespace, name) = ns_name(kind, obj.meta())?;
        self.api::<K>(namespace)
            .create(&PostParams::default(), obj)
            .await
            .map_err(|e| classify(kind, name, e))
    }

    async fn replace<K>(&self, kind: &'static str, obj: &K) -> Result<K, StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Serialize + Debug,
        K::DynamicType: Default,
    {
        let (namespace, name) = ns_name(kind, obj.meta())?;
        self.api::<K>(namespace)
            .replace(name, &PostParams::default(), obj)
            .await
            .map_err(|e| classify(kind, name, e))
    }

    async fn remove<K>(
        &self,
        kind: &'static str,
        namespace: &str,
        name: &str,
    ) -> Result<(), StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        match self
            .api::<K>(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
            Err(e) => Err(classify(kind, name, e)),
        }
    }
}

fn ns_name<'a>(
    kind: &'static str,
    meta: &'a ObjectMeta,
) -> Result<(&'a str, &'a str), StoreError> {
    let namespace = meta
        .namespace
        .as_deref()
        .ok_or(StoreError::IncompleteMeta {
            kind,
            field: "namespace",
        })?;
    let name = meta.name.as_deref().ok_or(StoreError::IncompleteMeta {
        kind,
        field: "name",
    })?;
    Ok((namespace, name))
}

fn classify(kind: &'static str, name: &str, err: kube::Error) -> StoreError {
    if let kube::Error::Api(ref ae) = err {
        if ae.code == 409 {
            if ae.reason == "AlreadyExists" {
                return StoreError::AlreadyExists {
                    kind,
                    name: name.to_string(),
                };
            }
            return StoreError::Conflict {
                kind,
                name: name.to_string(),
            };
        }
    }
    StoreError::Api(err)
}

#[async_trait]
impl ClusterStore for KubeStore {
    async fn get_cluster(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<StorageCluster>, StoreError> {
        self.fetch("StorageCluster", namespace, name).await
    }

    async fn list_clusters(&self) -> Result<Vec<StorageCluster>, StoreError> {
        let api: Api<StorageCluster> = Api::all(self.client.clone());
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(StoreError::Api)?;
        Ok(list.items)
    }

    async fn update_cluster(&self, sc: &StorageCluster) -> Result<StorageCluster, StoreError> {
        self.replace("StorageCluster", sc).await
    }

    async fn update_cluster_status(
        &self,
        sc: &StorageCluster,
    ) -> Result<StorageCluster, StoreError> {
        let (namespace, name) = ns_name("StorageCluster", sc.meta())?;
        let data = serde_json::to_vec(sc).map_err(kube::Error::SerdeError)?;
        self.api::<StorageCluster>(namespace)
            .replace_status(name, &PostParams::default(), data)
            .await
            .map_err(|e| classify("StorageCluster", name, e))
    }

    async fn get_reef_cluster(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ReefCluster>, StoreError> {
        self.fetch("ReefCluster", namespace, name).await
    }

    async fn create_reef_cluster(&self, rc: &ReefCluster) -> Result<ReefCluster, StoreError> {
        self.create("ReefCluster", rc).await
    }

    async fn update_reef_cluster(&self, rc: &ReefCluster) -> Result<ReefCluster, StoreError> {
        self.replace("ReefCluster", rc).await
    }

    async fn delete_reef_cluster(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.remove::<ReefCluster>("ReefCluster", namespace, name)
            .await
    }

    async fn get_gateway(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ObjectGateway>, StoreError> {
        self.fetch("ObjectGateway", namespace, name).await
    }

    async fn create_gateway(&self, gw: &ObjectGateway) -> Result<ObjectGateway, StoreError> {
        self.create("ObjectGateway", gw).await
    }

    async fn update_gateway(&self, gw: &ObjectGateway) -> Result<ObjectGateway, StoreError> {
        self.replace("ObjectGateway", gw).await
    }

    async fn delete_gateway(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.remove::<ObjectGateway>("ObjectGateway", namespace, name)
            .await
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, StoreError> {
        self.fetch("ConfigMap", namespace, name).await
    }

    async fn create_config_map(&self, cm: &ConfigMap) -> Result<ConfigMap, StoreError> {
        self.create("ConfigMap", cm).await
    }

    async fn update_config_map(&self, cm: &ConfigMap) -> Result<ConfigMap, StoreError> {
        self.replace("ConfigMap", cm).await
    }

    async fn get_quickstart(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<QuickStart>, StoreError> {
        self.fetch("QuickStart", namespace, name).await
    }

    async fn create_quickstart(&self, qs: &QuickStart) -> Result<QuickStart, StoreError> {
        self.create("QuickStart", qs).await
    }

    async fn update_quickstart(&self, qs: &QuickStart) -> Result<QuickStart, StoreError> {
        self.replace("QuickStart", qs).await
    }
}
