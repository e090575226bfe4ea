#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::ObjectMeta;
use kube::{Resource, ResourceExt};

use shoal_operator::crd::object_gateway::{ObjectGateway, ObjectGatewayStatus};
use shoal_operator::crd::quickstart::QuickStart;
use shoal_operator::crd::reef_cluster::{ReefCluster, ReefClusterStatus};
use shoal_operator::crd::storage_cluster::{StorageCluster, StorageClusterSpec};
use shoal_operator::store::{ClusterStore, StoreError};

// DNS-1123 safe numeric suffix for unique names
pub const DIGITS: [char; 10] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
pub fn uniq(prefix: &str) -> String {
    format!("{prefix}-{}", nanoid::nanoid!(6, &DIGITS))
}

pub fn storage_cluster(ns: &str, name: &str, created_secs: i64) -> StorageCluster {
    let mut sc = StorageCluster::new(name, StorageClusterSpec::default());
    sc.meta_mut().namespace = Some(ns.to_string());
    sc.meta_mut().uid = Some(format!("uid-{name}"));
    sc.meta_mut().resource_version = Some("1".to_string());
    sc.meta_mut().creation_timestamp =
        Some(Time(Utc.timestamp_opt(created_secs, 0).unwrap()));
    sc
}

fn key(ns: &str, name: &str) -> String {
    format!("{ns}/{name}")
}

fn obj_key(
    kind: &'static str,
    ns: Option<String>,
    name: Option<String>,
) -> Result<String, StoreError> {
    let ns = ns.ok_or(StoreError::IncompleteMeta {
        kind,
        field: "namespace",
    })?;
    let name = name.ok_or(StoreError::IncompleteMeta { kind, field: "name" })?;
    Ok(key(&ns, &name))
}

fn bump(meta: &mut ObjectMeta) {
    let next = meta
        .resource_version
        .as_deref()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
        + 1;
    meta.resource_version = Some(next.to_string());
}

/// In-memory stand-in for the API server. Objects are whole-copy stored;
/// updates bump the resource version like the real store does.
#[derive(Default)]
pub struct FakeStore {
    clusters: Mutex<HashMap<String, StorageCluster>>,
    reefs: Mutex<HashMap<String, ReefCluster>>,
    gateways: Mutex<HashMap<String, ObjectGateway>>,
    config_maps: Mutex<HashMap<String, ConfigMap>>,
    quickstarts: Mutex<HashMap<String, QuickStart>>,
    pub status_updates: AtomicUsize,
}

impl FakeStore {
    pub fn with_cluster(sc: StorageCluster) -> Self {
        let store = FakeStore::default();
        store.put_cluster(sc);
        store
    }

    pub fn put_cluster(&self, sc: StorageCluster) {
        let k = key(&sc.namespace().unwrap(), &sc.name_any());
        self.clusters.lock().unwrap().insert(k, sc);
    }

    pub fn remove_cluster(&self, ns: &str, name: &str) {
        self.clusters.lock().unwrap().remove(&key(ns, name));
    }

    pub fn set_reef_state(&self, ns: &str, name: &str, state: &str) {
        let mut map = self.reefs.lock().unwrap();
        let rc = map.get_mut(&key(ns, name)).expect("reef cluster not stored");
        rc.status = Some(ReefClusterStatus {
            state: Some(state.to_string()),
            message: None,
        });
    }

    pub fn set_reef_error(&self, ns: &str, name: &str, message: &str) {
        let mut map = self.reefs.lock().unwrap();
        let rc = map.get_mut(&key(ns, name)).expect("reef cluster not stored");
        rc.status = Some(ReefClusterStatus {
            state: Some("Error".to_string()),
            message: Some(message.to_string()),
        });
    }

    pub fn set_gateway_phase(&self, ns: &str, name: &str, phase: &str) {
        let mut map = self.gateways.lock().unwrap();
        let gw = map.get_mut(&key(ns, name)).expect("gateway not stored");
        gw.status = Some(ObjectGatewayStatus {
            phase: Some(phase.to_string()),
            message: None,
        });
    }

    pub fn status_update_count(&self) -> usize {
        self.status_updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterStore for FakeStore {
    async fn get_cluster(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<StorageCluster>, StoreError> {
        Ok(self.clusters.lock().unwrap().get(&key(namespace, name)).cloned())
    }

    async fn list_clusters(&self) -> Result<Vec<StorageCluster>, StoreError> {
        Ok(self.clusters.lock().unwrap().values().cloned().collect())
    }

    async fn update_cluster(&self, sc: &StorageCluster) -> Result<StorageCluster, StoreError> {
        let k = obj_key("StorageCluster", sc.namespace(), sc.meta().name.clone())?;
        let mut stored = sc.clone();
        bump(stored.meta_mut());
        self.clusters.lock().unwrap().insert(k, stored.clone());
        Ok(stored)
    }

    async fn update_cluster_status(
        &self,
        sc: &StorageCluster,
    ) -> Result<StorageCluster, StoreError> {
        self.status_updates.fetch_add(1, Ordering::SeqCst);
        let k = obj_key("StorageCluster", sc.namespace(), sc.meta().name.clone())?;
        let mut stored = sc.clone();
        bump(stored.meta_mut());
        self.clusters.lock().unwrap().insert(k, stored.clone());
        Ok(stored)
    }

    async fn get_reef_cluster(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ReefCluster>, StoreError> {
        Ok(self.reefs.lock().unwrap().get(&key(namespace, name)).cloned())
    }

    async fn create_reef_cluster(&self, rc: &ReefCluster) -> Result<ReefCluster, StoreError> {
        let k = obj_key("ReefCluster", rc.namespace(), rc.meta().name.clone())?;
        let mut map = self.reefs.lock().unwrap();
        if map.contains_key(&k) {
            return Err(StoreError::AlreadyExists {
                kind: "ReefCluster",
                name: k,
            });
        }
        let mut stored = rc.clone();
        stored.meta_mut().resource_version = Some("1".to_string());
        map.insert(k, stored.clone());
        Ok(stored)
    }

    async fn update_reef_cluster(&self, rc: &ReefCluster) -> Result<ReefCluster, StoreError> {
        let k = obj_key("ReefCluster", rc.namespace(), rc.meta().name.clone())?;
        let mut stored = rc.clone();
        bump(stored.meta_mut());
        self.reefs.lock().unwrap().insert(k, stored.clone());
        Ok(stored)
    }

    async fn delete_reef_cluster(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.reefs.lock().unwrap().remove(&key(namespace, name));
        Ok(())
    }

    async fn get_gateway(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ObjectGateway>, StoreError> {
        Ok(self.gateways.lock().unwrap().get(&key(namespace, name)).cloned())
    }

    async fn create_gateway(&self, gw: &ObjectGateway) -> Result<ObjectGateway, StoreError> {
        let k = obj_key("ObjectGateway", gw.namespace(), gw.meta().name.clone())?;
        let mut map = self.gateways.lock().unwrap();
        if map.contains_key(&k) {
            return Err(StoreError::AlreadyExists {
                kind: "ObjectGateway",
                name: k,
            });
        }
        let mut stored = gw.clone();
        stored.meta_mut().resource_version = Some("1".to_string());
        map.insert(k, stored.clone());
        Ok(stored)
    }

    async fn update_gateway(&self, gw: &ObjectGateway) -> Result<ObjectGateway, StoreError> {
        let k = obj_key("ObjectGateway", gw.namespace(), gw.meta().name.clone())?;
        let mut stored = gw.clone();
        bump(stored.meta_mut());
        self.gateways.lock().unwrap().insert(k, stored.clone());
        Ok(stored)
    }

    async fn delete_gateway(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.gateways.lock().unwrap().remove(&key(namespace, name));
        Ok(())
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, StoreError> {
        Ok(self
            .config_maps
            .lock()
            .unwrap()
            .get(&key(namespace, name))
            .cloned())
    }

    async fn create_config_map(&self, cm: &ConfigMap) -> Result<ConfigMap, StoreError> {
        let k = obj_key("ConfigMap", cm.namespace(), cm.meta().name.clone())?;
        let mut map = self.config_maps.lock().unwrap();
        if map.contains_key(&k) {
            return Err(StoreError::AlreadyExists {
                kind: "ConfigMap",
                name: k,
            });
        }
        let mut stored = cm.clone();
        stored.meta_mut().resource_version = Some("1".to_string());
        map.insert(k, stored.clone());
        Ok(stored)
    }

    async fn update_config_map(&self, cm: &ConfigMap) -> Result<ConfigMap, StoreError> {
        let k = obj_key("ConfigMap", cm.namespace(), cm.meta().name.clone())?;
        let mut stored = cm.clone();
        bump(stored.meta_mut());
        self.config_maps.lock().unwrap().insert(k, stored.clone());
        Ok(stored)
    }

    async fn get_quickstart(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<QuickStart>, StoreError> {
        Ok(self
            .quickstarts
            .lock()
            .unwrap()
            .get(&key(namespace, name))
            .cloned())
    }

    async fn create_quickstart(&self, qs: &QuickStart) -> Result<QuickStart, StoreError> {
        let k = obj_key("QuickStart", qs.namespace(), qs.meta().name.clone())?;
        let mut map = self.quickstarts.lock().unwrap();
        if map.contains_key(&k) {
            return Err(StoreError::AlreadyExists {
                kind: "QuickStart",
                name: k,
            });
        }
        let mut stored = qs.clone();
        stored.meta_mut().resource_version = Some("1".to_string());
        map.insert(k, stored.clone());
        Ok(stored)
    }

    async fn update_quickstart(&self, qs: &QuickStart) -> Result<QuickStart, StoreError> {
        let k = obj_key("QuickStart", qs.namespace(), qs.meta().name.clone())?;
        let mut stored = qs.clone();
        bump(stored.meta_mut());
        self.quickstarts.lock().unwrap().insert(k, stored.clone());
        Ok(stored)
    }
}
