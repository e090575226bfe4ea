//! Create-or-update driver shared by every owned child resource.
//!
//! Each child kind plugs in through [`ChildKind`]. The driver owns the
//! ordering rules: when a drifted child still carries a reported state, that
//! state is persisted onto the owner's phase before the child spec is
//! overwritten, and every child it touches or confirms is recorded in the
//! owner's related object list.

use async_trait::async_trait;
use kube::Resource;
use tracing::{debug, info};

use crate::controller::status;
use crate::crd::storage_cluster::{RelatedObject, StorageCluster};
use crate::store::{ClusterStore, StoreError};

/// Adapter for one owned child kind.
#[async_trait]
pub trait ChildKind: Send + Sync {
    type Resource: Resource + Clone + Send + Sync;

    fn kind(&self) -> &'static str;
    fn api_version(&self) -> &'static str;

    /// Whether the child is recorded in `status.relatedObjects`.
    fn track_related(&self) -> bool {
        true
    }

    /// Last state the child itself reported, if any.
    fn observed_state(&self, found: &Self::Resource) -> Option<String>;

    fn specs_equal(&self, desired: &Self::Resource, found: &Self::Resource) -> bool;

    /// Overwrite the live object's desired section, keeping server-owned
    /// metadata intact so the update carries a valid resource version.
    fn copy_spec(&self, desired: &Self::Resource, onto: &mut Self::Resource);

    async fn get(
        &self,
        store: &dyn ClusterStore,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Self::Resource>, StoreError>;
    async fn create(
        &self,
        store: &dyn ClusterStore,
        obj: &Self::Resource,
    ) -> Result<Self::Resource, StoreError>;
    async fn update(
        &self,
        store: &dyn ClusterStore,
        obj: &Self::Resource,
    ) -> Result<Self::Resource, StoreError>;
}

/// Outcome of one [`converge`] call.
pub enum Convergence<R> {
    Created(R),
    Updated { current: R, previous: R },
    Unchanged(R),
}

impl<R> Convergence<R> {
    /// The live object after the call, whichever path was taken.
    pub fn resource(&self) -> &R {
        match self {
            Convergence::Created(r) | Convergence::Unchanged(r) => r,
            Convergence::Updated { current, .. } => current,
        }
    }
}

/// Drive one child toward `desired`. Absent children are created, drifted
/// children get exactly one wholesale spec overwrite, matching children are
/// left alone.
pub async fn converge<K: ChildKind>(
    child: &K,
    store: &dyn ClusterStore,
    owner: &mut StorageCluster,
    desired: K::Resource,
) -> Result<Convergence<K::Resource>, StoreError> {
    let namespace = match desired.meta().namespace.clone() {
        Some(ns) => ns,
        None => {
            return Err(StoreError::IncompleteMeta {
                kind: child.kind(),
                field: "namespace",
            });
        }
    };
    let name = match desired.meta().name.clone() {
        Some(name) => name,
        None => {
            return Err(StoreError::IncompleteMeta {
                kind: child.kind(),
                field: "name",
            });
        }
    };

    match child.get(store, &namespace, &name).await? {
        None => {
            let created = child.create(store, &desired).await?;
            info!(kind = child.kind(), %namespace, %name, "created child resource");
            if child.track_related() {
                register(child, owner, &namespace, &name);
            }
            Ok(Convergence::Created(created))
        }
        Some(found) if !child.specs_equal(&desired, &found) => {
            if let Some(state) = child.observed_state(&found) {
                status::set_phase_str(owner, &state);
                *owner = store.update_cluster_status(owner).await?;
            }
            let mut next = found.clone();
            child.copy_spec(&desired, &mut next);
            let current = child.update(store, &next).await?;
            info!(kind = child.kind(), %namespace, %name, "updated drifted child resource");
            if child.track_related() {
                register(child, owner, &namespace, &name);
            }
            Ok(Convergence::Updated {
                current,
                previous: found,
            })
        }
        Some(found) => {
            debug!(kind = child.kind(), %namespace, %name, "child resource already converged");
            if child.track_related() {
                register(child, owner, &namespace, &name);
            }
            Ok(Convergence::Unchanged(found))
        }
    }
}

fn register<K: ChildKind>(child: &K, owner: &mut StorageCluster, namespace: &str, name: &str) {
    let related = RelatedObject {
        api_version: child.api_version().to_string(),
        kind: child.kind().to_string(),
        name: name.to_string(),
        namespace: namespace.to_string(),
    };
    status::insert_related_object(&mut status::status_mut(owner).related_objects, related);
}
