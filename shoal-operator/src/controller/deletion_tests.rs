use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

use super::deletion::{DeletionOutcome, run_deletion};
use crate::crd::object_gateway::{ObjectGateway, ObjectGatewaySpec};
use crate::crd::reef_cluster::{ReefCluster, ReefClusterSpec};
use crate::crd::storage_cluster::{FINALIZER, StorageCluster, StorageClusterSpec};
use crate::store::{MockClusterStore, StoreError};

fn deleting_cluster(with_finalizer: bool) -> StorageCluster {
    let mut sc = StorageCluster::new("alpha", StorageClusterSpec::default());
    sc.metadata.namespace = Some("storage".into());
    sc.metadata.deletion_timestamp = Some(Time(chrono::Utc::now()));
    if with_finalizer {
        sc.metadata.finalizers = Some(vec![FINALIZER.to_string()]);
    }
    sc
}

#[tokio::test]
async fn no_finalizer_means_nothing_to_do() {
    let mut store = MockClusterStore::new();
    store
        .expect_update_cluster_status()
        .times(1)
        .returning(|sc| Ok(sc.clone()));

    let mut sc = deleting_cluster(false);
    let outcome = run_deletion(&store, &mut sc).await.unwrap();

    assert_eq!(outcome, DeletionOutcome::NoGuard);
    assert_eq!(sc.status.as_ref().unwrap().phase.as_deref(), Some("Deleting"));
}

#[tokio::test]
async fn gateway_is_deleted_before_the_backend() {
    let mut store = MockClusterStore::new();
    store
        .expect_update_cluster_status()
        .returning(|sc| Ok(sc.clone()));
    store.expect_get_gateway().returning(|ns, name| {
        assert_eq!((ns, name), ("storage", "alpha-gateway"));
        Ok(Some(ObjectGateway::new(name, ObjectGatewaySpec::default())))
    });
    store
        .expect_delete_gateway()
        .times(1)
        .returning(|_, _| Ok(()));

    let mut sc = deleting_cluster(true);
    let outcome = run_deletion(&store, &mut sc).await.unwrap();

    assert_eq!(outcome, DeletionOutcome::CleanupPending);
    assert!(sc.has_finalizer());
}

#[tokio::test]
async fn backend_goes_once_gateway_is_confirmed_gone() {
    let mut store = MockClusterStore::new();
    store
        .expect_update_cluster_status()
        .returning(|sc| Ok(sc.clone()));
    store.expect_get_gateway().returning(|_, _| Ok(None));
    store.expect_get_reef_cluster().returning(|ns, name| {
        assert_eq!((ns, name), ("storage", "alpha-reef"));
        Ok(Some(ReefCluster::new(name, ReefClusterSpec::default())))
    });
    store
        .expect_delete_reef_cluster()
        .times(1)
        .returning(|_, _| Ok(()));

    let mut sc = deleting_cluster(true);
    let outcome = run_deletion(&store, &mut sc).await.unwrap();

    assert_eq!(outcome, DeletionOutcome::CleanupPending);
    assert!(sc.has_finalizer());
}

#[tokio::test]
async fn finalizer_released_after_all_dependents_gone() {
    let mut store = MockClusterStore::new();
    store
        .expect_update_cluster_status()
        .returning(|sc| Ok(sc.clone()));
    store.expect_get_gateway().returning(|_, _| Ok(None));
    store.expect_get_reef_cluster().returning(|_, _| Ok(None));
    store
        .expect_update_cluster()
        .times(1)
        .returning(|sc| Ok(sc.clone()));

    let mut sc = deleting_cluster(true);
    let outcome = run_deletion(&store, &mut sc).await.unwrap();

    assert_eq!(outcome, DeletionOutcome::Finalized);
    assert!(!sc.has_finalizer());
}

#[tokio::test]
async fn phase_persist_failure_does_not_block_teardown() {
    let mut store = MockClusterStore::new();
    store.expect_update_cluster_status().returning(|_| {
        Err(StoreError::Conflict {
            kind: "StorageCluster",
            name: "alpha".into(),
        })
    });

    let mut sc = deleting_cluster(false);
    let outcome = run_deletion(&store, &mut sc).await.unwrap();
    assert_eq!(outcome, DeletionOutcome::NoGuard);
}

#[tokio::test]
async fn cleanup_failure_keeps_the_finalizer() {
    let mut store = MockClusterStore::new();
    store
        .expect_update_cluster_status()
        .returning(|sc| Ok(sc.clone()));
    store
        .expect_get_gateway()
        .returning(|_, name| Ok(Some(ObjectGateway::new(name, ObjectGatewaySpec::default()))));
    store.expect_delete_gateway().returning(|_, name| {
        Err(StoreError::Conflict {
            kind: "ObjectGateway",
            name: name.into(),
        })
    });

    let mut sc = deleting_cluster(true);
    let err = run_deletion(&store, &mut sc).await.unwrap_err();
    assert!(matches!(err, super::ReconcileErr::Store(_)));
    assert!(sc.has_finalizer());
}
