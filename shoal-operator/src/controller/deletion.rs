//! Teardown half of the control loop. Children that carry their own
//! external state are deleted in reverse dependency order, and the finalizer
//! is released only after every dependent is confirmed gone.

use tracing::{debug, info, warn};

use crate::controller::identity;
use crate::controller::phase::Phase;
use crate::controller::status;
use crate::controller::steps::{gateway, reef};
use crate::crd::storage_cluster::{FINALIZER, StorageCluster};
use crate::store::ClusterStore;

use super::ReconcileErr;

/// What one deletion pass accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// Dependents still exist; a later pass re-checks.
    CleanupPending,
    /// Dependents are gone and the finalizer was released.
    Finalized,
    /// The finalizer was never added, nothing to clean up.
    NoGuard,
}

pub async fn run_deletion(
    store: &dyn ClusterStore,
    sc: &mut StorageCluster,
) -> Result<DeletionOutcome, ReconcileErr> {
    status::set_phase(sc, Phase::Deleting);
    match store.update_cluster_status(sc).await {
        Ok(updated) => *sc = updated,
        Err(err) => warn!(error = %err, "failed to persist Deleting phase"),
    }

    if !sc.has_finalizer() {
        debug!("terminating without finalizer; nothing to clean up");
        return Ok(DeletionOutcome::NoGuard);
    }

    if !delete_dependents(store, sc).await? {
        return Ok(DeletionOutcome::CleanupPending);
    }

    let finals = sc.metadata.finalizers.get_or_insert_with(Vec::new);
    finals.retain(|f| f != FINALIZER);
    *sc = store.update_cluster(sc).await?;
    info!("dependents removed; released finalizer");
    Ok(DeletionOutcome::Finalized)
}

/// Delete dependents in reverse dependency order: the gateway consumes the
/// backend, so it goes first and the backend is only deleted once the
/// gateway is confirmed gone. Returns true when nothing is left.
async fn delete_dependents(
    store: &dyn ClusterStore,
    sc: &StorageCluster,
) -> Result<bool, ReconcileErr> {
    let (namespace, owner) = identity(sc)?;

    let gw_name = gateway::gateway_name(&owner);
    if store.get_gateway(&namespace, &gw_name).await?.is_some() {
        store.delete_gateway(&namespace, &gw_name).await?;
        info!(gateway = %gw_name, "deleted object gateway; waiting for removal");
        return Ok(false);
    }

    let reef_name = reef::reef_name(&owner);
    if store.get_reef_cluster(&namespace, &reef_name).await?.is_some() {
        store.delete_reef_cluster(&namespace, &reef_name).await?;
        info!(reef = %reef_name, "deleted reef cluster; waiting for removal");
        return Ok(false);
    }

    Ok(true)
}
