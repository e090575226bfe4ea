//! One full reconcile pass over a storage cluster: seed, deletion handoff,
//! singleton guard, finalizer, ordered steps, condition fold, phase, final
//! persist. All state lives on the object or in the pass context.

use chrono::Utc;
use kube::{Resource, ResourceExt};
use tracing::{debug, error, info, warn};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

use crate::controller::conditions::{self, REASON_INIT, REASON_RECONCILE_COMPLETED};
use crate::controller::deletion::{DeletionOutcome, run_deletion};
use crate::controller::phase::{Phase, PhaseInput, derive_phase};
use crate::controller::status;
use crate::controller::steps::{PassContext, ReconcileStep};
use crate::crd::storage_cluster::{
    Condition, ConditionStatus, ConditionType, FINALIZER, StorageCluster,
};
use crate::ready::ReadinessFile;
use crate::store::ClusterStore;

use super::ReconcileErr;

/// Terminal decision of one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Steps ran to completion and status was persisted.
    Reconciled,
    /// Deletion in progress, dependents still draining.
    Deleting,
    /// Finalizer released (or never present) on a terminating object.
    Finalized,
    /// Superseded by an older instance; left untouched.
    Ignored,
}

pub async fn run_pass(
    store: &dyn ClusterStore,
    ready: &ReadinessFile,
    steps: &[Box<dyn ReconcileStep>],
    sc: &mut StorageCluster,
) -> Result<PassOutcome, ReconcileErr> {
    if status::conditions(sc).is_empty() {
        conditions::seed_baseline(
            &mut status::status_mut(sc).conditions,
            REASON_INIT,
            "Initializing storage cluster",
            Utc::now(),
        );
        *sc = store.update_cluster_status(sc).await?;
        debug!("seeded baseline conditions");
    }

    if sc.deletion_requested() {
        return match run_deletion(store, sc).await? {
            DeletionOutcome::CleanupPending => Ok(PassOutcome::Deleting),
            DeletionOutcome::NoGuard | DeletionOutcome::Finalized => Ok(PassOutcome::Finalized),
        };
    }

    if let Some(active) = superseding_peer(store, sc).await? {
        if !status::phase_is(sc, Phase::Ignored) {
            status::set_phase(sc, Phase::Ignored);
            *sc = store.update_cluster_status(sc).await?;
        }
        warn!(active = %active, "ignoring storage cluster; an older instance is active");
        return Ok(PassOutcome::Ignored);
    }

    if !sc.has_finalizer() {
        sc.meta_mut()
            .finalizers
            .get_or_insert_with(Vec::new)
            .push(FINALIZER.to_string());
        *sc = store.update_cluster(sc).await?;
        debug!("added finalizer");
    }

    let mut pass = PassContext::starting_from(status::current_phase(sc).map(str::to_string));
    for step in steps {
        let result = step.run(store, sc, &mut pass).await;
        stage_progress(store, sc, &pass).await;
        if let Err(err) = result {
            conditions::set_error(
                &mut status::status_mut(sc).conditions,
                &format!("Error while reconciling: {err}"),
                Utc::now(),
            );
            status::set_phase(sc, Phase::Error);
            if let Err(persist_err) = store.update_cluster_status(sc).await {
                warn!(error = %persist_err, "failed to persist error status");
            }
            error!(step = step.name(), error = %err, "reconcile step failed");
            return Err(err);
        }
    }

    let now = Utc::now();
    let aggregate_empty = pass.aggregate.is_empty();
    if aggregate_empty {
        conditions::set_complete(&mut status::status_mut(sc).conditions, now);
        ready.set()?;
    } else {
        let st = status::status_mut(sc);
        for cond in pass.aggregate.drain(..) {
            conditions::upsert(&mut st.conditions, cond, now);
        }
        conditions::upsert(
            &mut st.conditions,
            Condition::new(
                ConditionType::ReconcileComplete,
                ConditionStatus::True,
                REASON_RECONCILE_COMPLETED,
                "Reconcile completed successfully",
            ),
            now,
        );
        if conditions::is_false(&st.conditions, ConditionType::Upgradeable) {
            ready.unset()?;
        }
    }

    let phase = derive_phase(&PhaseInput {
        deleting: false,
        expansion: pass.signals.expansion,
        connecting: pass.signals.connecting,
        connected: pass.signals.connected,
        aggregate_empty,
        conditions: status::conditions(sc),
    });
    status::set_phase(sc, phase);
    *sc = store.update_cluster_status(sc).await?;
    info!(phase = %phase, "reconcile pass complete");
    Ok(PassOutcome::Reconciled)
}

/// Interim phase bookkeeping between steps. Expansion and plain progress are
/// persisted right away so watchers see them; the connection phases are only
/// staged in memory for final derivation.
async fn stage_progress(store: &dyn ClusterStore, sc: &mut StorageCluster, pass: &PassContext) {
    let persist = if pass.signals.expansion {
        status::set_phase(sc, Phase::ExpandingCapacity);
        true
    } else if pass.signals.connecting {
        status::set_phase(sc, Phase::Connecting);
        false
    } else if pass.signals.connected {
        status::set_phase(sc, Phase::Connected);
        false
    } else if !matches!(
        status::current_phase(sc),
        Some("Ready") | Some("Connecting") | Some("Connected")
    ) {
        status::set_phase(sc, Phase::Progressing);
        true
    } else {
        false
    };

    if persist {
        match store.update_cluster_status(sc).await {
            Ok(updated) => *sc = updated,
            Err(err) => warn!(error = %err, "failed to persist interim phase"),
        }
    }
}

/// Singleton guard: exactly one StorageCluster is reconciled per cluster,
/// the one with the oldest creation timestamp (ties broken by namespace and
/// name). Returns the active peer's identity when this object loses.
async fn superseding_peer(
    store: &dyn ClusterStore,
    sc: &StorageCluster,
) -> Result<Option<String>, ReconcileErr> {
    let peers = store.list_clusters().await?;
    let mine = peer_key(sc);
    let mut winner: Option<(Option<Time>, String, String)> = None;
    for peer in &peers {
        let key = peer_key(peer);
        if winner.as_ref().map(|w| key < *w).unwrap_or(true) {
            winner = Some(key);
        }
    }
    Ok(winner.filter(|w| *w != mine).map(|(_, ns, name)| format!("{ns}/{name}")))
}

fn peer_key(sc: &StorageCluster) -> (Option<Time>, String, String) {
    (
        sc.meta().creation_timestamp.clone(),
        sc.namespace().unwrap_or_default(),
        sc.name_any(),
    )
}
