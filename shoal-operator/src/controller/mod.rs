use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::{
    Client, Resource, ResourceExt,
    api::Api,
    runtime::{
        Controller,
        controller::Action,
        events::{EventType, Recorder, Reporter},
        watcher::Config,
    },
};
use tokio::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::config::OperatorConfig;
use crate::crd::storage_cluster::StorageCluster;
use crate::ready::ReadinessFile;
use crate::store::{ClusterStore, KubeStore, StoreError};

pub mod conditions;
pub mod convergence;
pub mod deletion;
pub mod events;
pub mod phase;
pub mod reconcile;
pub mod status;
pub mod steps;

#[cfg(test)]
mod deletion_tests;

use events::{REASON_FINALIZED, REASON_RECONCILE_FAILED, emit_event};
use reconcile::{PassOutcome, run_pass};
use steps::ReconcileStep;

#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    #[error("object store: {0}")]
    Store(#[from] StoreError),
    #[error("readiness file: {0}")]
    Readiness(#[from] std::io::Error),
    #[error("quickstart directory {path}: {source}")]
    QuickstartDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("quickstart manifest {path}: {source}")]
    QuickstartManifest {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

const BACKOFF_BASE_SECS: u64 = 5;
const BACKOFF_CAP_SECS: u64 = 300;
const DELETE_REQUEUE_SECS: u64 = 10;

pub struct ControllerContext {
    pub store: Arc<dyn ClusterStore>,
    pub cfg: OperatorConfig,
    pub ready: Arc<ReadinessFile>,
    pub recorder: Recorder,
    pub steps: Vec<Box<dyn ReconcileStep>>,
    retries: Mutex<HashMap<String, u32>>,
}

impl ControllerContext {
    pub fn new(
        store: Arc<dyn ClusterStore>,
        cfg: OperatorConfig,
        ready: Arc<ReadinessFile>,
        recorder: Recorder,
    ) -> Self {
        let steps = steps::default_steps(&cfg);
        ControllerContext {
            store,
            cfg,
            ready,
            recorder,
            steps,
            retries: Mutex::new(HashMap::new()),
        }
    }

    /// Exponential per-object delay, 5s doubling up to 5m. The counter
    /// advances on every call and resets on the next clean pass.
    fn next_backoff(&self, key: &str) -> Duration {
        let mut map = match self.retries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let attempt = map.entry(key.to_string()).or_insert(0);
        let shift = (*attempt).min(6);
        *attempt += 1;
        Duration::from_secs((BACKOFF_BASE_SECS << shift).min(BACKOFF_CAP_SECS))
    }

    fn clear_backoff(&self, key: &str) {
        let mut map = match self.retries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.remove(key);
    }
}

pub async fn run_controller(
    client: Client,
    cfg: OperatorConfig,
    ready: Arc<ReadinessFile>,
) -> anyhow::Result<()> {
    let api: Api<StorageCluster> = Api::all(client.clone());
    let recorder = Recorder::new(
        client.clone(),
        Reporter {
            controller: "shoal-operator".into(),
            instance: None,
        },
    );
    let store = Arc::new(KubeStore::new(client));
    let ctx = Arc::new(ControllerContext::new(store, cfg, ready, recorder));

    Controller::new(api, Config::default())
        .run(reconcile_cluster, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((_obj_ref, action)) => {
                    info!("reconciled: requeue={:?}", action)
                }
                Err(e) => error!(error = ?e, "reconcile error"),
            }
        })
        .await;

    Ok(())
}

#[instrument(skip_all, fields(ns = %obj.namespace().unwrap_or_else(|| "default".into()), name = %obj.name_any()))]
async fn reconcile_cluster(
    obj: Arc<StorageCluster>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    let ns = obj.namespace().unwrap_or_else(|| "default".to_string());
    let name = obj.name_any();
    let key = format!("{ns}/{name}");

    // Watched objects can be stale; reconcile against a fresh read.
    let mut sc = match ctx.store.get_cluster(&ns, &name).await? {
        Some(sc) => sc,
        None => {
            debug!("storage cluster is gone");
            ctx.clear_backoff(&key);
            return Ok(Action::await_change());
        }
    };
    let uid = sc.meta().uid.clone();

    match run_pass(ctx.store.as_ref(), &ctx.ready, &ctx.steps, &mut sc).await {
        Ok(PassOutcome::Reconciled) | Ok(PassOutcome::Ignored) => {
            ctx.clear_backoff(&key);
            Ok(Action::requeue(Duration::from_secs(
                ctx.cfg.requeue_interval_secs,
            )))
        }
        Ok(PassOutcome::Deleting) => {
            ctx.clear_backoff(&key);
            Ok(Action::requeue(Duration::from_secs(DELETE_REQUEUE_SECS)))
        }
        Ok(PassOutcome::Finalized) => {
            ctx.clear_backoff(&key);
            emit_event(
                &ctx.recorder,
                &ns,
                &name,
                uid.as_deref(),
                EventType::Normal,
                REASON_FINALIZED,
                "Finalize",
                Some(format!("Storage cluster {name} finalized")),
            )
            .await;
            Ok(Action::await_change())
        }
        Err(err) => {
            emit_event(
                &ctx.recorder,
                &ns,
                &name,
                uid.as_deref(),
                EventType::Warning,
                REASON_RECONCILE_FAILED,
                "Reconcile",
                Some(err.to_string()),
            )
            .await;
            Err(err)
        }
    }
}

fn error_policy(
    obj: Arc<StorageCluster>,
    error: &ReconcileErr,
    ctx: Arc<ControllerContext>,
) -> Action {
    let key = format!(
        "{}/{}",
        obj.namespace().unwrap_or_default(),
        obj.name_any()
    );
    let delay = ctx.next_backoff(&key);
    warn!(error = %error, backoff_secs = delay.as_secs(), "reconcile failed; backing off");
    Action::requeue(delay)
}

fn build_obj_ref(ns: &str, name: &str, uid: Option<&str>) -> ObjectReference {
    ObjectReference {
        api_version: Some(StorageCluster::api_version(&()).to_string()),
        kind: Some(StorageCluster::kind(&()).to_string()),
        namespace: Some(ns.to_string()),
        name: Some(name.to_string()),
        uid: uid.map(|u| u.to_string()),
        ..ObjectReference::default()
    }
}

/// Namespace and name of a persisted object; both are always set once the
/// API server has accepted it.
pub(crate) fn identity(sc: &StorageCluster) -> Result<(String, String), StoreError> {
    let ns = sc.namespace().ok_or(StoreError::IncompleteMeta {
        kind: "StorageCluster",
        field: "namespace",
    })?;
    let name = sc.meta().name.clone().ok_or(StoreError::IncompleteMeta {
        kind: "StorageCluster",
        field: "name",
    })?;
    Ok((ns, name))
}
