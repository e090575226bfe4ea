//! Backend step. Converges the `<owner>-reef` ReefCluster and folds the
//! state it reports into owner conditions, the external connection pair and
//! the expansion/connection side signals.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::info;

use crate::controller::ReconcileErr;
use crate::controller::conditions;
use crate::controller::convergence::{ChildKind, Convergence, converge};
use crate::controller::phase::Phase;
use crate::controller::status;
use crate::controller::steps::{PassContext, ReconcileStep, child_meta, resource_or_default};
use crate::crd::reef_cluster::{ExternalSpec, ReefCluster, ReefClusterSpec, ReefState};
use crate::crd::storage_cluster::{Condition, ConditionStatus, ConditionType, StorageCluster};
use crate::store::{ClusterStore, StoreError};

pub const REASON_NO_STATUS: &str = "NoStatusReported";
pub const REASON_STATE_CREATING: &str = "ReefStateCreating";
pub const REASON_STATE_UPDATING: &str = "ReefStateUpdating";
pub const REASON_STATE_CONNECTING: &str = "ReefStateConnecting";
pub const REASON_STATE_CONNECTED: &str = "ReefStateConnected";
pub const REASON_STATE_ERROR: &str = "ReefStateError";
pub const REASON_STATE_UNKNOWN: &str = "BackendStateUnknown";

const DATA_DIR_HOST_PATH: &str = "/var/lib/reef";

pub fn reef_name(owner: &str) -> String {
    format!("{owner}-reef")
}

pub fn desired_reef_cluster(owner: &StorageCluster, image: &str) -> ReefCluster {
    let name = reef_name(&owner.name_any());
    let resources = ["monitor", "manager", "storage-node"]
        .into_iter()
        .map(|key| (key.to_string(), resource_or_default(owner, key)))
        .collect::<BTreeMap<_, _>>();
    ReefCluster {
        metadata: child_meta(owner, name),
        spec: ReefClusterSpec {
            external: ExternalSpec { enable: true },
            image: Some(
                owner
                    .spec
                    .backend_image
                    .clone()
                    .unwrap_or_else(|| image.to_string()),
            ),
            data_dir_host_path: Some(DATA_DIR_HOST_PATH.to_string()),
            device_count: owner.spec.device_count,
            resources: Some(resources),
        },
        status: None,
    }
}

pub struct ReefKind;

#[async_trait]
impl ChildKind for ReefKind {
    type Resource = ReefCluster;

    fn kind(&self) -> &'static str {
        "ReefCluster"
    }

    fn api_version(&self) -> &'static str {
        "reef.io/v1"
    }

    fn observed_state(&self, found: &ReefCluster) -> Option<String> {
        found.reported_state().map(str::to_string)
    }

    fn specs_equal(&self, desired: &ReefCluster, found: &ReefCluster) -> bool {
        desired.spec == found.spec
    }

    fn copy_spec(&self, desired: &ReefCluster, onto: &mut ReefCluster) {
        onto.spec = desired.spec.clone();
    }

    async fn get(
        &self,
        store: &dyn ClusterStore,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ReefCluster>, StoreError> {
        store.get_reef_cluster(namespace, name).await
    }

    async fn create(
        &self,
        store: &dyn ClusterStore,
        obj: &ReefCluster,
    ) -> Result<ReefCluster, StoreError> {
        store.create_reef_cluster(obj).await
    }

    async fn update(
        &self,
        store: &dyn ClusterStore,
        obj: &ReefCluster,
    ) -> Result<ReefCluster, StoreError> {
        store.update_reef_cluster(obj).await
    }
}

pub struct ReefClusterStep {
    image: String,
}

impl ReefClusterStep {
    pub fn new(image: impl Into<String>) -> Self {
        ReefClusterStep {
            image: image.into(),
        }
    }
}

#[async_trait]
impl ReconcileStep for ReefClusterStep {
    fn name(&self) -> &'static str {
        "reef-cluster"
    }

    async fn run(
        &self,
        store: &dyn ClusterStore,
        owner: &mut StorageCluster,
        pass: &mut PassContext,
    ) -> Result<(), ReconcileErr> {
        let desired = desired_reef_cluster(owner, &self.image);
        match converge(&ReefKind, store, owner, desired).await? {
            Convergence::Updated { current, previous } => {
                // Conditions settle on a later pass, once the backend has
                // reported on the rewritten spec.
                if device_count(&current) > device_count(&previous) {
                    info!(
                        from = device_count(&previous),
                        to = device_count(&current),
                        "device count grew; expanding capacity"
                    );
                    pass.signals.expansion = true;
                }
            }
            Convergence::Created(created) => {
                map_reef_state(
                    &created,
                    &mut status::status_mut(owner).conditions,
                    pass,
                    Utc::now(),
                );
            }
            Convergence::Unchanged(found) => {
                if entered_expanding(pass)
                    && found.reported_state() != Some(ReefState::Updating.as_str())
                {
                    pass.signals.expansion = true;
                }
                map_reef_state(
                    &found,
                    &mut status::status_mut(owner).conditions,
                    pass,
                    Utc::now(),
                );
            }
        }
        Ok(())
    }
}

fn entered_expanding(pass: &PassContext) -> bool {
    pass.entry_phase.as_deref() == Some(Phase::ExpandingCapacity.as_str())
}

fn device_count(rc: &ReefCluster) -> i32 {
    rc.spec.device_count.unwrap_or(0)
}

fn child_message(rc: &ReefCluster) -> String {
    rc.status
        .as_ref()
        .and_then(|s| s.message.clone())
        .unwrap_or_default()
}

/// Fold one observed backend state into the negative aggregate, the
/// persisted external connection pair and the side signals.
pub(crate) fn map_reef_state(
    reef: &ReefCluster,
    persisted: &mut Vec<Condition>,
    pass: &mut PassContext,
    now: DateTime<Utc>,
) {
    let Some(state) = reef.reported_state() else {
        let message = "Reef cluster resource is not reporting status";
        for (type_, status) in [
            (ConditionType::Available, ConditionStatus::False),
            (ConditionType::Progressing, ConditionStatus::True),
            (ConditionType::Upgradeable, ConditionStatus::False),
        ] {
            conditions::upsert(
                &mut pass.aggregate,
                Condition::new(type_, status, REASON_NO_STATUS, message),
                now,
            );
        }
        return;
    };

    match ReefState::parse(state) {
        Some(ReefState::Creating) => {
            let message = format!("Reef cluster is creating: {}", child_message(reef));
            transient(pass, REASON_STATE_CREATING, &message, now);
        }
        Some(ReefState::Updating) => {
            let message = format!("Reef cluster is updating: {}", child_message(reef));
            transient(pass, REASON_STATE_UPDATING, &message, now);
        }
        Some(ReefState::Connecting) => {
            let message = format!(
                "Reef cluster is trying to connect: {}",
                child_message(reef)
            );
            transient(pass, REASON_STATE_CONNECTING, &message, now);
            set_connection_pair(
                persisted,
                ConditionStatus::True,
                ConditionStatus::False,
                REASON_STATE_CONNECTING,
                &message,
                now,
            );
            pass.signals.connecting = true;
        }
        Some(ReefState::Connected) => {
            let message = format!("Reef cluster is connected: {}", child_message(reef));
            set_connection_pair(
                persisted,
                ConditionStatus::False,
                ConditionStatus::True,
                REASON_STATE_CONNECTED,
                &message,
                now,
            );
            pass.signals.connected = true;
        }
        Some(ReefState::Error) => {
            let message = format!("Reef cluster error: {}", child_message(reef));
            for (type_, status) in [
                (ConditionType::Available, ConditionStatus::False),
                (ConditionType::Degraded, ConditionStatus::True),
            ] {
                conditions::upsert(
                    &mut pass.aggregate,
                    Condition::new(type_, status, REASON_STATE_ERROR, &message),
                    now,
                );
            }
            set_connection_pair(
                persisted,
                ConditionStatus::False,
                ConditionStatus::False,
                REASON_STATE_ERROR,
                &message,
                now,
            );
        }
        None => {
            conditions::upsert(
                &mut pass.aggregate,
                Condition::new(
                    ConditionType::Degraded,
                    ConditionStatus::True,
                    REASON_STATE_UNKNOWN,
                    format!("Reef cluster state {state} is not recognized"),
                ),
                now,
            );
        }
    }
}

fn transient(pass: &mut PassContext, reason: &str, message: &str, now: DateTime<Utc>) {
    for (type_, status) in [
        (ConditionType::Progressing, ConditionStatus::True),
        (ConditionType::Upgradeable, ConditionStatus::False),
    ] {
        conditions::upsert(
            &mut pass.aggregate,
            Condition::new(type_, status, reason, message),
            now,
        );
    }
}

fn set_connection_pair(
    persisted: &mut Vec<Condition>,
    connecting: ConditionStatus,
    connected: ConditionStatus,
    reason: &str,
    message: &str,
    now: DateTime<Utc>,
) {
    conditions::upsert(
        persisted,
        Condition::new(ConditionType::ExternalConnecting, connecting, reason, message),
        now,
    );
    conditions::upsert(
        persisted,
        Condition::new(ConditionType::ExternalConnected, connected, reason, message),
        now,
    );
}
