//! Object-gateway step. Converges the `<owner>-gateway` child and folds its
//! reported phase into the negative aggregate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kube::ResourceExt;

use crate::controller::ReconcileErr;
use crate::controller::conditions;
use crate::controller::convergence::{ChildKind, Convergence, converge};
use crate::controller::steps::{PassContext, ReconcileStep, child_meta, resource_or_default};
use crate::crd::object_gateway::{GatewayPhase, ObjectGateway, ObjectGatewaySpec};
use crate::crd::storage_cluster::{Condition, ConditionStatus, ConditionType, StorageCluster};
use crate::store::{ClusterStore, StoreError};

pub const REASON_GATEWAY_NOT_FOUND: &str = "GatewayNotFound";
pub const REASON_GATEWAY_INITIALIZING: &str = "GatewayInitializing";
pub const REASON_GATEWAY_REJECTED: &str = "GatewayRejected";
pub const REASON_GATEWAY_PHASE_UNKNOWN: &str = "GatewayPhaseUnknown";

pub fn gateway_name(owner: &str) -> String {
    format!("{owner}-gateway")
}

pub fn desired_object_gateway(owner: &StorageCluster, image: &str) -> ObjectGateway {
    let name = gateway_name(&owner.name_any());
    ObjectGateway {
        metadata: child_meta(owner, name),
        spec: ObjectGatewaySpec {
            image: Some(
                owner
                    .spec
                    .gateway_image
                    .clone()
                    .unwrap_or_else(|| image.to_string()),
            ),
            core_resources: Some(resource_or_default(owner, "gateway-core")),
            db_resources: Some(resource_or_default(owner, "gateway-db")),
            db_volume_resources: Some(resource_or_default(owner, "gateway-db-vol")),
        },
        status: None,
    }
}

pub struct GatewayKind;

#[async_trait]
impl ChildKind for GatewayKind {
    type Resource = ObjectGateway;

    fn kind(&self) -> &'static str {
        "ObjectGateway"
    }

    fn api_version(&self) -> &'static str {
        "tern.io/v1alpha1"
    }

    fn observed_state(&self, found: &ObjectGateway) -> Option<String> {
        found
            .reported_phase()
            .filter(|p| !p.is_empty())
            .map(str::to_string)
    }

    fn specs_equal(&self, desired: &ObjectGateway, found: &ObjectGateway) -> bool {
        desired.spec == found.spec
    }

    fn copy_spec(&self, desired: &ObjectGateway, onto: &mut ObjectGateway) {
        onto.spec = desired.spec.clone();
    }

    async fn get(
        &self,
        store: &dyn ClusterStore,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ObjectGateway>, StoreError> {
        store.get_gateway(namespace, name).await
    }

    async fn create(
        &self,
        store: &dyn ClusterStore,
        obj: &ObjectGateway,
    ) -> Result<ObjectGateway, StoreError> {
        store.create_gateway(obj).await
    }

    async fn update(
        &self,
        store: &dyn ClusterStore,
        obj: &ObjectGateway,
    ) -> Result<ObjectGateway, StoreError> {
        store.update_gateway(obj).await
    }
}

pub struct ObjectGatewayStep {
    image: String,
}

impl ObjectGatewayStep {
    pub fn new(image: impl Into<String>) -> Self {
        ObjectGatewayStep {
            image: image.into(),
        }
    }
}

#[async_trait]
impl ReconcileStep for ObjectGatewayStep {
    fn name(&self) -> &'static str {
        "object-gateway"
    }

    async fn run(
        &self,
        store: &dyn ClusterStore,
        owner: &mut StorageCluster,
        pass: &mut PassContext,
    ) -> Result<(), ReconcileErr> {
        let desired = desired_object_gateway(owner, &self.image);
        match converge(&GatewayKind, store, owner, desired).await? {
            // Conditions settle on a later pass, once the gateway has
            // reported on the rewritten spec.
            Convergence::Updated { .. } => {}
            Convergence::Created(gw) | Convergence::Unchanged(gw) => {
                map_gateway_phase(Some(&gw), &mut pass.aggregate, Utc::now());
            }
        }
        Ok(())
    }
}

/// Fold one observed gateway phase into the negative aggregate. Uses the
/// absent-or-changed upsert so a gateway that keeps reporting the same phase
/// never churns transition times inside a pass.
pub(crate) fn map_gateway_phase(
    gateway: Option<&ObjectGateway>,
    aggregate: &mut Vec<Condition>,
    now: DateTime<Utc>,
) {
    let Some(gw) = gateway else {
        conditions::upsert_if_absent_or_changed(
            aggregate,
            Condition::new(
                ConditionType::Degraded,
                ConditionStatus::True,
                REASON_GATEWAY_NOT_FOUND,
                "Waiting on object gateway instance creation",
            ),
            now,
        );
        return;
    };

    let phase = gw.reported_phase().unwrap_or("");
    match GatewayPhase::parse(phase) {
        Some(GatewayPhase::Rejected) => {
            let message = "Object gateway configuration was rejected by the tern operator";
            for (type_, status) in [
                (ConditionType::Available, ConditionStatus::False),
                (ConditionType::Degraded, ConditionStatus::True),
            ] {
                conditions::upsert_if_absent_or_changed(
                    aggregate,
                    Condition::new(type_, status, REASON_GATEWAY_REJECTED, message),
                    now,
                );
            }
        }
        Some(GatewayPhase::Ready) => {}
        Some(
            GatewayPhase::Verifying
            | GatewayPhase::Creating
            | GatewayPhase::Connecting
            | GatewayPhase::Configuring,
        ) => initializing(aggregate, now),
        None if phase.is_empty() => initializing(aggregate, now),
        None => {
            conditions::upsert_if_absent_or_changed(
                aggregate,
                Condition::new(
                    ConditionType::Degraded,
                    ConditionStatus::True,
                    REASON_GATEWAY_PHASE_UNKNOWN,
                    format!("Object gateway phase {phase} is unknown"),
                ),
                now,
            );
        }
    }
}

fn initializing(aggregate: &mut Vec<Condition>, now: DateTime<Utc>) {
    let message = "Waiting on object gateway instance to finish initialization";
    for (type_, status) in [
        (ConditionType::Progressing, ConditionStatus::True),
        (ConditionType::Upgradeable, ConditionStatus::False),
    ] {
        conditions::upsert_if_absent_or_changed(
            aggregate,
            Condition::new(type_, status, REASON_GATEWAY_INITIALIZING, message),
            now,
        );
    }
}
