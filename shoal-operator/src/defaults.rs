//! Static per-daemon resource profiles. Values here are the baseline the
//! desired-spec builders start from; `StorageCluster.spec.resources` entries
//! override whole profiles by key.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

/// Default requirements for one daemon kind. Unknown keys resolve to an
/// empty profile so the scheduler applies namespace defaults.
pub fn resource_requirements(key: &str) -> ResourceRequirements {
    match key {
        "monitor" => symmetric("1", "2Gi"),
        "manager" => symmetric("1", "3Gi"),
        "storage-node" => symmetric("2", "5Gi"),
        "gateway-core" => symmetric("1", "4Gi"),
        "gateway-db" => symmetric("500m", "4Gi"),
        "gateway-db-vol" => ResourceRequirements {
            requests: Some(BTreeMap::from([(
                "storage".to_string(),
                Quantity("50Gi".to_string()),
            )])),
            ..ResourceRequirements::default()
        },
        _ => ResourceRequirements::default(),
    }
}

/// Identical requests and limits, the shape every CPU/memory profile uses.
fn symmetric(cpu: &str, memory: &str) -> ResourceRequirements {
    let amounts = BTreeMap::from([
        ("cpu".to_string(), Quantity(cpu.to_string())),
        ("memory".to_string(), Quantity(memory.to_string())),
    ]);
    ResourceRequirements {
        requests: Some(amounts.clone()),
        limits: Some(amounts),
        ..ResourceRequirements::default()
    }
}
