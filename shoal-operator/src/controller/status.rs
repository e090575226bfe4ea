//! Helpers over the owner's status block. The status is optional on the
//! wire; these accessors materialize it on first write.

use crate::controller::phase::Phase;
use crate::crd::storage_cluster::{
    Condition, RelatedObject, StorageCluster, StorageClusterStatus,
};

pub fn status_mut(sc: &mut StorageCluster) -> &mut StorageClusterStatus {
    sc.status.get_or_insert_with(StorageClusterStatus::default)
}

pub fn conditions(sc: &StorageCluster) -> &[Condition] {
    sc.status
        .as_ref()
        .map(|s| s.conditions.as_slice())
        .unwrap_or(&[])
}

pub fn current_phase(sc: &StorageCluster) -> Option<&str> {
    sc.status.as_ref().and_then(|s| s.phase.as_deref())
}

pub fn phase_is(sc: &StorageCluster, phase: Phase) -> bool {
    current_phase(sc) == Some(phase.as_str())
}

pub fn set_phase(sc: &mut StorageCluster, phase: Phase) {
    status_mut(sc).phase = Some(phase.as_str().to_string());
}

/// Mirror a raw child-reported state into the owner's phase field. Child
/// states share the phase vocabulary only loosely, so this takes the string
/// as reported.
pub fn set_phase_str(sc: &mut StorageCluster, phase: &str) {
    status_mut(sc).phase = Some(phase.to_string());
}

/// Record a dependent object, keyed by kind, name and namespace. A second
/// insert for the same identity refreshes the stored entry instead of
/// appending a duplicate.
pub fn insert_related_object(list: &mut Vec<RelatedObject>, incoming: RelatedObject) {
    if let Some(existing) = list.iter_mut().find(|o| o.same_identity(&incoming)) {
        *existing = incoming;
    } else {
        list.push(incoming);
    }
}
