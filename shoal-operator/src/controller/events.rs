use kube::runtime::events::{Event, EventType, Recorder};

use super::build_obj_ref;

pub const REASON_FINALIZED: &str = "Finalized";
pub const REASON_RECONCILE_FAILED: &str = "ReconcileFailed";

pub async fn emit_event(
    recorder: &Recorder,
    ns: &str,
    name: &str,
    uid: Option<&str>,
    type_: EventType,
    reason: &str,
    action: &str,
    note: Option<String>,
) {
    let _ = recorder
        .publish(
            &Event {
                type_,
                reason: reason.into(),
                note,
                action: action.into(),
                secondary: None,
            },
            &build_obj_ref(ns, name, uid),
        )
        .await;
}
