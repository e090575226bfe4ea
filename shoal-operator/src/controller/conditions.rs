//! Condition-store operations shared by the persisted status list and the
//! per-pass aggregate. All writes funnel through [`merge_transition`] so the
//! last-transition-time rule holds everywhere: the timestamp moves only when
//! the status value changes, never on a message rewrite.

use chrono::{DateTime, Utc};

use crate::crd::storage_cluster::{Condition, ConditionStatus, ConditionType};

pub const REASON_INIT: &str = "Initializing";
pub const REASON_RECONCILE_FAILED: &str = "ReconcileFailed";
pub const REASON_RECONCILE_COMPLETED: &str = "ReconcileCompleted";

/// Resolve an upsert against the existing record of the same type.
pub fn merge_transition(
    existing: Option<&Condition>,
    incoming: Condition,
    now: DateTime<Utc>,
) -> Condition {
    let last_transition_time = match existing {
        Some(prev) if prev.status == incoming.status => prev.last_transition_time,
        _ => now,
    };
    Condition {
        last_transition_time,
        ..incoming
    }
}

/// Replace any same-type record, preserving its transition time when the
/// status value is unchanged.
pub fn upsert(conditions: &mut Vec<Condition>, incoming: Condition, now: DateTime<Utc>) {
    match conditions.iter().position(|c| c.type_ == incoming.type_) {
        Some(idx) => {
            let merged = merge_transition(Some(&conditions[idx]), incoming, now);
            conditions[idx] = merged;
        }
        None => conditions.push(merge_transition(None, incoming, now)),
    }
}

/// Like [`upsert`] but a no-op when a record of the same type already holds
/// the same status value; the existing reason, message, and time are kept
/// verbatim. Used by steps whose repeated identical reports would otherwise
/// churn message text.
pub fn upsert_if_absent_or_changed(
    conditions: &mut Vec<Condition>,
    incoming: Condition,
    now: DateTime<Utc>,
) {
    if find(conditions, incoming.type_).is_some_and(|c| c.status == incoming.status) {
        return;
    }
    upsert(conditions, incoming, now);
}

pub fn find(conditions: &[Condition], type_: ConditionType) -> Option<&Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// Unknown and absent are not true.
pub fn is_true(conditions: &[Condition], type_: ConditionType) -> bool {
    find(conditions, type_).is_some_and(|c| c.status == ConditionStatus::True)
}

/// Unknown and absent are not false.
pub fn is_false(conditions: &[Condition], type_: ConditionType) -> bool {
    find(conditions, type_).is_some_and(|c| c.status == ConditionStatus::False)
}

/// Baseline written once when a cluster has no conditions yet.
pub fn seed_baseline(
    conditions: &mut Vec<Condition>,
    reason: &str,
    message: &str,
    now: DateTime<Utc>,
) {
    for (type_, status) in [
        (ConditionType::ReconcileComplete, ConditionStatus::Unknown),
        (ConditionType::Available, ConditionStatus::False),
        (ConditionType::Progressing, ConditionStatus::True),
        (ConditionType::Degraded, ConditionStatus::False),
        (ConditionType::Upgradeable, ConditionStatus::Unknown),
    ] {
        upsert(conditions, Condition::new(type_, status, reason, message), now);
    }
}

/// Record a failed pass. Only ReconcileComplete flips; the subsystem
/// conditions keep whatever the last consistent pass wrote.
pub fn set_error(conditions: &mut Vec<Condition>, message: &str, now: DateTime<Utc>) {
    upsert(
        conditions,
        Condition::new(
            ConditionType::ReconcileComplete,
            ConditionStatus::False,
            REASON_RECONCILE_FAILED,
            message,
        ),
        now,
    );
}

/// Centralized all-clear bundle, asserted only when no step reported a
/// negative signal.
pub fn set_complete(conditions: &mut Vec<Condition>, now: DateTime<Utc>) {
    let message = "Reconcile completed successfully";
    for (type_, status) in [
        (ConditionType::ReconcileComplete, ConditionStatus::True),
        (ConditionType::Available, ConditionStatus::True),
        (ConditionType::Progressing, ConditionStatus::False),
        (ConditionType::Degraded, ConditionStatus::False),
        (ConditionType::Upgradeable, ConditionStatus::True),
    ] {
        upsert(
            conditions,
            Condition::new(type_, status, REASON_RECONCILE_COMPLETED, message),
            now,
        );
    }
}
