//! Lifecycle-phase vocabulary and the per-pass reduction from conditions
//! plus side signals to exactly one phase value.

use std::fmt;

use crate::crd::storage_cluster::{Condition, ConditionType};

use super::conditions;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Progressing,
    Ready,
    NotReady,
    Error,
    Connecting,
    Connected,
    ExpandingCapacity,
    Deleting,
    /// Superseded by an older StorageCluster instance; not reconciled.
    Ignored,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Progressing => "Progressing",
            Phase::Ready => "Ready",
            Phase::NotReady => "NotReady",
            Phase::Error => "Error",
            Phase::Connecting => "Connecting",
            Phase::Connected => "Connected",
            Phase::ExpandingCapacity => "ExpandingCapacity",
            Phase::Deleting => "Deleting",
            Phase::Ignored => "Ignored",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything phase derivation is allowed to look at. `conditions` is the
/// merged persisted list, inspected only when negative signals exist.
#[derive(Debug)]
pub struct PhaseInput<'a> {
    pub deleting: bool,
    pub expansion: bool,
    pub connecting: bool,
    pub connected: bool,
    pub aggregate_empty: bool,
    pub conditions: &'a [Condition],
}

/// First match wins. Deletion short-circuits everything; the expansion flag
/// pins the phase over the connection signals; an empty aggregate with no
/// overrides means the system is healthy.
pub fn derive_phase(input: &PhaseInput<'_>) -> Phase {
    if input.deleting {
        return Phase::Deleting;
    }
    if input.expansion {
        return Phase::ExpandingCapacity;
    }
    if input.connecting {
        return Phase::Connecting;
    }
    if input.connected {
        return Phase::Connected;
    }
    if input.aggregate_empty {
        return Phase::Ready;
    }
    if conditions::is_true(input.conditions, ConditionType::Progressing) {
        Phase::Progressing
    } else if conditions::is_false(input.conditions, ConditionType::Upgradeable) {
        Phase::NotReady
    } else {
        Phase::Error
    }
}
