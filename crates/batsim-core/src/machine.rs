// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Machine model and power-state machine, plus `MachineRange`, the
//! hyphen-range notation used for machine-id sets in tracer rows and
//! protocol payloads.

use crate::id::{JobId, MachineId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role a machine plays in the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Compute,
    Storage,
    Master,
}

crate::simple_display! {
    Role {
        Compute => "compute_node",
        Storage => "storage",
        Master => "master",
    }
}

impl std::str::FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compute_node" | "compute" => Ok(Role::Compute),
            "storage" => Ok(Role::Storage),
            "master" => Ok(Role::Master),
            other => Err(other.to_string()),
        }
    }
}

/// Classification of a pstate id: Compute, Sleep, or TransitionVirtual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PStateClass {
    Compute,
    Sleep,
    TransitionVirtual,
}

/// `{on_vps, off_vps}`: the two transition-virtual pstates a sleep pstate
/// references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepPstate {
    pub on_vps: i32,
    pub off_vps: i32,
}

/// Machine state machine:
///
/// `Sleeping ⇄ TransitingFromSleepingToComputing → Idle`;
/// `Idle ⇄ Computing`;
/// `Idle|Computing → TransitingFromComputingToSleeping → Sleeping`;
/// any → `Unavailable` (from external events) → previous-class state on restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineState {
    Idle,
    Computing,
    Sleeping,
    TransitingFromSleepingToComputing,
    TransitingFromComputingToSleeping,
    /// Carries the class it should restore to once the external event clears.
    Unavailable { previous: UnavailablePrevious },
}

/// The coarse class `Unavailable` remembers for restoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnavailablePrevious {
    Idle,
    Computing,
    Sleeping,
}

crate::simple_display! {
    MachineState {
        Idle => "idle",
        Computing => "computing",
        Sleeping => "sleeping",
        TransitingFromSleepingToComputing => "transiting_s2c",
        TransitingFromComputingToSleeping => "transiting_c2s",
        Unavailable(..) => "unavailable",
    }
}

impl MachineState {
    pub fn is_compute_capable(self) -> bool {
        matches!(self, MachineState::Idle | MachineState::Computing)
    }
}

/// `{id, name, host_handle, state, jobs_being_computed, pstates,
/// sleep_pstates, role}`.
#[derive(Debug, Clone)]
pub struct Machine {
    pub id: MachineId,
    pub name: String,
    /// Opaque handle into the external platform simulator; batsim-core does
    /// not interpret it, only threads it through to that collaborator.
    pub host_handle: u64,
    pub state: MachineState,
    /// Maintained in insertion order; the head is the "top" job for tracing.
    pub jobs_being_computed: Vec<JobId>,
    pub pstates: std::collections::BTreeMap<i32, PStateClass>,
    pub sleep_pstates: std::collections::BTreeMap<i32, SleepPstate>,
    pub role: Role,
    pub current_pstate: i32,
    /// Accumulated duration per coarse tracer state, used by schedule.csv's
    /// `time_<state>` columns and machine_states.csv.
    pub time_spent_in_each_state: std::collections::BTreeMap<&'static str, f64>,
    /// Power draw (watts) per pstate id, when `--energy-host` is enabled.
    /// Empty for platforms without per-host energy readings.
    pub wattage: std::collections::BTreeMap<i32, f64>,
    /// Running total of joules consumed, accumulated by `tick`.
    pub consumed_energy: f64,
}

impl Machine {
    pub fn new(id: MachineId, name: impl Into<String>, role: Role, host_handle: u64) -> Self {
        let mut time_spent = std::collections::BTreeMap::new();
        for s in ["idle", "computing", "sleeping", "transiting_s2c", "transiting_c2s", "unavailable"] {
            time_spent.insert(s, 0.0);
        }
        Self {
            id,
            name: name.into(),
            host_handle,
            state: MachineState::Idle,
            jobs_being_computed: Vec::new(),
            pstates: std::collections::BTreeMap::new(),
            sleep_pstates: std::collections::BTreeMap::new(),
            role,
            current_pstate: 0,
            time_spent_in_each_state: time_spent,
            wattage: std::collections::BTreeMap::new(),
            consumed_energy: 0.0,
        }
    }

    /// Current power draw in watts, 0 when no wattage table was configured.
    pub fn epower(&self) -> f64 {
        self.wattage.get(&self.current_pstate).copied().unwrap_or(0.0)
    }

    /// Invariant: a machine is `Computing` iff `jobs_being_computed` is
    /// non-empty.
    pub fn is_computing(&self) -> bool {
        matches!(self.state, MachineState::Computing)
    }

    pub fn top_job(&self) -> Option<&JobId> {
        self.jobs_being_computed.first()
    }

    pub fn add_job(&mut self, job: JobId) {
        self.jobs_being_computed.push(job);
        if !matches!(self.state, MachineState::Computing) {
            self.state = MachineState::Computing;
        }
    }

    pub fn remove_job(&mut self, job: &JobId) {
        self.jobs_being_computed.retain(|j| j != job);
        if self.jobs_being_computed.is_empty() && matches!(self.state, MachineState::Computing) {
            self.state = MachineState::Idle;
        }
    }

    pub fn tick(&mut self, elapsed: f64) {
        let key = match self.state {
            MachineState::Idle => "idle",
            MachineState::Computing => "computing",
            MachineState::Sleeping => "sleeping",
            MachineState::TransitingFromSleepingToComputing => "transiting_s2c",
            MachineState::TransitingFromComputingToSleeping => "transiting_c2s",
            MachineState::Unavailable { .. } => "unavailable",
        };
        *self.time_spent_in_each_state.entry(key).or_insert(0.0) += elapsed;
        self.consumed_energy += self.epower() * elapsed;
    }
}

/// A set of machine ids with hyphen-range string notation (e.g.
/// `"0-3,7,9-10"`). Used by tracers and wire payloads whenever a set of
/// machine ids must be represented compactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineRange(BTreeSet<u32>);

impl MachineRange {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn from_ids(ids: impl IntoIterator<Item = u32>) -> Self {
        Self(ids.into_iter().collect())
    }

    pub fn insert(&mut self, id: u32) {
        self.0.insert(id);
    }

    pub fn contains(&self, id: u32) -> bool {
        self.0.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    /// Format as hyphen-range notation: consecutive runs become `a-b`,
    /// singletons stay bare, entries are comma-separated.
    pub fn to_range_string(&self) -> String {
        let mut parts = Vec::new();
        let mut iter = self.0.iter().copied().peekable();
        while let Some(start) = iter.next() {
            let mut end = start;
            while iter.peek() == Some(&(end + 1)) {
                end = iter.next().expect("peeked value exists");
            }
            if end == start {
                parts.push(start.to_string());
            } else {
                parts.push(format!("{start}-{end}"));
            }
        }
        parts.join(",")
    }

    /// Parse hyphen-range notation back into a set of ids.
    pub fn parse(s: &str) -> Result<Self, String> {
        let mut set = BTreeSet::new();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self(set));
        }
        for part in trimmed.split(',') {
            let part = part.trim();
            if let Some((lo, hi)) = part.split_once('-') {
                let lo: u32 = lo.trim().parse().map_err(|_| format!("invalid range start {lo:?}"))?;
                let hi: u32 = hi.trim().parse().map_err(|_| format!("invalid range end {hi:?}"))?;
                if lo > hi {
                    return Err(format!("invalid range {part:?}: start > end"));
                }
                set.extend(lo..=hi);
            } else {
                let v: u32 = part.parse().map_err(|_| format!("invalid machine id {part:?}"))?;
                set.insert(v);
            }
        }
        Ok(Self(set))
    }
}

impl std::fmt::Display for MachineRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_range_string())
    }
}

impl Serialize for MachineRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_range_string())
    }
}

impl<'de> Deserialize<'de> for MachineRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        MachineRange::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl FromIterator<u32> for MachineRange {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        Self::from_ids(iter)
    }
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
