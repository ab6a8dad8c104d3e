// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound and inbound EDC event grammar.

use batsim_core::{AllocationPlacement, JobId, MachineRange};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events the Server sends to the EDC, batched between request/reply
/// round-trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    BatsimHello { batsim_version: String },

    /// Carries the platform description (opaque to this core) and effective
    /// configuration.
    SimulationBegins { config: Value, platform_description: Value },

    SimulationEnds,

    JobSubmitted {
        job_id: String,
        /// Present only when the key-value store is disabled.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        job: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        profile: Option<Value>,
    },

    JobCompleted {
        job_id: String,
        job_state: String,
        return_code: i32,
    },

    /// Emitted only when the kill was EDC-requested.
    JobKilled {
        job_ids: Vec<String>,
        /// Progress ratio (0..1) per job id, from the killer's snapshot.
        progress: std::collections::BTreeMap<String, f64>,
    },

    ResourceStateChanged {
        machines: String,
        new_pstate: i32,
    },

    AnswerEnergy { consumed_energy: f64 },

    RequestedCall { id: u64 },

    /// Batch of CallMeLater fires and probe samples due at the same slice.
    PeriodicTrigger { entries: Vec<PeriodicTriggerEntry> },

    /// A finite `CallMeLater`/`Probe` reached its last period and retired.
    PeriodicEntityStopped { id: u64 },

    Notify { tag: String, payload: Value },

    FromJobMessage { job_id: String, payload: Value },

    /// Bidirectional clock-synchronization ping carrying no payload.
    Nop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PeriodicTriggerEntry {
    CallMeLaterFired { id: u64 },
    ProbeSample {
        id: u64,
        values: Vec<f64>,
        aggregated: Option<f64>,
        is_last_periodic: bool,
    },
}

/// Events the EDC sends back to the Server after a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    EdcHello { options: crate::edc_hello::EdcHelloOptions },

    RejectJob { job_id: JobIdWire },

    ExecuteJob { job_id: JobIdWire, placement: AllocationPlacement },

    KillJobs { job_ids: Vec<JobIdWire>, ack_requested: bool },

    RegisterJob {
        job_id: JobIdWire,
        job: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        profile_name: Option<String>,
        ack: bool,
    },

    RegisterProfile { workload_name: String, profile_name: String, profile: Value, ack: bool },

    SetJobMetadata { job_id: JobIdWire, metadata: Value },

    ChangeJobState { job_id: JobIdWire, new_state: String },

    CallMeLater { id: u64, period_ms: u64, nb_periods: Option<u64> },

    StopCallMeLater { id: u64 },

    CreateProbe { id: u64, period_ms: u64, nb_periods: Option<u64>, probe: batsim_core::Probe },

    StopProbe { id: u64 },

    ChangeHostPstate { machines: MachineRangeWire, target_pstate: i32 },

    FinishRegistration,

    ForceSimulationStop,

    ToJobMessage { job_id: JobIdWire, payload: Value },
}

/// `JobId` over the wire is the canonical `workload!job` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobIdWire(pub JobId);

impl Serialize for JobIdWire {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.canonical())
    }
}

impl<'de> Deserialize<'de> for JobIdWire {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        JobId::parse(&s).map(JobIdWire).ok_or_else(|| serde::de::Error::custom(format!("invalid job id {s:?}")))
    }
}

/// `MachineRange` over the wire is its hyphen-range string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineRangeWire(pub MachineRange);

impl Serialize for MachineRangeWire {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MachineRangeWire {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        MachineRange::deserialize(deserializer).map(MachineRangeWire)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
