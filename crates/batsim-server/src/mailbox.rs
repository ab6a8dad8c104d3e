// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The server mailbox: a timestamp-ordered queue every actor
//! posts to. `mailbox.get()` is the server's only suspension point.

use batsim_core::{AllocationPlacement, JobId, MachineId, PeriodicId, Probe, Repeat, SimTime};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitterKind {
    Job,
    Event,
}

/// One pstate switch's in-flight phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchPhase {
    /// Host just moved onto the off/on virtual pstate; account for "1 flop".
    EnteredVirtualPstate,
    /// The virtual-pstate flop finished; move to the real target pstate.
    Settled,
}

/// Everything an actor can post to the server mailbox.
#[derive(Debug, Clone)]
pub enum Message {
    SubmitterHello { kind: SubmitterKind },
    SubmitterBye { kind: SubmitterKind },
    JobSubmitted { job_id: JobId },
    JobCompleted { job_id: JobId },
    ExecuteJob { job_id: JobId, placement: AllocationPlacement },
    RejectJob { job_id: JobId },
    KillJobs { job_ids: Vec<JobId>, ack_requested: bool },
    ChangeJobState { job_id: JobId, new_state: batsim_core::JobState },
    RegisterJob { job_id: JobId, profile_name: Option<String>, job: serde_json::Value, ack: bool },
    RegisterProfile { workload: batsim_core::WorkloadName, name: String, profile: batsim_core::Profile, ack: bool },
    CallMeLater { id: PeriodicId, period_ms: u64, remaining: Repeat },
    StopCallMeLater { id: PeriodicId },
    CreateProbe { id: PeriodicId, period_ms: u64, remaining: Repeat, probe: Probe },
    StopProbe { id: PeriodicId },
    PStateModification { machines: Vec<MachineId>, target_pstate: i32 },
    /// `generation` lets the periodic engine ignore a tick scheduled by a
    /// schedule that a later rebuild has since superseded.
    PeriodicSliceElapsed { generation: u64 },
    SwitchTick { machine: MachineId, phase: SwitchPhase },
    JobTimerFired { job_id: JobId },
    EventOccurred { kind: String, payload: serde_json::Value },
    FinishRegistration,
    ForceSimulationStop,
    ToJobMessage { job_id: JobId, payload: String },
    SchedReady,
}

/// A mailbox entry: delivery time, insertion sequence (tiebreak, preserves
/// arrival order for same-instant messages), and payload.
struct Envelope {
    at: SimTime,
    seq: u64,
    message: Message,
}

impl PartialEq for Envelope {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}
impl Eq for Envelope {}

impl Ord for Envelope {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the earliest timestamp (and,
        // on ties, the earliest sequence number) pops first.
        other.at.cmp(&self.at).then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for Envelope {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Timestamp-ordered mailbox. Only the server pops from it; any actor may
/// push.
#[derive(Default)]
pub struct Mailbox {
    queue: BinaryHeap<Envelope>,
    next_seq: u64,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, at: SimTime, message: Message) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Envelope { at, seq, message });
    }

    /// Post for immediate delivery at `now`.
    pub fn post_now(&mut self, now: SimTime, message: Message) {
        self.post(now, message);
    }

    pub fn get(&mut self) -> Option<(SimTime, Message)> {
        self.queue.pop().map(|e| (e.at, e.message))
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn peek_time(&self) -> Option<SimTime> {
        self.queue.peek().map(|e| e.at)
    }
}
