// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job lifecycle: the job record and its state machine.
//!
//! Transitions are owned by the Server (`batsim-server`); this module only
//! encodes what is *legal*, keeping the state data separate from the
//! runtime handlers that drive it.

use crate::allocation::AllocationPlacement;
use crate::error::InvariantViolation;
use crate::id::{JobId, MachineId, ProfileId};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// `NotSubmitted → Submitted → {Rejected | Running}`;
/// `Running → {CompletedSuccessfully | CompletedFailed | CompletedWalltimeReached | CompletedKilled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    NotSubmitted,
    Submitted,
    Rejected,
    Running,
    CompletedSuccessfully,
    CompletedFailed,
    CompletedWalltimeReached,
    CompletedKilled,
}

crate::simple_display! {
    JobState {
        NotSubmitted => "not_submitted",
        Submitted => "submitted",
        Rejected => "rejected",
        Running => "running",
        CompletedSuccessfully => "completed_successfully",
        CompletedFailed => "completed_failed",
        CompletedWalltimeReached => "completed_walltime_reached",
        CompletedKilled => "completed_killed",
    }
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Rejected
                | JobState::CompletedSuccessfully
                | JobState::CompletedFailed
                | JobState::CompletedWalltimeReached
                | JobState::CompletedKilled
        )
    }

    pub fn is_running(self) -> bool {
        matches!(self, JobState::Running)
    }

    pub fn success(self) -> bool {
        matches!(self, JobState::CompletedSuccessfully)
    }

    /// Whether `from -> to` is a legal transition per the job state machine.
    pub fn can_transition(from: JobState, to: JobState) -> bool {
        use JobState::*;
        matches!(
            (from, to),
            (NotSubmitted, Submitted)
                | (Submitted, Rejected)
                | (Submitted, Running)
                | (Running, CompletedSuccessfully)
                | (Running, CompletedFailed)
                | (Running, CompletedWalltimeReached)
                | (Running, CompletedKilled)
        )
    }
}

/// `Walltime`: soft upper bound on a job's wallclock
/// duration. `-1` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Walltime(pub f64);

impl Walltime {
    pub const UNBOUNDED: Walltime = Walltime(-1.0);

    pub fn is_unbounded(self) -> bool {
        self.0 < 0.0
    }

    pub fn seconds(self) -> Option<f64> {
        if self.is_unbounded() {
            None
        } else {
            Some(self.0)
        }
    }
}

/// A job record.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub profile_ref: ProfileId,
    pub submission_time: f64,
    pub walltime: Walltime,
    pub requested_nb_res: u32,
    pub state: JobState,
    pub starting_time: Option<f64>,
    pub runtime: Option<f64>,
    pub allocation: HashSet<MachineId>,
    pub return_code: Option<i32>,
    pub consumed_energy: f64,
    pub metadata: Option<serde_json::Value>,
    pub execution_request: Option<AllocationPlacement>,
    pub incoming_message_buffer: VecDeque<String>,
    pub kill_requested: bool,
}

impl Job {
    pub fn new(
        id: JobId,
        profile_ref: ProfileId,
        submission_time: f64,
        walltime: Walltime,
        requested_nb_res: u32,
    ) -> Self {
        Self {
            id,
            profile_ref,
            submission_time,
            walltime,
            requested_nb_res,
            state: JobState::NotSubmitted,
            starting_time: None,
            runtime: None,
            allocation: HashSet::new(),
            return_code: None,
            consumed_energy: 0.0,
            metadata: None,
            execution_request: None,
            incoming_message_buffer: VecDeque::new(),
            kill_requested: false,
        }
    }

    /// Apply `from -> to`, validating it against the job state machine.
    pub fn transition(&mut self, to: JobState) -> Result<(), InvariantViolation> {
        if !JobState::can_transition(self.state, to) {
            return Err(InvariantViolation::IllegalStateTransition {
                job: self.id.clone(),
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        self.state = to;
        Ok(())
    }

    pub fn finish_time(&self) -> Option<f64> {
        Some(self.starting_time? + self.runtime?)
    }

    pub fn waiting_time(&self) -> Option<f64> {
        Some(self.starting_time? - self.submission_time)
    }

    pub fn turnaround_time(&self) -> Option<f64> {
        Some(self.finish_time()? - self.submission_time)
    }

    /// Stretch = turnaround / runtime. The source substitutes `epsilon=1e-5`
    /// for zero-runtime jobs to avoid division by zero.
    pub fn stretch(&self) -> Option<f64> {
        const EPSILON: f64 = 1e-5;
        let turnaround = self.turnaround_time()?;
        let runtime = self.runtime?;
        let denom = if runtime <= 0.0 { EPSILON } else { runtime };
        Some(turnaround / denom)
    }

    pub fn push_incoming_message(&mut self, message: String) {
        self.incoming_message_buffer.push_back(message);
    }

    pub fn pop_incoming_message(&mut self) -> Option<String> {
        self.incoming_message_buffer.pop_front()
    }
}

#[cfg(any(test, feature = "test-support"))]
crate::builder! {
    pub struct JobBuilder => Job {
        set { id: JobId = JobId::new("w0", "job0") }
        set { profile_ref: ProfileId = ProfileId::new("w0", "p0") }
        set { submission_time: f64 = 0.0 }
        set { walltime: Walltime = Walltime::UNBOUNDED }
        set { requested_nb_res: u32 = 1 }
        computed { state: JobState = JobState::NotSubmitted }
        computed { starting_time: Option<f64> = None }
        computed { runtime: Option<f64> = None }
        computed { allocation: HashSet<MachineId> = HashSet::new() }
        computed { return_code: Option<i32> = None }
        computed { consumed_energy: f64 = 0.0 }
        computed { metadata: Option<serde_json::Value> = None }
        computed { execution_request: Option<AllocationPlacement> = None }
        computed { incoming_message_buffer: VecDeque<String> = VecDeque::new() }
        computed { kill_requested: bool = false }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
