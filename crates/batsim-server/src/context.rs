// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owned simulation context.

use crate::periodic_engine::PeriodicSchedule;
use batsim_core::{
    CurrentSwitches, Job, JobId, Machine, MachineId, PeriodicEntity, PeriodicId, SimTime, Workload, WorkloadName,
};
use batsim_engine::JobExecutor;
use std::collections::HashMap;

/// Whether resource sharing is permitted on a single host.
#[derive(Debug, Clone, Copy)]
pub struct SharingPolicy {
    pub compute_sharing: bool,
    pub storage_sharing: bool,
}

impl Default for SharingPolicy {
    fn default() -> Self {
        Self { compute_sharing: false, storage_sharing: false }
    }
}

/// Counters the termination predicate is computed from.
#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    pub job_submitters_open: u32,
    pub event_submitters_open: u32,
    pub nb_submitted: u64,
    pub nb_completed: u64,
    pub nb_rejected: u64,
    pub nb_running: u64,
    pub nb_killers: u64,
    pub nb_waiters: u64,
    pub dynamic_registration_pending: bool,
}

impl Counters {
    /// `is_simulation_finished`.
    pub fn is_simulation_finished(&self, switching_machines: usize) -> bool {
        self.job_submitters_open == 0
            && self.event_submitters_open == 0
            && !self.dynamic_registration_pending
            && self.nb_submitted == self.nb_completed + self.nb_rejected
            && self.nb_running == 0
            && switching_machines == 0
            && self.nb_waiters == 0
            && self.nb_killers == 0
    }
}

/// All mutable simulation state, owned by the `Server` and threaded through
/// handlers by explicit reference.
pub struct Context {
    pub clock: SimTime,
    pub machines: Vec<Machine>,
    pub workloads: HashMap<WorkloadName, Workload>,
    pub current_switches: CurrentSwitches,
    pub periodic: HashMap<PeriodicId, PeriodicEntity>,
    pub next_periodic_id: u64,
    pub periodic_schedule: Option<PeriodicSchedule>,
    pub periodic_slice_index: usize,
    pub periodic_generation: u64,
    pub executors: HashMap<JobId, JobExecutor>,
    pub sharing: SharingPolicy,
    pub counters: Counters,
    pub ack_dynamic_registration: bool,
    pub end_sent: bool,
    pub end_ack_received: bool,
    pub nb_machine_switches: u64,
    pub nb_grouped_switches: u64,
    /// Workflow tasks not yet submitted, keyed by job id, with the
    /// names of sibling tasks they still wait on.
    pub workflow_pending: HashMap<JobId, Vec<String>>,
    /// Whether job/profile data lives in an external key-value store the
    /// EDC is expected to query itself. When `false`, `JobSubmitted`
    /// inlines the job and profile JSON directly into the event instead.
    pub redis_enabled: bool,
    /// Terminal jobs (completed/rejected/killed) staged for removal from
    /// their workload once the round trip that reported them has finished.
    pub jobs_to_be_deleted: Vec<JobId>,
}

impl Context {
    pub fn new(machines: Vec<Machine>) -> Self {
        Self {
            clock: SimTime::ZERO,
            machines,
            workloads: HashMap::new(),
            current_switches: CurrentSwitches::new(),
            periodic: HashMap::new(),
            next_periodic_id: 0,
            periodic_schedule: None,
            periodic_slice_index: 0,
            periodic_generation: 0,
            executors: HashMap::new(),
            sharing: SharingPolicy::default(),
            counters: Counters::default(),
            ack_dynamic_registration: false,
            end_sent: false,
            end_ack_received: false,
            nb_machine_switches: 0,
            nb_grouped_switches: 0,
            workflow_pending: HashMap::new(),
            redis_enabled: false,
            jobs_to_be_deleted: Vec::new(),
        }
    }

    pub fn machine(&self, id: MachineId) -> Option<&Machine> {
        self.machines.iter().find(|m| m.id == id)
    }

    pub fn machine_mut(&mut self, id: MachineId) -> Option<&mut Machine> {
        self.machines.iter_mut().find(|m| m.id == id)
    }

    pub fn master_machine(&self) -> Option<&Machine> {
        self.machines.iter().find(|m| m.role == batsim_core::Role::Master)
    }

    pub fn job(&self, id: &JobId) -> Option<&Job> {
        self.workloads.get(&id.workload).and_then(|w| w.job(&id.job_name))
    }

    pub fn job_mut(&mut self, id: &JobId) -> Option<&mut Job> {
        self.workloads.get_mut(&id.workload).and_then(|w| w.job_mut(&id.job_name))
    }

    /// Marks a terminal job for removal at the next `flush_deleted_jobs`.
    pub fn stage_job_deletion(&mut self, id: JobId) {
        self.jobs_to_be_deleted.push(id);
    }

    /// Removes every job staged by `stage_job_deletion` from its workload.
    pub fn flush_deleted_jobs(&mut self) {
        for id in self.jobs_to_be_deleted.drain(..) {
            if let Some(workload) = self.workloads.get_mut(&id.workload) {
                workload.remove_job(&id.job_name);
            }
        }
    }

    pub fn next_periodic_id(&mut self) -> PeriodicId {
        let id = PeriodicId(self.next_periodic_id);
        self.next_periodic_id += 1;
        id
    }

    pub fn is_simulation_finished(&self) -> bool {
        self.counters.is_simulation_finished(self.current_switches.pending_count())
    }

    /// Sum of every machine's `time_spent_in_each_state`, for
    /// `schedule.csv`'s `time_<state>` columns.
    pub fn aggregate_time_spent(&self) -> std::collections::BTreeMap<&'static str, f64> {
        let mut totals = std::collections::BTreeMap::new();
        for machine in &self.machines {
            for (state, seconds) in &machine.time_spent_in_each_state {
                *totals.entry(*state).or_insert(0.0) += seconds;
            }
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finished_requires_every_counter_drained() {
        let mut counters = Counters { nb_submitted: 3, nb_completed: 2, nb_rejected: 1, ..Default::default() };
        assert!(counters.is_simulation_finished(0));
        counters.nb_running = 1;
        assert!(!counters.is_simulation_finished(0));
        counters.nb_running = 0;
        assert!(!counters.is_simulation_finished(1));
    }

    #[test]
    fn open_submitters_block_termination() {
        let counters = Counters { job_submitters_open: 1, ..Default::default() };
        assert!(!counters.is_simulation_finished(0));
    }
}
