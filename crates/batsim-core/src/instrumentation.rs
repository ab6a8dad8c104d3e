// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tracer integration seam.
//!
//! The original implementation's `BatsimContext` owns its tracers directly
//! and the server calls into them at specific lifecycle points
//! (`jobs_tracer.write_job(job)`, `pstate_tracer.add_pstate_change(...)`,
//! `energy_tracer.add_job_start/add_job_end(...)`) rather than deriving
//! trace rows from the EDC wire protocol. `Instrumentation` is that same
//! seam, generalized into a trait so `batsim-server` stays decoupled from
//! any particular exporter implementation.

use crate::job::Job;
use crate::machine::MachineRange;

/// Per-machine-state counts at one instant, as sampled from the live
/// machine registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MachineStateCounts {
    pub nb_sleeping: usize,
    pub nb_s2c: usize,
    pub nb_c2s: usize,
    pub nb_idle: usize,
    pub nb_computing: usize,
}

/// Lifecycle hooks the orchestrator calls directly, mirroring the original
/// `BatsimContext`'s tracer member calls. All methods are no-ops by default
/// so a caller need only override what it cares about.
///
/// The original derives energy readings from the machines it already owns
/// (`BatsimContext`). This trait keeps tracers decoupled from the live
/// machine registry, so the caller (the orchestrator, which does own it)
/// precomputes the relevant `epower` sum and passes it in instead.
pub trait Instrumentation {
    fn on_job_started(&mut self, _now: f64, _job: &Job, _machines: &MachineRange, _epower: f64) {}
    fn on_job_finished(&mut self, _now: f64, _job: &Job, _epower: f64) {}
    fn on_pstate_changed(&mut self, _now: f64, _machines: &MachineRange, _new_pstate: i32, _epower: f64) {}
    fn on_machine_states(&mut self, _now: f64, _counts: MachineStateCounts) {}

    /// Flush every buffered export and write `schedule.csv`'s aggregated
    /// row. Called once, at the end of a run, successful or
    /// not.
    fn finalize(
        &mut self,
        _time_spent_in_each_state: &std::collections::BTreeMap<&'static str, f64>,
        _nb_machine_switches: u64,
        _nb_grouped_switches: u64,
        _scheduling_time: f64,
        _simulation_time: f64,
    ) {
    }
}

/// The default instrumentation: observes nothing. Used when no tracer is
/// configured for a run.
#[derive(Debug, Default)]
pub struct NullInstrumentation;

impl Instrumentation for NullInstrumentation {}
