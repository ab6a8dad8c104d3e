// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`TracerSet`]: the single `Instrumentation` implementation the server is
//! wired against, fanning every hook out to the five fixed exporters plus
//! the gantt trace.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use batsim_core::{Instrumentation, Job, Machine, MachineRange, MachineStateCounts};

use crate::energy::{EnergyConsumptionTracer, EnergyEvent};
use crate::error::TracerError;
use crate::gantt::{GanttEvent, GanttTracer};
use crate::jobs::JobsTracer;
use crate::machine_states::MachineStateTracer;
use crate::pstate::PstateChangeTracer;

/// Sum, over every machine, of the lowest wattage entry in its pstate table.
/// Used as `consumed_energy.csv`'s static `wattmin` column.
pub fn total_wattmin(machines: &[Machine]) -> f64 {
    machines
        .iter()
        .map(|m| m.wattage.values().copied().fold(f64::INFINITY, f64::min))
        .filter(|w| w.is_finite())
        .sum()
}

pub struct TracerSet {
    jobs: JobsTracer,
    pstate: PstateChangeTracer,
    energy: EnergyConsumptionTracer,
    machine_states: MachineStateTracer,
    gantt: GanttTracer,
}

/// Paths of the five fixed exports plus the gantt trace, all rooted under
/// the CLI's `--export <prefix>`.
pub struct TracerPaths {
    pub jobs: PathBuf,
    pub schedule: PathBuf,
    pub pstate_changes: PathBuf,
    pub consumed_energy: PathBuf,
    pub machine_states: PathBuf,
    pub gantt: PathBuf,
}

impl TracerPaths {
    pub fn with_prefix(prefix: impl AsRef<Path>) -> Self {
        let prefix = prefix.as_ref();
        Self {
            jobs: prefix.join("jobs.csv"),
            schedule: prefix.join("schedule.csv"),
            pstate_changes: prefix.join("pstate_changes.csv"),
            consumed_energy: prefix.join("consumed_energy.csv"),
            machine_states: prefix.join("machine_states.csv"),
            gantt: prefix.join("gantt.csv"),
        }
    }
}

impl TracerSet {
    pub fn create(paths: &TracerPaths, wattmin: f64) -> Result<Self, TracerError> {
        tracing::debug!(export_dir = %paths.jobs.parent().map(|p| p.display().to_string()).unwrap_or_default(), "opening trace exports");
        Ok(Self {
            jobs: JobsTracer::create(&paths.jobs, &paths.schedule)?,
            pstate: PstateChangeTracer::create(&paths.pstate_changes)?,
            energy: EnergyConsumptionTracer::create(&paths.consumed_energy, wattmin)?,
            machine_states: MachineStateTracer::create(&paths.machine_states)?,
            gantt: GanttTracer::create(&paths.gantt)?,
        })
    }

    pub fn flush(&mut self) -> Result<(), TracerError> {
        self.jobs.flush()?;
        self.pstate.flush()?;
        self.energy.flush()?;
        self.machine_states.flush()?;
        self.gantt.flush()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn finalize(
        &mut self,
        time_spent_in_each_state: &BTreeMap<&'static str, f64>,
        nb_machine_switches: u64,
        nb_grouped_switches: u64,
        scheduling_time: f64,
        simulation_time: f64,
    ) -> Result<(), TracerError> {
        self.pstate.flush()?;
        self.energy.flush()?;
        self.machine_states.flush()?;
        self.gantt.flush()?;

        let consumed_joules = self.energy.consumed_joules();
        tracing::info!(nb_machine_switches, nb_grouped_switches, consumed_joules, "finalizing trace exports");
        self.jobs.finalize(
            time_spent_in_each_state,
            nb_machine_switches,
            nb_grouped_switches,
            consumed_joules,
            scheduling_time,
            simulation_time,
        )
    }
}

impl Instrumentation for TracerSet {
    fn on_job_started(&mut self, now: f64, job: &Job, machines: &MachineRange, epower: f64) {
        self.jobs.note_job_started(job, epower);
        let _ = self.energy.add_entry(now, EnergyEvent::JobStart, epower);
        let _ = self.gantt.job_span(now, machines, GanttEvent::JobStart, &job.id);
    }

    fn on_job_finished(&mut self, now: f64, job: &Job, epower: f64) {
        let _ = self.jobs.write_job(job, epower);
        let _ = self.energy.add_entry(now, EnergyEvent::JobEnd, epower);
        if !job.allocation.is_empty() {
            let machines: MachineRange = job.allocation.iter().map(|m| m.0).collect();
            let _ = self.gantt.job_span(now, &machines, GanttEvent::JobEnd, &job.id);
        }
    }

    fn on_pstate_changed(&mut self, now: f64, machines: &MachineRange, new_pstate: i32, epower: f64) {
        let _ = self.pstate.add_pstate_change(now, machines, new_pstate);
        let _ = self.energy.add_entry(now, EnergyEvent::PstateChange, epower);
        let _ = self.gantt.pstate_span(now, machines, new_pstate);
    }

    fn on_machine_states(&mut self, now: f64, counts: MachineStateCounts) {
        let _ = self.machine_states.write_machine_states(now, counts);
    }

    fn finalize(
        &mut self,
        time_spent_in_each_state: &BTreeMap<&'static str, f64>,
        nb_machine_switches: u64,
        nb_grouped_switches: u64,
        scheduling_time: f64,
        simulation_time: f64,
    ) {
        if let Err(e) = TracerSet::finalize(
            self,
            time_spent_in_each_state,
            nb_machine_switches,
            nb_grouped_switches,
            scheduling_time,
            simulation_time,
        ) {
            tracing::error!(error = %e, "failed to finalize trace exports");
        }
    }
}

#[cfg(test)]
#[path = "set_tests.rs"]
mod tests;
