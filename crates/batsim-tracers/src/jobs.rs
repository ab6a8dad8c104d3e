// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `jobs.csv` and `schedule.csv`.
//!
//! Grounded on `export.cpp`'s `JobsTracer`: one tracer owns both files
//! because the schedule aggregates are accumulated incrementally as each
//! job's row is written, not recomputed from the jobs file afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use batsim_core::{Job, JobId, JobState, MachineRange};

use crate::buffer::TraceFile;
use crate::csv_row::format_row;
use crate::error::TracerError;

const JOB_HEADER: &str = "job_id,workload_name,profile,submission_time,requested_number_of_resources,\
requested_time,success,final_state,starting_time,execution_time,finish_time,waiting_time,\
turnaround_time,stretch,allocated_resources,consumed_energy,metadata\n";

/// Time-per-machine-state column keys, fixed order.
pub const MACHINE_STATE_KEYS: [&str; 6] =
    ["sleeping", "transiting_s2c", "transiting_c2s", "idle", "computing", "unavailable"];

#[derive(Debug, Default)]
struct ScheduleAccumulator {
    nb_jobs: u64,
    nb_jobs_finished: u64,
    nb_jobs_success: u64,
    nb_jobs_killed: u64,
    nb_jobs_rejected: u64,
    sum_waiting_time: f64,
    sum_turnaround_time: f64,
    sum_slowdown: f64,
    max_waiting_time: f64,
    max_turnaround_time: f64,
    max_slowdown: f64,
    makespan: f64,
}

impl ScheduleAccumulator {
    fn record(&mut self, job: &Job) {
        self.nb_jobs += 1;
        if job.state == JobState::Rejected {
            self.nb_jobs_rejected += 1;
            return;
        }
        self.nb_jobs_finished += 1;
        if job.state.success() {
            self.nb_jobs_success += 1;
        } else {
            self.nb_jobs_killed += 1;
        }

        let (Some(waiting), Some(turnaround), Some(stretch), Some(finish)) =
            (job.waiting_time(), job.turnaround_time(), job.stretch(), job.finish_time())
        else {
            return;
        };

        self.sum_waiting_time += waiting;
        self.sum_turnaround_time += turnaround;
        self.sum_slowdown += stretch;
        self.max_waiting_time = self.max_waiting_time.max(waiting);
        self.max_turnaround_time = self.max_turnaround_time.max(turnaround);
        self.max_slowdown = self.max_slowdown.max(stretch);
        self.makespan = self.makespan.max(finish);
    }
}

pub struct JobsTracer {
    file: TraceFile,
    schedule_path: std::path::PathBuf,
    schedule: ScheduleAccumulator,
    energy_at_start: BTreeMap<JobId, f64>,
}

impl JobsTracer {
    pub fn create(jobs_path: impl AsRef<Path>, schedule_path: impl AsRef<Path>) -> Result<Self, TracerError> {
        let mut file = TraceFile::create(jobs_path)?;
        file.append(JOB_HEADER)?;
        Ok(Self {
            file,
            schedule_path: schedule_path.as_ref().to_path_buf(),
            schedule: ScheduleAccumulator::default(),
            energy_at_start: BTreeMap::new(),
        })
    }

    pub fn note_job_started(&mut self, job: &Job, epower: f64) {
        self.energy_at_start.insert(job.id.clone(), epower);
    }

    pub fn write_job(&mut self, job: &Job, epower_at_finish: f64) -> Result<(), TracerError> {
        self.schedule.record(job);

        let rejected = job.state == JobState::Rejected;
        let success = i32::from(job.state.success());
        let empty = String::new;

        let epower_at_start = self.energy_at_start.remove(&job.id).unwrap_or(epower_at_finish);
        let consumed_energy = match job.runtime {
            Some(runtime) if runtime > 0.0 => ((epower_at_start + epower_at_finish) / 2.0) * runtime,
            _ => 0.0,
        };

        let allocated: MachineRange = job.allocation.iter().map(|m| m.0).collect();
        let metadata = job.metadata.as_ref().map(|v| v.to_string()).unwrap_or_default();

        let fields = vec![
            job.id.job_name.clone(),
            job.id.workload.to_string(),
            job.profile_ref.name.clone(),
            job.submission_time.to_string(),
            job.requested_nb_res.to_string(),
            job.walltime.0.to_string(),
            success.to_string(),
            job.state.to_string(),
            job.starting_time.map(|t| t.to_string()).unwrap_or_else(empty),
            job.runtime.map(|t| t.to_string()).unwrap_or_else(empty),
            job.finish_time().map(|t| t.to_string()).unwrap_or_else(empty),
            job.waiting_time().map(|t| t.to_string()).unwrap_or_else(empty),
            job.turnaround_time().map(|t| t.to_string()).unwrap_or_else(empty),
            job.stretch().map(|t| t.to_string()).unwrap_or_else(empty),
            if rejected { String::new() } else { allocated.to_range_string() },
            if rejected { String::new() } else { consumed_energy.to_string() },
            metadata,
        ];
        let row = format_row(&fields)?;
        self.file.append(&row)
    }

    pub fn flush(&mut self) -> Result<(), TracerError> {
        self.file.flush()
    }

    /// Writes `schedule.csv` (two lines: header, values), closing out the
    /// running accumulation. Takes the per-machine time-spent maps and the
    /// switch counters, neither of which this tracer owns.
    #[allow(clippy::too_many_arguments)]
    pub fn finalize(
        &mut self,
        time_spent_in_each_state: &BTreeMap<&'static str, f64>,
        nb_machine_switches: u64,
        nb_grouped_switches: u64,
        consumed_joules: f64,
        scheduling_time: f64,
        simulation_time: f64,
    ) -> Result<(), TracerError> {
        self.file.flush()?;

        let s = &self.schedule;
        let success_rate = if s.nb_jobs_finished > 0 { s.nb_jobs_success as f64 / s.nb_jobs_finished as f64 } else { 0.0 };
        let mean = |sum: f64| if s.nb_jobs_finished > 0 { sum / s.nb_jobs_finished as f64 } else { 0.0 };

        let mut columns: Vec<(String, String)> = vec![
            ("nb_jobs".to_string(), s.nb_jobs.to_string()),
            ("nb_jobs_finished".to_string(), s.nb_jobs_finished.to_string()),
            ("nb_jobs_success".to_string(), s.nb_jobs_success.to_string()),
            ("nb_jobs_killed".to_string(), s.nb_jobs_killed.to_string()),
            ("nb_jobs_rejected".to_string(), s.nb_jobs_rejected.to_string()),
            ("success_rate".to_string(), success_rate.to_string()),
            ("makespan".to_string(), s.makespan.to_string()),
            ("mean_waiting_time".to_string(), mean(s.sum_waiting_time).to_string()),
            ("mean_turnaround_time".to_string(), mean(s.sum_turnaround_time).to_string()),
            ("mean_slowdown".to_string(), mean(s.sum_slowdown).to_string()),
            ("max_waiting_time".to_string(), s.max_waiting_time.to_string()),
            ("max_turnaround_time".to_string(), s.max_turnaround_time.to_string()),
            ("max_slowdown".to_string(), s.max_slowdown.to_string()),
            ("scheduling_time".to_string(), scheduling_time.to_string()),
            ("simulation_time".to_string(), simulation_time.to_string()),
            ("consumed_joules".to_string(), consumed_joules.to_string()),
            ("nb_machine_switches".to_string(), nb_machine_switches.to_string()),
            ("nb_grouped_switches".to_string(), nb_grouped_switches.to_string()),
        ];
        for key in MACHINE_STATE_KEYS {
            let value = time_spent_in_each_state.get(key).copied().unwrap_or(0.0);
            columns.push((format!("time_{key}"), value.to_string()));
        }

        let keys: Vec<String> = columns.iter().map(|(k, _)| k.clone()).collect();
        let values: Vec<String> = columns.into_iter().map(|(_, v)| v).collect();

        let mut schedule_file = TraceFile::create(&self.schedule_path)?;
        schedule_file.append(&format_row(&keys)?)?;
        schedule_file.append(&format_row(&values)?)?;
        schedule_file.flush()
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
