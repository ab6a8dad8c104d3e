use super::*;
use batsim_core::{JobId, JobState, MachineId, ProfileId, Walltime};
use std::fs;
use tempfile::tempdir;

#[test]
fn all_five_exports_plus_gantt_are_created() {
    let dir = tempdir().unwrap();
    let paths = TracerPaths::with_prefix(dir.path());
    let mut tracers = TracerSet::create(&paths, 10.0).unwrap();

    let mut job = Job::new(JobId::new("w0", "job0"), ProfileId::new("w0", "p0"), 0.0, Walltime::UNBOUNDED, 1);
    job.transition(JobState::Submitted).unwrap();
    job.transition(JobState::Running).unwrap();
    job.starting_time = Some(0.0);
    job.allocation.insert(MachineId(0));
    let machines: MachineRange = [0u32].into_iter().collect();

    tracers.on_job_started(0.0, &job, &machines, 50.0);
    job.runtime = Some(10.0);
    job.transition(JobState::CompletedSuccessfully).unwrap();
    tracers.on_job_finished(10.0, &job, 50.0);
    tracers.on_pstate_changed(10.0, &machines, 3, 0.0);
    tracers.on_machine_states(10.0, MachineStateCounts { nb_sleeping: 1, nb_s2c: 0, nb_c2s: 0, nb_idle: 0, nb_computing: 0 });

    let state = BTreeMap::new();
    tracers.finalize(&state, 1, 1, 0.001, 10.0).unwrap();

    for file in [&paths.jobs, &paths.schedule, &paths.pstate_changes, &paths.consumed_energy, &paths.machine_states, &paths.gantt] {
        assert!(fs::metadata(file).is_ok(), "{file:?} should have been written");
    }

    let jobs_csv = fs::read_to_string(&paths.jobs).unwrap();
    assert_eq!(jobs_csv.lines().count(), 2);
}

#[test]
fn total_wattmin_sums_each_machines_lowest_pstate_wattage() {
    let mut m0 = Machine::new(MachineId(0), "m0", batsim_core::Role::Compute, 0);
    m0.wattage.insert(0, 120.0);
    m0.wattage.insert(1, 10.0);
    let mut m1 = Machine::new(MachineId(1), "m1", batsim_core::Role::Compute, 1);
    m1.wattage.insert(0, 90.0);

    assert_eq!(total_wattmin(&[m0, m1]), 100.0);
}
