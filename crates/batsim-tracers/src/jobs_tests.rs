use super::*;
use batsim_core::{JobState, MachineId, ProfileId, Walltime};
use std::fs;
use tempfile::tempdir;

fn finished_job(runtime: f64) -> Job {
    let mut job = Job::new(JobId::new("w0", "job0"), ProfileId::new("w0", "p0"), 0.0, Walltime::UNBOUNDED, 2);
    job.transition(JobState::Submitted).unwrap();
    job.transition(JobState::Running).unwrap();
    job.starting_time = Some(1.0);
    job.runtime = Some(runtime);
    job.allocation.insert(MachineId(0));
    job.allocation.insert(MachineId(1));
    job.transition(JobState::CompletedSuccessfully).unwrap();
    job.return_code = Some(0);
    job
}

#[test]
fn write_job_emits_one_row_per_terminal_job() {
    let dir = tempdir().unwrap();
    let mut tracer = JobsTracer::create(dir.path().join("jobs.csv"), dir.path().join("schedule.csv")).unwrap();

    let job = finished_job(10.0);
    tracer.write_job(&job, 50.0).unwrap();
    tracer.flush().unwrap();

    let content = fs::read_to_string(dir.path().join("jobs.csv")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("job_id,workload_name"));
    assert!(lines[1].starts_with("job0,w0,p0,0,2"));
}

#[test]
fn rejected_job_leaves_timing_fields_empty() {
    let dir = tempdir().unwrap();
    let mut tracer = JobsTracer::create(dir.path().join("jobs.csv"), dir.path().join("schedule.csv")).unwrap();

    let mut job = Job::new(JobId::new("w0", "job1"), ProfileId::new("w0", "p0"), 0.0, Walltime::UNBOUNDED, 1);
    job.transition(JobState::Submitted).unwrap();
    job.transition(JobState::Rejected).unwrap();
    tracer.write_job(&job, 0.0).unwrap();
    tracer.flush().unwrap();

    let content = fs::read_to_string(dir.path().join("jobs.csv")).unwrap();
    let row = content.lines().nth(1).unwrap();
    let fields: Vec<&str> = row.split(',').collect();
    // starting_time .. consumed_energy
    for idx in [8, 9, 10, 11, 12, 13, 14, 15] {
        assert_eq!(fields[idx], "", "field {idx} should be empty for a rejected job");
    }
}

#[test]
fn schedule_csv_aggregates_across_jobs() {
    let dir = tempdir().unwrap();
    let mut tracer = JobsTracer::create(dir.path().join("jobs.csv"), dir.path().join("schedule.csv")).unwrap();

    tracer.write_job(&finished_job(10.0), 0.0).unwrap();
    tracer.write_job(&finished_job(20.0), 0.0).unwrap();

    let state = BTreeMap::new();
    tracer.finalize(&state, 3, 1, 100.0, 0.01, 42.0).unwrap();

    let content = fs::read_to_string(dir.path().join("schedule.csv")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    let header: Vec<&str> = lines[0].split(',').collect();
    let values: Vec<&str> = lines[1].split(',').collect();
    let nb_jobs_idx = header.iter().position(|h| *h == "nb_jobs").unwrap();
    assert_eq!(values[nb_jobs_idx], "2");
    let switches_idx = header.iter().position(|h| *h == "nb_machine_switches").unwrap();
    assert_eq!(values[switches_idx], "3");
}
