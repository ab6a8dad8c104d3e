// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static workload, external-event, and workflow loading.
//!
//! Follows the conventional wire JSON shape for workload files rather than
//! inventing a new one: `{nb_res, jobs: [...], profiles: {name: {...}}}`.

use batsim_core::{ConfigurationError, Job, Profile, Walltime, Workload, WorkloadKind, WorkloadName};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct WorkloadFile {
    nb_res: Option<u32>,
    jobs: Vec<JobRecord>,
    profiles: std::collections::BTreeMap<String, Profile>,
}

#[derive(Debug, Deserialize)]
struct JobRecord {
    id: String,
    subtime: f64,
    #[serde(default = "default_walltime")]
    walltime: f64,
    res: u32,
    profile: String,
}

fn default_walltime() -> f64 {
    Walltime::UNBOUNDED.0
}

/// Load a static workload from its JSON file.
pub fn load_workload(name: WorkloadName, path: &Path) -> Result<Workload, ConfigurationError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigurationError::UnreadableWorkload {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_workload(name, &text, &path.display().to_string())
}

fn parse_workload(name: WorkloadName, text: &str, path: &str) -> Result<Workload, ConfigurationError> {
    let file: WorkloadFile = serde_json::from_str(text)
        .map_err(|e| ConfigurationError::MalformedWorkload { path: path.to_string(), reason: e.to_string() })?;

    let mut workload = Workload::new(name, WorkloadKind::Static);
    workload.nb_res = file.nb_res;

    for (profile_name, profile) in file.profiles {
        profile.validate().map_err(|reason| ConfigurationError::MalformedProfile {
            workload: workload.name.0.clone(),
            name: profile_name.clone(),
            reason,
        })?;
        workload.register_profile(&profile_name, profile).map_err(|e| ConfigurationError::MalformedProfile {
            workload: workload.name.0.clone(),
            name: profile_name,
            reason: e.to_string(),
        })?;
    }

    for record in file.jobs {
        if workload.profile(&record.profile).is_none() {
            return Err(ConfigurationError::MalformedWorkload {
                path: path.to_string(),
                reason: format!("job {} references unknown profile {}", record.id, record.profile),
            });
        }
        let job_id = workload.job_id(&record.id);
        let profile_ref = workload.profile_id(&record.profile);
        let job = Job::new(job_id, profile_ref, record.subtime, Walltime(record.walltime), record.res);
        workload.register_job(job).map_err(|e| ConfigurationError::MalformedWorkload {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
    }

    Ok(workload)
}

/// One line of the newline-delimited external-event file.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalEvent {
    pub timestamp: f64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Parse an external-event file: one JSON object per line, sorted by
/// `(timestamp, type)` so ties resolve deterministically regardless of file
/// order.
pub fn load_events(path: &Path) -> Result<Vec<ExternalEvent>, ConfigurationError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigurationError::MalformedEvents {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let mut events = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: ExternalEvent = serde_json::from_str(line).map_err(|e| ConfigurationError::MalformedEvents {
            path: path.display().to_string(),
            reason: format!("line {}: {e}", lineno + 1),
        })?;
        events.push(event);
    }
    events.sort_by(|a, b| a.timestamp.partial_cmp(&b.timestamp).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.kind.cmp(&b.kind)));
    Ok(events)
}

/// One workflow task: a job description plus its dependency edges.
/// `depends_on` names are resolved against sibling tasks in the same
/// workflow file.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowTask {
    pub id: String,
    #[serde(default)]
    pub start_time: Option<f64>,
    pub res: u32,
    pub profile: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WorkflowFile {
    profiles: std::collections::BTreeMap<String, Profile>,
    tasks: Vec<WorkflowTask>,
}

/// Expand a workflow DAG into a dynamic workload: every task becomes a job
/// whose `metadata` records its unresolved dependency ids.
pub fn load_workflow(name: WorkloadName, path: &Path) -> Result<Workload, ConfigurationError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigurationError::MalformedWorkflow {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let file: WorkflowFile = serde_json::from_str(&text)
        .map_err(|e| ConfigurationError::MalformedWorkflow { path: path.display().to_string(), reason: e.to_string() })?;

    let mut workload = Workload::new(name, WorkloadKind::Dynamic);
    for (profile_name, profile) in file.profiles {
        profile.validate().map_err(|reason| ConfigurationError::MalformedProfile {
            workload: workload.name.0.clone(),
            name: profile_name.clone(),
            reason,
        })?;
        workload.register_profile(&profile_name, profile).map_err(|e| ConfigurationError::MalformedWorkflow {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    }

    let task_ids: std::collections::HashSet<&str> = file.tasks.iter().map(|t| t.id.as_str()).collect();
    for task in &file.tasks {
        for dep in &task.depends_on {
            if !task_ids.contains(dep.as_str()) {
                return Err(ConfigurationError::MalformedWorkflow {
                    path: path.display().to_string(),
                    reason: format!("task {} depends on unknown task {}", task.id, dep),
                });
            }
        }
    }

    for task in file.tasks {
        let job_id = workload.job_id(&task.id);
        let profile_ref = workload.profile_id(&task.profile);
        let mut job = Job::new(job_id, profile_ref, task.start_time.unwrap_or(0.0), Walltime::UNBOUNDED, task.res);
        job.metadata = Some(serde_json::json!({ "depends_on": task.depends_on }));
        workload.register_job(job).map_err(|e| ConfigurationError::MalformedWorkflow {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    }

    Ok(workload)
}

/// A job's unresolved dependency ids, read back from the `metadata` stashed
/// by [`load_workflow`].
pub fn pending_dependencies(job: &batsim_core::Job) -> Vec<String> {
    job.metadata
        .as_ref()
        .and_then(|m| m.get("depends_on"))
        .and_then(|d| d.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_static_workload() {
        let text = r#"{
            "nb_res": 4,
            "profiles": { "p0": { "type": "delay", "seconds": 10.0 } },
            "jobs": [ { "id": "j0", "subtime": 0.0, "res": 2, "profile": "p0" } ]
        }"#;
        let workload = parse_workload(WorkloadName::new("w0"), text, "w0.json").unwrap();
        assert_eq!(workload.nb_res, Some(4));
        let job = workload.job("j0").unwrap();
        assert_eq!(job.requested_nb_res, 2);
        assert!(job.walltime.is_unbounded());
    }

    #[test]
    fn job_referencing_unknown_profile_is_rejected() {
        let text = r#"{
            "nb_res": 1,
            "profiles": {},
            "jobs": [ { "id": "j0", "subtime": 0.0, "res": 1, "profile": "missing" } ]
        }"#;
        let err = parse_workload(WorkloadName::new("w0"), text, "w0.json").unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedWorkload { .. }));
    }

    #[test]
    fn invalid_profile_is_rejected_before_any_job_is_read() {
        let text = r#"{
            "nb_res": 1,
            "profiles": { "p0": { "type": "delay", "seconds": -1.0 } },
            "jobs": []
        }"#;
        let err = parse_workload(WorkloadName::new("w0"), text, "w0.json").unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedProfile { .. }));
    }

    #[test]
    fn events_sort_by_timestamp_then_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(
            &path,
            "{\"timestamp\": 5.0, \"type\": \"b\"}\n{\"timestamp\": 1.0, \"type\": \"z\"}\n{\"timestamp\": 1.0, \"type\": \"a\"}\n",
        )
        .unwrap();
        let events = load_events(&path).unwrap();
        let order: Vec<(f64, &str)> = events.iter().map(|e| (e.timestamp, e.kind.as_str())).collect();
        assert_eq!(order, vec![(1.0, "a"), (1.0, "z"), (5.0, "b")]);
    }

    #[test]
    fn workflow_rejects_unknown_dependency() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wf.json");
        std::fs::write(
            &path,
            r#"{
                "profiles": { "p0": { "type": "delay", "seconds": 1.0 } },
                "tasks": [ { "id": "t0", "res": 1, "profile": "p0", "depends_on": ["ghost"] } ]
            }"#,
        )
        .unwrap();
        let err = load_workflow(WorkloadName::new("wf"), &path).unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedWorkflow { .. }));
    }

    #[test]
    fn workflow_task_dependencies_are_retrievable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wf.json");
        std::fs::write(
            &path,
            r#"{
                "profiles": { "p0": { "type": "delay", "seconds": 1.0 } },
                "tasks": [
                    { "id": "t0", "res": 1, "profile": "p0" },
                    { "id": "t1", "res": 1, "profile": "p0", "depends_on": ["t0"] }
                ]
            }"#,
        )
        .unwrap();
        let workload = load_workflow(WorkloadName::new("wf"), &path).unwrap();
        let job = workload.job("t1").unwrap();
        assert_eq!(pending_dependencies(job), vec!["t0".to_string()]);
    }
}
