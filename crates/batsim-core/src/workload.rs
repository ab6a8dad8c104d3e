// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Workload`: a named collection of jobs and profiles, either
//! static (loaded from an input file, immutable after load) or dynamic
//! (created at runtime to host EDC-registered jobs).

use crate::error::InvariantViolation;
use crate::id::{validate_identifier, JobId, ProfileId, WorkloadName};
use crate::job::Job;
use crate::profile::Profile;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    Static,
    Dynamic,
}

/// A named collection of jobs and profiles.
///
/// Profiles removed from a workload are remembered in `removed_profiles` so
/// duplicate registration is rejected; concrete profile bytes are
/// released (the `Arc<Profile>` dropped) once no job references them, which
/// is why profiles are stored behind `Arc` rather than owned directly.
#[derive(Debug, Clone)]
pub struct Workload {
    pub name: WorkloadName,
    pub kind: WorkloadKind,
    pub nb_res: Option<u32>,
    jobs: HashMap<String, Job>,
    profiles: HashMap<String, Arc<Profile>>,
    removed_profiles: HashSet<String>,
}

impl Workload {
    pub fn new(name: WorkloadName, kind: WorkloadKind) -> Self {
        Self {
            name,
            kind,
            nb_res: None,
            jobs: HashMap::new(),
            profiles: HashMap::new(),
            removed_profiles: HashSet::new(),
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self.kind, WorkloadKind::Static)
    }

    pub fn register_profile(&mut self, name: &str, profile: Profile) -> Result<(), InvariantViolation> {
        validate_identifier("profile_name", name)
            .map_err(|_| InvariantViolation::IdentifierContainsBang(name.to_string()))?;
        if self.removed_profiles.contains(name) {
            return Err(InvariantViolation::ProfilePreviouslyRemoved {
                workload: self.name.0.clone(),
                name: name.to_string(),
            });
        }
        if self.profiles.contains_key(name) {
            return Err(InvariantViolation::DuplicateProfile {
                workload: self.name.0.clone(),
                name: name.to_string(),
            });
        }
        self.profiles.insert(name.to_string(), Arc::new(profile));
        Ok(())
    }

    pub fn profile(&self, name: &str) -> Option<Arc<Profile>> {
        self.profiles.get(name).cloned()
    }

    pub fn profile_id(&self, name: &str) -> ProfileId {
        ProfileId::new(self.name.clone(), name)
    }

    pub fn register_job(&mut self, job: Job) -> Result<(), InvariantViolation> {
        validate_identifier("job_name", &job.id.job_name)
            .map_err(|_| InvariantViolation::IdentifierContainsBang(job.id.job_name.clone()))?;
        if self.jobs.contains_key(&job.id.job_name) {
            return Err(InvariantViolation::DuplicateJobId(job.id.clone()));
        }
        self.jobs.insert(job.id.job_name.clone(), job);
        Ok(())
    }

    pub fn job(&self, job_name: &str) -> Option<&Job> {
        self.jobs.get(job_name)
    }

    pub fn job_mut(&mut self, job_name: &str) -> Option<&mut Job> {
        self.jobs.get_mut(job_name)
    }

    /// Drops a terminal job's record once the round trip that reported it
    /// has finished, so completed/rejected/killed jobs don't accumulate for
    /// the lifetime of the simulation.
    pub fn remove_job(&mut self, job_name: &str) -> Option<Job> {
        self.jobs.remove(job_name)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn jobs_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.jobs.values_mut()
    }

    pub fn job_id(&self, job_name: &str) -> JobId {
        JobId::new(self.name.clone(), job_name)
    }

    /// Remove a profile, remembering it for duplicate-registration rejection.
    /// Only releases the underlying bytes once the `Arc` refcount drops to
    /// zero, i.e. once no running/pending job still references it.
    pub fn remove_profile(&mut self, name: &str) {
        self.profiles.remove(name);
        self.removed_profiles.insert(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Profile;

    fn dynamic() -> Workload {
        Workload::new(WorkloadName::new("dyn"), WorkloadKind::Dynamic)
    }

    #[test]
    fn duplicate_profile_registration_rejected() {
        let mut w = dynamic();
        w.register_profile("p", Profile::Delay { seconds: 1.0, return_code: 0 }).unwrap();
        let err = w.register_profile("p", Profile::Delay { seconds: 2.0, return_code: 0 }).unwrap_err();
        assert!(matches!(err, InvariantViolation::DuplicateProfile { .. }));
    }

    #[test]
    fn removed_profile_cannot_be_reregistered() {
        let mut w = dynamic();
        w.register_profile("p", Profile::Delay { seconds: 1.0, return_code: 0 }).unwrap();
        w.remove_profile("p");
        let err = w.register_profile("p", Profile::Delay { seconds: 1.0, return_code: 0 }).unwrap_err();
        assert!(matches!(err, InvariantViolation::ProfilePreviouslyRemoved { .. }));
    }

    #[test]
    fn profile_bytes_released_when_last_reference_drops() {
        let mut w = dynamic();
        w.register_profile("p", Profile::Delay { seconds: 1.0, return_code: 0 }).unwrap();
        let handle = w.profile("p").unwrap();
        assert_eq!(Arc::strong_count(&handle), 2);
        w.remove_profile("p");
        drop(handle);
        assert!(w.profile("p").is_none());
    }

    #[test]
    fn job_name_with_bang_rejected() {
        let mut w = dynamic();
        let job = Job::new(
            JobId::new("dyn", "bad!name"),
            w.profile_id("p"),
            0.0,
            crate::job::Walltime::UNBOUNDED,
            1,
        );
        assert!(w.register_job(job).is_err());
    }
}
