// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifiers: `JobIdentifier`, profile identifiers, workload
//! names, and machine ids.

use crate::error::InvariantViolation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A printable identifier that MUST NOT contain `!`.
///
/// Both a workload's name and a job's name within it are validated this way;
/// the `!` is reserved as the separator in canonical string forms.
pub fn validate_identifier(field: &'static str, value: &str) -> Result<(), InvariantViolation> {
    if value.contains('!') {
        return Err(InvariantViolation::IdentifierContainsBang(format!("{field}={value:?}")));
    }
    Ok(())
}

/// Name of a workload (static or dynamic). See [`crate::workload::Workload`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkloadName(pub String);

impl WorkloadName {
    pub fn new(s: impl Into<String>) -> Self {
        WorkloadName(s.into())
    }
}

impl fmt::Display for WorkloadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkloadName {
    fn from(s: &str) -> Self {
        WorkloadName(s.to_string())
    }
}

/// `JobIdentifier`: pair `(workload_name, job_name)`.
///
/// Canonical string form is `workload_name!job_name`; ordering is lexical on
/// that string; equality requires both fields equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId {
    pub workload: WorkloadName,
    pub job_name: String,
}

impl JobId {
    pub fn new(workload: impl Into<WorkloadName>, job_name: impl Into<String>) -> Self {
        Self { workload: workload.into(), job_name: job_name.into() }
    }

    /// Parse the canonical `workload!job` form.
    pub fn parse(s: &str) -> Option<Self> {
        let (workload, job_name) = s.split_once('!')?;
        Some(Self { workload: WorkloadName::new(workload), job_name: job_name.to_string() })
    }

    pub fn canonical(&self) -> String {
        format!("{}!{}", self.workload, self.job_name)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.workload, self.job_name)
    }
}

impl PartialOrd for JobId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for JobId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.canonical().cmp(&other.canonical())
    }
}

impl Serialize for JobId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.canonical())
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        JobId::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid job id {s:?}, expected workload!job")))
    }
}

/// Identifier for a profile: owned by exactly one workload, named within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileId {
    pub workload: WorkloadName,
    pub name: String,
}

impl ProfileId {
    pub fn new(workload: impl Into<WorkloadName>, name: impl Into<String>) -> Self {
        Self { workload: workload.into(), name: name.into() }
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.workload, self.name)
    }
}

/// Identifier of a host in the platform (dense, zero-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineId(pub u32);

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for MachineId {
    fn from(v: u32) -> Self {
        MachineId(v)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
