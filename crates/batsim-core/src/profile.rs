// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Profile variants: a parameterized description of a job's
//! resource usage pattern. Tagged union, `return_code` defaults to 0.

use serde::{Deserialize, Serialize};

/// How a `HomogeneousParallel` profile's cpu/com amount is spread over hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomogeneousStrategy {
    /// Same value on every host.
    SameForAll,
    /// Total amount spread evenly over the allocation.
    TotalSpreadEvenly,
}

impl Default for HomogeneousStrategy {
    fn default() -> Self {
        HomogeneousStrategy::SameForAll
    }
}

/// A parameterized description of a job's resource usage pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Profile {
    Delay {
        seconds: f64,
        #[serde(default)]
        return_code: i32,
    },

    ParallelTask {
        nb_res: u32,
        cpu_vec: Vec<f64>,
        com_mat: Vec<f64>,
        #[serde(default)]
        return_code: i32,
    },

    HomogeneousParallel {
        cpu: f64,
        com: f64,
        #[serde(default)]
        strategy: HomogeneousStrategy,
        #[serde(default)]
        return_code: i32,
    },

    Sequence {
        repeat: u32,
        sequence: Vec<String>,
        #[serde(default)]
        return_code: i32,
    },

    MpiReplay {
        trace_filenames: Vec<String>,
        #[serde(default)]
        return_code: i32,
    },

    HomogeneousPfs {
        bytes_to_read: f64,
        bytes_to_write: f64,
        storage_label: String,
        #[serde(default)]
        return_code: i32,
    },

    DataStaging {
        bytes: f64,
        from_storage: String,
        to_storage: String,
        #[serde(default)]
        return_code: i32,
    },

    SchedulerSend {
        message_payload: serde_json::Value,
        sleeptime: f64,
        #[serde(default)]
        return_code: i32,
    },

    SchedulerRecv {
        regex: String,
        #[serde(default)]
        on_success: String,
        #[serde(default)]
        on_failure: String,
        #[serde(default)]
        on_timeout: String,
        polltime: f64,
        #[serde(default)]
        return_code: i32,
    },
}

impl Profile {
    pub fn return_code(&self) -> i32 {
        match self {
            Profile::Delay { return_code, .. }
            | Profile::ParallelTask { return_code, .. }
            | Profile::HomogeneousParallel { return_code, .. }
            | Profile::Sequence { return_code, .. }
            | Profile::MpiReplay { return_code, .. }
            | Profile::HomogeneousPfs { return_code, .. }
            | Profile::DataStaging { return_code, .. }
            | Profile::SchedulerSend { return_code, .. }
            | Profile::SchedulerRecv { return_code, .. } => *return_code,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Profile::Delay { .. } => "delay",
            Profile::ParallelTask { .. } => "parallel_task",
            Profile::HomogeneousParallel { .. } => "homogeneous_parallel",
            Profile::Sequence { .. } => "sequence",
            Profile::MpiReplay { .. } => "mpi_replay",
            Profile::HomogeneousPfs { .. } => "homogeneous_pfs",
            Profile::DataStaging { .. } => "data_staging",
            Profile::SchedulerSend { .. } => "scheduler_send",
            Profile::SchedulerRecv { .. } => "scheduler_recv",
        }
    }

    /// Validate the profile's invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Profile::Delay { seconds, .. } => {
                if *seconds <= 0.0 {
                    return Err(format!("Delay.seconds must be > 0, got {seconds}"));
                }
            }
            Profile::ParallelTask { nb_res, cpu_vec, com_mat, .. } => {
                if cpu_vec.len() != *nb_res as usize {
                    return Err(format!(
                        "ParallelTask.cpu_vec has {} entries, expected nb_res={}",
                        cpu_vec.len(),
                        nb_res
                    ));
                }
                if com_mat.len() != (*nb_res as usize) * (*nb_res as usize) {
                    return Err(format!(
                        "ParallelTask.com_mat has {} entries, expected nb_res^2={}",
                        com_mat.len(),
                        nb_res * nb_res
                    ));
                }
                if cpu_vec.iter().any(|v| *v < 0.0) || com_mat.iter().any(|v| *v < 0.0) {
                    return Err("ParallelTask cpu/com values must be >= 0".to_string());
                }
            }
            Profile::HomogeneousParallel { cpu, com, .. } => {
                if *cpu < 0.0 || *com < 0.0 {
                    return Err("HomogeneousParallel cpu/com must be >= 0".to_string());
                }
            }
            Profile::Sequence { repeat, sequence, .. } => {
                if *repeat == 0 {
                    return Err("Sequence.repeat must be > 0".to_string());
                }
                if sequence.is_empty() {
                    return Err("Sequence.sequence must not be empty".to_string());
                }
            }
            Profile::MpiReplay { trace_filenames, .. } => {
                if trace_filenames.is_empty() {
                    return Err("MpiReplay.trace_filenames must have at least one rank".to_string());
                }
            }
            Profile::HomogeneousPfs { bytes_to_read, bytes_to_write, .. } => {
                if *bytes_to_read < 0.0 || *bytes_to_write < 0.0 {
                    return Err("HomogeneousPfs bytes must be >= 0".to_string());
                }
            }
            Profile::DataStaging { bytes, .. } => {
                if *bytes < 0.0 {
                    return Err("DataStaging.bytes must be >= 0".to_string());
                }
            }
            Profile::SchedulerSend { sleeptime, .. } => {
                if *sleeptime <= 0.0 {
                    return Err(format!("SchedulerSend.sleeptime must be > 0, got {sleeptime}"));
                }
            }
            Profile::SchedulerRecv { polltime, .. } => {
                if *polltime <= 0.0 {
                    return Err(format!("SchedulerRecv.polltime must be > 0, got {polltime}"));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
