// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Platform file loading. This is a JSON schema of our own design, shaped around
//! [`batsim_core::Machine`] and the flat-rate [`SimplePlatform`] engine
//! adapter, not a reimplementation of the original topology format.

use std::path::Path;

use batsim_core::{ConfigurationError, Machine, MachineId, PStateClass, Role, SleepPstate};
use batsim_server::platform::SimplePlatform;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PlatformFile {
    #[serde(default = "default_rate")]
    flops_per_second: f64,
    #[serde(default = "default_rate")]
    bytes_per_second: f64,
    hosts: Vec<HostRecord>,
}

fn default_rate() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
struct HostRecord {
    name: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    host_handle: u64,
    /// pstate id -> watts at that pstate, when per-host energy is modeled.
    #[serde(default)]
    wattage: std::collections::BTreeMap<i32, f64>,
    /// pstate id -> class ("compute", "sleep", "transition_virtual").
    #[serde(default)]
    pstates: std::collections::BTreeMap<i32, String>,
    /// sleep pstate id -> {on_vps, off_vps}.
    #[serde(default)]
    sleep_pstates: std::collections::BTreeMap<i32, SleepPstateRecord>,
}

#[derive(Debug, Deserialize)]
struct SleepPstateRecord {
    on_vps: i32,
    off_vps: i32,
}

/// A loaded platform: the machine registry plus the flat-rate engine model
/// derived from it.
pub struct LoadedPlatform {
    pub machines: Vec<Machine>,
    pub engine: SimplePlatform,
}

pub fn load_platform(path: &Path, energy_host: bool) -> Result<LoadedPlatform, ConfigurationError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigurationError::UnreadablePlatform { path: path.display().to_string(), reason: e.to_string() })?;
    let file: PlatformFile = serde_json::from_str(&text)
        .map_err(|e| ConfigurationError::UnreadablePlatform { path: path.display().to_string(), reason: e.to_string() })?;

    let mut machines = Vec::with_capacity(file.hosts.len());
    for (idx, host) in file.hosts.into_iter().enumerate() {
        let role = match &host.role {
            Some(r) => r.parse::<Role>().map_err(|role| ConfigurationError::UnknownRole { role })?,
            None => Role::Compute,
        };
        let mut machine = Machine::new(MachineId(idx as u32), host.name, role, host.host_handle);
        for (pstate, class) in host.pstates {
            let class = match class.as_str() {
                "compute" => PStateClass::Compute,
                "sleep" => PStateClass::Sleep,
                "transition_virtual" => PStateClass::TransitionVirtual,
                other => return Err(ConfigurationError::UnknownRole { role: other.to_string() }),
            };
            machine.pstates.insert(pstate, class);
        }
        for (pstate, sleep) in host.sleep_pstates {
            machine.sleep_pstates.insert(pstate, SleepPstate { on_vps: sleep.on_vps, off_vps: sleep.off_vps });
        }
        if energy_host {
            machine.wattage = host.wattage;
        }
        machines.push(machine);
    }

    Ok(LoadedPlatform {
        machines,
        engine: SimplePlatform { flops_per_second: file.flops_per_second, bytes_per_second: file.bytes_per_second },
    })
}

/// `--mmax <N>`: keep only the first `N` compute machines, leaving
/// non-compute roles untouched.
pub fn apply_mmax(machines: Vec<Machine>, mmax: u32) -> Vec<Machine> {
    let mut kept = Vec::with_capacity(machines.len());
    let mut nb_compute = 0u32;
    for machine in machines {
        if machine.role == Role::Compute {
            if nb_compute >= mmax {
                continue;
            }
            nb_compute += 1;
        }
        kept.push(machine);
    }
    kept
}

/// `--mmax-workload`: cap usable compute machines at the largest
/// `requested_number_of_resources` seen across every loaded workload (spec
/// §6).
pub fn mmax_from_workloads(workloads: &[batsim_core::Workload]) -> u32 {
    workloads.iter().flat_map(|w| w.jobs()).map(|j| j.requested_nb_res).max().unwrap_or(0)
}
