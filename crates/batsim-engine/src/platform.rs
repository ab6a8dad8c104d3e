// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The capability surface the execution engine needs from the external
//! platform simulator and from the profile/job registries it runs against
//!.

use batsim_core::{MachineId, Profile};
use std::sync::Arc;

/// What the engine needs from whatever owns the real platform physics.
/// `batsim-server` implements this atop the platform simulator handle
/// threaded through `Machine::host_handle`; nothing in this crate computes
/// flops or network contention itself.
pub trait Platform {
    /// Duration (seconds) the platform simulator reports for running `cpu`
    /// flops (one entry per host) with communication matrix `com` (`hosts.len()^2`
    /// entries, row-major) over `hosts`.
    fn ptask_duration(&self, hosts: &[MachineId], cpu: &[f64], com: &[f64]) -> f64;

    /// Duration (seconds) for transferring `bytes` between `from` and `to`.
    fn transfer_duration(&self, from: MachineId, to: MachineId, bytes: f64) -> f64;
}

/// Resolves a profile name (as referenced by `Sequence`/`SchedulerRecv`) to
/// its definition, scoped to the job's workload.
pub trait ProfileResolver {
    fn resolve(&self, name: &str) -> Option<Arc<Profile>>;
}
