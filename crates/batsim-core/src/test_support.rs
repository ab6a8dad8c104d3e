// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test-only builders and fixtures shared across `batsim-*` crates.

use crate::id::MachineId;
use crate::machine::{Machine, Role};

/// Build a small homogeneous compute platform for tests: one master plus
/// `n` compute hosts.
pub fn fixture_platform(n: u32) -> Vec<Machine> {
    let mut machines = vec![Machine::new(MachineId(0), "master", Role::Master, 0)];
    for i in 1..=n {
        machines.push(Machine::new(MachineId(i), format!("host{i}"), Role::Compute, i as u64));
    }
    machines
}
