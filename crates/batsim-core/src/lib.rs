// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! batsim-core: identifiers, data model, clock, and error taxonomy shared by
//! every other `batsim-*` crate.

pub mod macros;

pub mod allocation;
pub mod clock;
pub mod error;
pub mod id;
pub mod instrumentation;
pub mod job;
pub mod machine;
pub mod periodic;
pub mod profile;
pub mod switch;
pub mod workload;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use allocation::AllocationPlacement;
pub use clock::{FakeClock, SimClock, SimTime, SystemClock};
pub use error::{BatsimError, ConfigurationError, InvariantViolation, ProtocolError};
pub use id::{JobId, MachineId, ProfileId, WorkloadName};
pub use instrumentation::{Instrumentation, MachineStateCounts, NullInstrumentation};
pub use job::{Job, JobState, Walltime};
pub use machine::{Machine, MachineRange, MachineState, PStateClass, Role, SleepPstate};
pub use periodic::{PeriodicEntity, PeriodicId, PeriodicKind, Probe, ProbeAggregation, ProbeMetric, Repeat};
pub use profile::{HomogeneousStrategy, Profile};
pub use switch::{CurrentSwitches, SwitchId, SwitchProgress};
pub use workload::{Workload, WorkloadKind};
