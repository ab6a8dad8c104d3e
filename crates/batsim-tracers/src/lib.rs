// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Buffered CSV/gantt exporters.
//!
//! Each exporter gets its own module behind a thin `WriteBuffer`; this
//! crate unifies them behind [`batsim_core::Instrumentation`] via
//! [`TracerSet`] instead of an inheritance hierarchy of tracer types.

mod buffer;
mod csv_row;
mod energy;
mod error;
mod gantt;
mod jobs;
mod machine_states;
mod pstate;
mod set;

pub use energy::{EnergyConsumptionTracer, EnergyEvent};
pub use error::TracerError;
pub use gantt::{GanttEvent, GanttTracer};
pub use jobs::JobsTracer;
pub use machine_states::MachineStateTracer;
pub use pstate::PstateChangeTracer;
pub use set::{total_wattmin, TracerPaths, TracerSet};

impl From<TracerError> for batsim_core::BatsimError {
    fn from(e: TracerError) -> Self {
        batsim_core::BatsimError::Io(e.to_string())
    }
}
