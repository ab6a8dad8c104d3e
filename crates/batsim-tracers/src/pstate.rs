// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pstate_changes.csv`: `time,machine_id_set,new_pstate`.
//!
//! Grounded on `export.cpp`'s `PStateChangeTracer`, one row per switch batch.

use std::path::Path;

use batsim_core::MachineRange;

use crate::buffer::TraceFile;
use crate::csv_row::format_row;
use crate::error::TracerError;

pub struct PstateChangeTracer {
    file: TraceFile,
}

impl PstateChangeTracer {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TracerError> {
        let mut file = TraceFile::create(path)?;
        file.append("time,machine_id_set,new_pstate\n")?;
        Ok(Self { file })
    }

    pub fn add_pstate_change(&mut self, time: f64, machines: &MachineRange, new_pstate: i32) -> Result<(), TracerError> {
        let row = format_row(&[time.to_string(), machines.to_range_string(), new_pstate.to_string()])?;
        self.file.append(&row)
    }

    pub fn flush(&mut self) -> Result<(), TracerError> {
        self.file.flush()
    }
}

#[cfg(test)]
#[path = "pstate_tests.rs"]
mod tests;
