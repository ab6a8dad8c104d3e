// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `machine_states.csv`: `time,nb_sleeping,nb_s2c,nb_c2s,nb_idle,nb_computing`.
//!
//! Grounded on `export.cpp`'s `MachineStateTracer`.

use std::path::Path;

use batsim_core::MachineStateCounts;

use crate::buffer::TraceFile;
use crate::csv_row::format_row;
use crate::error::TracerError;

pub struct MachineStateTracer {
    file: TraceFile,
}

impl MachineStateTracer {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TracerError> {
        let mut file = TraceFile::create(path)?;
        file.append("time,nb_sleeping,nb_s2c,nb_c2s,nb_idle,nb_computing\n")?;
        Ok(Self { file })
    }

    pub fn write_machine_states(&mut self, date: f64, counts: MachineStateCounts) -> Result<(), TracerError> {
        let fields = vec![
            date.to_string(),
            counts.nb_sleeping.to_string(),
            counts.nb_s2c.to_string(),
            counts.nb_c2s.to_string(),
            counts.nb_idle.to_string(),
            counts.nb_computing.to_string(),
        ];
        self.file.append(&format_row(&fields)?)
    }

    pub fn flush(&mut self) -> Result<(), TracerError> {
        self.file.flush()
    }
}

#[cfg(test)]
#[path = "machine_states_tests.rs"]
mod tests;
