// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gantt trace: an event-stream sufficient to reconstruct per-host
//! job-activity colored spans, as a flat CSV rather than a stateful
//! container/event-type hierarchy tuned to a particular viewer.

use std::path::Path;

use batsim_core::{JobId, MachineRange};

use crate::buffer::TraceFile;
use crate::csv_row::format_row;
use crate::error::TracerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GanttEvent {
    JobStart,
    JobEnd,
    PstateChange,
}

impl GanttEvent {
    fn tag(self) -> &'static str {
        match self {
            GanttEvent::JobStart => "job_start",
            GanttEvent::JobEnd => "job_end",
            GanttEvent::PstateChange => "pstate_change",
        }
    }
}

pub struct GanttTracer {
    file: TraceFile,
}

impl GanttTracer {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TracerError> {
        let mut file = TraceFile::create(path)?;
        file.append("time,machine_id_set,event,job_id,pstate\n")?;
        Ok(Self { file })
    }

    pub fn job_span(&mut self, time: f64, machines: &MachineRange, event: GanttEvent, job_id: &JobId) -> Result<(), TracerError> {
        let fields = vec![
            time.to_string(),
            machines.to_range_string(),
            event.tag().to_string(),
            job_id.canonical(),
            String::new(),
        ];
        self.file.append(&format_row(&fields)?)
    }

    pub fn pstate_span(&mut self, time: f64, machines: &MachineRange, new_pstate: i32) -> Result<(), TracerError> {
        let fields = vec![
            time.to_string(),
            machines.to_range_string(),
            GanttEvent::PstateChange.tag().to_string(),
            String::new(),
            new_pstate.to_string(),
        ];
        self.file.append(&format_row(&fields)?)
    }

    pub fn flush(&mut self) -> Result<(), TracerError> {
        self.file.flush()
    }
}

#[cfg(test)]
#[path = "gantt_tests.rs"]
mod tests;
