// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `consumed_energy.csv`: `time,energy,event_type,wattmin,epower`.
//!
//! Grounded on `export.cpp`'s `EnergyConsumptionTracer`. The original reads
//! cumulative energy straight off the live machine registry
//! (`context->machines.total_consumed_energy()`); this tracer does not own
//! that registry, so it integrates the `epower` value the caller already
//! computed for the event's affected machines, trapezoidally against the
//! previous entry, to obtain a running cumulative total.

use std::path::Path;

use crate::buffer::TraceFile;
use crate::csv_row::format_row;
use crate::error::TracerError;

/// Event types the original tags rows with: job-start, job-end, pstate-change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyEvent {
    JobStart,
    JobEnd,
    PstateChange,
}

impl EnergyEvent {
    fn tag(self) -> char {
        match self {
            EnergyEvent::JobStart => 's',
            EnergyEvent::JobEnd => 'e',
            EnergyEvent::PstateChange => 'p',
        }
    }
}

pub struct EnergyConsumptionTracer {
    file: TraceFile,
    wattmin: f64,
    last_entry_date: f64,
    last_entry_energy: f64,
    last_epower: f64,
    energy_first_job_submission: Option<f64>,
    energy_last_job_completion: f64,
}

impl EnergyConsumptionTracer {
    pub fn create(path: impl AsRef<Path>, wattmin: f64) -> Result<Self, TracerError> {
        let mut file = TraceFile::create(path)?;
        file.append("time,energy,event_type,wattmin,epower\n")?;
        Ok(Self {
            file,
            wattmin,
            last_entry_date: 0.0,
            last_entry_energy: 0.0,
            last_epower: 0.0,
            energy_first_job_submission: None,
            energy_last_job_completion: 0.0,
        })
    }

    pub fn add_entry(&mut self, date: f64, event: EnergyEvent, epower: f64) -> Result<f64, TracerError> {
        let time_diff = date - self.last_entry_date;
        let energy = if time_diff > 0.0 {
            self.last_entry_energy + self.last_epower * time_diff
        } else {
            self.last_entry_energy
        };

        let epower_field = if time_diff > 0.0 { Some(epower) } else { None };
        let fields = vec![
            date.to_string(),
            energy.to_string(),
            event.tag().to_string(),
            self.wattmin.to_string(),
            epower_field.map(|p| p.to_string()).unwrap_or_else(|| "NA".to_string()),
        ];
        self.file.append(&format_row(&fields)?)?;

        self.last_entry_date = date;
        self.last_entry_energy = energy;
        self.last_epower = epower;

        match event {
            EnergyEvent::JobStart => {
                self.energy_first_job_submission.get_or_insert(energy);
            }
            EnergyEvent::JobEnd => self.energy_last_job_completion = energy,
            EnergyEvent::PstateChange => {}
        }
        Ok(energy)
    }

    /// `energy_last_job_completion - energy_first_job_submission`; zero if
    /// no job ever ran.
    pub fn consumed_joules(&self) -> f64 {
        self.energy_last_job_completion - self.energy_first_job_submission.unwrap_or(self.energy_last_job_completion)
    }

    pub fn flush(&mut self) -> Result<(), TracerError> {
        self.file.flush()
    }
}

#[cfg(test)]
#[path = "energy_tests.rs"]
mod tests;
