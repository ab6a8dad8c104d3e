// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound event accumulation: events the server produces
//! between two EDC round-trips are buffered here and flushed as one batch on
//! the next request.

use crate::context::Context;
use crate::periodic_engine::FiredEntry;
use batsim_core::{MachineId, MachineRange, PeriodicKind, ProbeAggregation, ProbeMetric};
use batsim_protocol::event::{OutboundEvent, PeriodicTriggerEntry};

/// Events accumulated since the last flush to the EDC.
#[derive(Debug, Default)]
pub struct EventBatch {
    events: Vec<OutboundEvent>,
}

impl EventBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: OutboundEvent) {
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Drain the batch for sending; the buffer is empty afterwards.
    pub fn drain(&mut self) -> Vec<OutboundEvent> {
        std::mem::take(&mut self.events)
    }
}

/// `ResourceStateChanged` for a set of machines moving to `new_pstate` (spec
/// §4.3).
pub fn resource_state_changed(machines: &[MachineId], new_pstate: i32) -> OutboundEvent {
    let range: MachineRange = machines.iter().map(|m| m.0).collect();
    OutboundEvent::ResourceStateChanged { machines: range.to_range_string(), new_pstate }
}

/// Turn a slice of entities that fired at the current periodic tick into a
/// `PeriodicTrigger` batch entry each, sampling `Power` probes against the
/// live machine wattage table.
///
/// Probes with no aggregation emit the per-host vector verbatim; `Sum`/`Mean`
/// also fill `aggregated` so the EDC doesn't have to re-derive it.
pub fn periodic_trigger(ctx: &Context, fired: &[FiredEntry]) -> Option<OutboundEvent> {
    if fired.is_empty() {
        return None;
    }
    let entries = fired
        .iter()
        .map(|entry| match entry.kind {
            PeriodicKind::CallMeLater => PeriodicTriggerEntry::CallMeLaterFired { id: entry.id.0 },
            PeriodicKind::Probe => {
                let probe = entry.probe.as_ref();
                let empty = Vec::new();
                let machines = match probe.map(|p| &p.metric) {
                    Some(ProbeMetric::Power { machines }) => machines,
                    None => &empty,
                };
                let values: Vec<f64> =
                    machines.iter().map(|&id| ctx.machine(MachineId(id)).map(|m| m.epower()).unwrap_or(0.0)).collect();
                let aggregated = match probe.map(|p| p.aggregation) {
                    Some(ProbeAggregation::Sum) => Some(values.iter().sum()),
                    Some(ProbeAggregation::Mean) if !values.is_empty() => {
                        Some(values.iter().sum::<f64>() / values.len() as f64)
                    }
                    _ => None,
                };
                PeriodicTriggerEntry::ProbeSample {
                    id: entry.id.0,
                    values,
                    aggregated,
                    is_last_periodic: entry.retired,
                }
            }
        })
        .collect();
    Some(OutboundEvent::PeriodicTrigger { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use batsim_core::{Probe, Repeat};

    #[test]
    fn batch_drains_to_empty() {
        let mut batch = EventBatch::new();
        batch.push(OutboundEvent::SimulationEnds);
        assert_eq!(batch.len(), 1);
        let drained = batch.drain();
        assert_eq!(drained.len(), 1);
        assert!(batch.is_empty());
    }

    #[test]
    fn resource_state_changed_formats_machine_range() {
        let event = resource_state_changed(&[MachineId(0), MachineId(1), MachineId(3)], 2);
        match event {
            OutboundEvent::ResourceStateChanged { machines, new_pstate } => {
                assert_eq!(machines, "0-1,3");
                assert_eq!(new_pstate, 2);
            }
            _ => panic!("wrong event"),
        }
    }

    #[test]
    fn call_me_later_fire_becomes_trigger_entry() {
        let ctx = Context::new(Vec::new());
        let fired = vec![FiredEntry {
            id: batsim_core::PeriodicId(7),
            kind: PeriodicKind::CallMeLater,
            probe: None,
            retired: false,
        }];
        let event = periodic_trigger(&ctx, &fired).unwrap();
        match event {
            OutboundEvent::PeriodicTrigger { entries } => {
                assert_eq!(entries.len(), 1);
                assert!(matches!(entries[0], PeriodicTriggerEntry::CallMeLaterFired { id: 7 }));
            }
            _ => panic!("wrong event"),
        }
    }

    #[test]
    fn probe_sample_sums_and_reports_last_periodic() {
        let mut machine = batsim_core::Machine::new(MachineId(0), "m0", batsim_core::Role::Compute, 0);
        machine.wattage.insert(0, 120.0);
        let ctx = Context::new(vec![machine]);
        let fired = vec![FiredEntry {
            id: batsim_core::PeriodicId(1),
            kind: PeriodicKind::Probe,
            probe: Some(Probe { metric: ProbeMetric::Power { machines: vec![0] }, aggregation: ProbeAggregation::Sum }),
            retired: true,
        }];
        let event = periodic_trigger(&ctx, &fired).unwrap();
        match event {
            OutboundEvent::PeriodicTrigger { entries } => match &entries[0] {
                PeriodicTriggerEntry::ProbeSample { values, aggregated, is_last_periodic, .. } => {
                    assert_eq!(values, &[120.0]);
                    assert_eq!(*aggregated, Some(120.0));
                    assert!(*is_last_periodic);
                }
                _ => panic!("wrong entry"),
            },
            _ => panic!("wrong event"),
        }
        let _ = Repeat::Infinite;
    }
}
