// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `CurrentSwitches`: the set of pending pstate switches.

use crate::id::MachineId;
use std::collections::{HashMap, HashSet};

/// Identifier for a single switch batch, assigned by the pstate engine
/// (`batsim-server::pstate_engine`) when it begins a `PStateModification`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SwitchId(pub u64);

/// One pending pstate switch: `{all_machines, switching_machines, target_pstate}`.
///
/// A switch is complete when `switching_machines` becomes empty; completion
/// triggers a single `ResourceStateChanged` covering `all_machines`.
#[derive(Debug, Clone)]
pub struct SwitchProgress {
    pub all_machines: Vec<MachineId>,
    pub switching_machines: HashSet<MachineId>,
    pub target_pstate: i32,
}

impl SwitchProgress {
    pub fn new(all_machines: Vec<MachineId>, target_pstate: i32) -> Self {
        let switching_machines = all_machines.iter().copied().collect();
        Self { all_machines, switching_machines, target_pstate }
    }

    pub fn mark_done(&mut self, machine: MachineId) {
        self.switching_machines.remove(&machine);
    }

    pub fn is_complete(&self) -> bool {
        self.switching_machines.is_empty()
    }
}

/// Registry of pending pstate switches, keyed by [`SwitchId`].
#[derive(Debug, Clone, Default)]
pub struct CurrentSwitches {
    next_id: u64,
    switches: HashMap<SwitchId, SwitchProgress>,
}

impl CurrentSwitches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, all_machines: Vec<MachineId>, target_pstate: i32) -> SwitchId {
        let id = SwitchId(self.next_id);
        self.next_id += 1;
        self.switches.insert(id, SwitchProgress::new(all_machines, target_pstate));
        id
    }

    pub fn get_mut(&mut self, id: SwitchId) -> Option<&mut SwitchProgress> {
        self.switches.get_mut(&id)
    }

    /// The target pstate of whichever pending switch `machine` belongs to.
    pub fn target_pstate_for(&self, machine: MachineId) -> Option<i32> {
        self.switches
            .values()
            .find(|p| p.switching_machines.contains(&machine))
            .map(|p| p.target_pstate)
    }

    /// Mark `machine` done for whichever switch it belongs to; returns the
    /// id and batch if that switch just completed.
    pub fn mark_done(&mut self, machine: MachineId) -> Option<(SwitchId, Vec<MachineId>)> {
        let mut completed = None;
        for (id, progress) in self.switches.iter_mut() {
            if progress.switching_machines.contains(&machine) {
                progress.mark_done(machine);
                if progress.is_complete() {
                    completed = Some((*id, progress.all_machines.clone()));
                }
                break;
            }
        }
        if let Some((id, _)) = &completed {
            self.switches.remove(id);
        }
        completed
    }

    pub fn pending_count(&self) -> usize {
        self.switches.values().map(|p| p.switching_machines.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_completes_when_all_machines_report() {
        let mut switches = CurrentSwitches::new();
        let id = switches.begin(vec![MachineId(0), MachineId(1)], 3);
        assert!(switches.mark_done(MachineId(0)).is_none());
        let completed = switches.mark_done(MachineId(1)).unwrap();
        assert_eq!(completed.0, id);
        assert_eq!(completed.1, vec![MachineId(0), MachineId(1)]);
        assert!(switches.is_empty());
    }

    #[test]
    fn pending_count_tracks_outstanding_machines() {
        let mut switches = CurrentSwitches::new();
        switches.begin(vec![MachineId(0), MachineId(1), MachineId(2)], 1);
        assert_eq!(switches.pending_count(), 3);
        switches.mark_done(MachineId(0));
        assert_eq!(switches.pending_count(), 2);
    }
}
