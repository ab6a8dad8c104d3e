// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `AllocationPlacement` (GLOSSARY: "Allocation"): the set of machine ids and
//! optional executor→host mapping under which a job runs, as received from
//! the EDC's `ExecuteJob` action.

use crate::id::MachineId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Placement information received from the EDC for one job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlacement {
    pub machines: Vec<MachineId>,
    /// Optional explicit executor index → host mapping (e.g. for MpiReplay
    /// ranks or ParallelTask executors that don't map 1:1 onto `machines`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_to_host: Option<Vec<MachineId>>,
    /// Optional IO allocation: machine ids dedicated to IO-only roles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub io_allocation: Option<Vec<MachineId>>,
    /// Optional storage label → machine id mapping, used to resolve
    /// `HomogeneousPfs.storage_label` / `DataStaging.{from,to}_storage`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub storage_mapping: HashMap<String, MachineId>,
}

impl AllocationPlacement {
    pub fn simple(machines: impl IntoIterator<Item = MachineId>) -> Self {
        Self { machines: machines.into_iter().collect(), ..Default::default() }
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    pub fn resolve_storage(&self, label: &str) -> Option<MachineId> {
        self.storage_mapping.get(label).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_allocation_has_no_extras() {
        let alloc = AllocationPlacement::simple([MachineId(0), MachineId(1)]);
        assert_eq!(alloc.len(), 2);
        assert!(alloc.executor_to_host.is_none());
    }

    #[test]
    fn storage_mapping_resolves_label() {
        let mut alloc = AllocationPlacement::simple([MachineId(0)]);
        alloc.storage_mapping.insert("pfs0".into(), MachineId(9));
        assert_eq!(alloc.resolve_storage("pfs0"), Some(MachineId(9)));
        assert_eq!(alloc.resolve_storage("missing"), None);
    }
}
