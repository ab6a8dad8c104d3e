// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `PeriodicCall` / `Probe`: the unified periodic-entity data
//! model driven by `batsim-server::periodic_engine`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodicId(pub u64);

impl std::fmt::Display for PeriodicId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "periodic-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodicKind {
    CallMeLater,
    Probe,
}

/// Requested aggregation for a probe sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeAggregation {
    /// No aggregation: emit the per-host vector.
    None,
    Sum,
    Mean,
}

/// What a probe samples from the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "metric", rename_all = "snake_case")]
pub enum ProbeMetric {
    /// Per-host energy reading (requires `--energy-host`).
    Power { machines: Vec<u32> },
}

/// Probe-specific metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    pub metric: ProbeMetric,
    pub aggregation: ProbeAggregation,
}

/// Remaining-periods budget: finite count or unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Repeat {
    Finite(u64),
    Infinite,
}

impl Repeat {
    pub fn is_exhausted(self) -> bool {
        matches!(self, Repeat::Finite(0))
    }

    /// Decrement, returning the new value. No-op for `Infinite`.
    pub fn decrement(self) -> Self {
        match self {
            Repeat::Finite(n) => Repeat::Finite(n.saturating_sub(1)),
            Repeat::Infinite => Repeat::Infinite,
        }
    }
}

/// `{id, period, offset, nb_remaining_periods, kind, probe}`.
///
/// Offsets MUST be zero in this core; implementations MAY relax
/// that later, so the field is kept rather than dropped.
#[derive(Debug, Clone)]
pub struct PeriodicEntity {
    pub id: PeriodicId,
    /// Period, normalized to milliseconds.
    pub period_ms: u64,
    pub offset_ms: u64,
    pub remaining: Repeat,
    pub kind: PeriodicKind,
    pub probe: Option<Probe>,
}

impl PeriodicEntity {
    pub fn call_me_later(id: PeriodicId, period_ms: u64, remaining: Repeat) -> Self {
        Self { id, period_ms, offset_ms: 0, remaining, kind: PeriodicKind::CallMeLater, probe: None }
    }

    pub fn probe(id: PeriodicId, period_ms: u64, remaining: Repeat, probe: Probe) -> Self {
        Self { id, period_ms, offset_ms: 0, remaining, kind: PeriodicKind::Probe, probe: Some(probe) }
    }

    pub fn is_last_periodic(&self) -> bool {
        matches!(self.remaining, Repeat::Finite(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_decrements_towards_zero() {
        let r = Repeat::Finite(2);
        let r = r.decrement();
        assert_eq!(r, Repeat::Finite(1));
        let r = r.decrement();
        assert!(r.is_exhausted());
    }

    #[test]
    fn infinite_repeat_never_exhausts() {
        assert!(!Repeat::Infinite.decrement().is_exhausted());
    }
}
