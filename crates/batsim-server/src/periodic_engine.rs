// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic engine: a unified time-sliced schedule for
//! `CallMeLater` and `Probe` entities.
//!
//! Every modification (add/stop either kind) rebuilds a static schedule:
//! periods are normalized to milliseconds, checked for pairwise multiplicity,
//! then laid out over `lcm(periods) / gcd(periods)` slices of
//! `gcd(periods)` length. The schedule is immutable between rebuilds; the
//! server drives it one slice at a time via `Message::PeriodicSliceElapsed`.

use crate::context::Context;
use crate::mailbox::{Mailbox, Message};
use batsim_core::{InvariantViolation, PeriodicEntity, PeriodicId, PeriodicKind, Probe};
use std::collections::HashMap;

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: u64, b: u64) -> u64 {
    a / gcd(a, b) * b
}

/// A built schedule: `slices[k]` lists the entities due at slice index `k`.
#[derive(Debug, Clone, Default)]
pub struct PeriodicSchedule {
    pub slice_duration_ms: u64,
    pub slices: Vec<Vec<PeriodicId>>,
}

impl PeriodicSchedule {
    pub fn slice_duration_seconds(&self) -> f64 {
        self.slice_duration_ms as f64 / 1000.0
    }
}

/// Build a schedule from the current periodic-entity map.
///
/// Checks multiplicity first, across *all* pairs, not just
/// adjacent ones once sorted — e.g. periods {2, 4, 6} have an adjacent pair
/// (4, 6) that fails even though every period is individually consistent
/// with 2.
pub fn build_schedule(
    entities: &HashMap<PeriodicId, PeriodicEntity>,
) -> Result<Option<PeriodicSchedule>, InvariantViolation> {
    if entities.is_empty() {
        return Ok(None);
    }

    let mut periods: Vec<u64> = entities.values().map(|e| e.period_ms).collect();
    periods.sort_unstable();
    periods.dedup();

    for i in 0..periods.len() {
        for j in (i + 1)..periods.len() {
            let (p_i, p_j) = (periods[i], periods[j]);
            if p_j % p_i != 0 {
                let first = entities.values().find(|e| e.period_ms == p_i).expect("p_i came from this map");
                let second = entities.values().find(|e| e.period_ms == p_j).expect("p_j came from this map");
                return Err(InvariantViolation::NonMultiplePeriods {
                    first: first.id.to_string(),
                    second: second.id.to_string(),
                    p1: p_i,
                    p2: p_j,
                });
            }
        }
    }

    let slice_duration = periods[0];
    let lcm_all = periods.iter().skip(1).fold(periods[0], |acc, &p| lcm(acc, p));
    let nb_slices = (lcm_all / slice_duration) as usize;

    let mut slices = vec![Vec::new(); nb_slices];
    for k in 0..nb_slices {
        let elapsed_ms = k as u64 * slice_duration;
        for entity in entities.values() {
            if elapsed_ms % entity.period_ms == 0 {
                slices[k].push(entity.id);
            }
        }
    }

    Ok(Some(PeriodicSchedule { slice_duration_ms: slice_duration, slices }))
}

/// One entity that fired at the current slice, with enough of its own data
/// to sample a probe or emit `PeriodicEntityStopped` after it's been removed
/// from `ctx.periodic`.
#[derive(Debug, Clone)]
pub struct FiredEntry {
    pub id: PeriodicId,
    pub kind: PeriodicKind,
    pub probe: Option<Probe>,
    /// Whether this entity's `remaining` count just hit zero.
    pub retired: bool,
}

/// Rebuild the schedule from `ctx.periodic` and, if non-empty, arm the next
/// `PeriodicSliceElapsed`. Called after every CallMeLater/Probe
/// registration or cancellation.
pub fn rebuild(ctx: &mut Context, mailbox: &mut Mailbox) -> Result<(), InvariantViolation> {
    let schedule = build_schedule(&ctx.periodic)?;
    ctx.periodic_generation += 1;
    ctx.periodic_slice_index = 0;
    let generation = ctx.periodic_generation;
    if let Some(schedule) = &schedule {
        let at = ctx.clock.saturating_add(schedule.slice_duration_seconds());
        mailbox.post(at, Message::PeriodicSliceElapsed { generation });
    }
    ctx.periodic_schedule = schedule;
    Ok(())
}

/// Handle a `PeriodicSliceElapsed` tick. Returns the entities due this
/// slice (already decremented/retired in `ctx.periodic`) for the caller to
/// turn into protocol events. A stale tick from before the most recent
/// rebuild (its `generation` doesn't match) is a no-op.
pub fn handle_slice_elapsed(ctx: &mut Context, mailbox: &mut Mailbox, generation: u64) -> Vec<FiredEntry> {
    if generation != ctx.periodic_generation {
        return Vec::new();
    }
    let Some(schedule) = ctx.periodic_schedule.clone() else {
        return Vec::new();
    };
    if schedule.slices.is_empty() {
        return Vec::new();
    }

    let slice_idx = ctx.periodic_slice_index % schedule.slices.len();
    let due = schedule.slices[slice_idx].clone();

    let mut fired = Vec::with_capacity(due.len());
    let mut any_retired = false;
    for id in due {
        let Some(entity) = ctx.periodic.get_mut(&id) else { continue };
        entity.remaining = entity.remaining.decrement();
        let retired = entity.remaining.is_exhausted();
        fired.push(FiredEntry { id, kind: entity.kind, probe: entity.probe.clone(), retired });
        if retired {
            any_retired = true;
        }
    }
    for entry in &fired {
        if entry.retired {
            ctx.periodic.remove(&entry.id);
        }
    }

    ctx.periodic_slice_index += 1;
    if any_retired {
        // The map changed shape; rebuild rather than keep ticking a stale
        // schedule. `rebuild` only fails on multiplicity, which removing
        // entities can never trigger, so this can't actually error.
        let _ = rebuild(ctx, mailbox);
    } else {
        let at = ctx.clock.saturating_add(schedule.slice_duration_seconds());
        mailbox.post(at, Message::PeriodicSliceElapsed { generation: ctx.periodic_generation });
    }

    fired
}

#[cfg(test)]
mod tests {
    use super::*;
    use batsim_core::Repeat;

    fn entity(id: u64, period_ms: u64) -> PeriodicEntity {
        PeriodicEntity::call_me_later(PeriodicId(id), period_ms, Repeat::Infinite)
    }

    #[test]
    fn schedule_rejects_non_multiple_periods() {
        let mut map = HashMap::new();
        map.insert(PeriodicId(0), entity(0, 3));
        map.insert(PeriodicId(1), entity(1, 5));
        let err = build_schedule(&map).unwrap_err();
        assert!(matches!(err, InvariantViolation::NonMultiplePeriods { .. }));
    }

    #[test]
    fn schedule_rejects_non_adjacent_non_multiple() {
        let mut map = HashMap::new();
        map.insert(PeriodicId(0), entity(0, 2));
        map.insert(PeriodicId(1), entity(1, 4));
        map.insert(PeriodicId(2), entity(2, 6));
        let err = build_schedule(&map).unwrap_err();
        assert!(matches!(err, InvariantViolation::NonMultiplePeriods { .. }));
    }

    #[test]
    fn schedule_covers_one_full_lcm_cycle() {
        let mut map = HashMap::new();
        map.insert(PeriodicId(0), entity(0, 2));
        map.insert(PeriodicId(1), entity(1, 4));
        let schedule = build_schedule(&map).unwrap().unwrap();
        assert_eq!(schedule.slice_duration_ms, 2);
        assert_eq!(schedule.slices.len(), 2);
        assert_eq!(schedule.slices[0].len(), 2);
        assert_eq!(schedule.slices[1], vec![PeriodicId(0)]);
    }

    #[test]
    fn empty_map_has_no_schedule() {
        assert!(build_schedule(&HashMap::new()).unwrap().is_none());
    }
}
