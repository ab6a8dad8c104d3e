// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PState engine: classifies a `PStateModification` request per
//! machine and drives the switch-off/switch-on virtual-pstate sequence.

use crate::context::Context;
use crate::mailbox::{Mailbox, Message, SwitchPhase};
use batsim_core::{InvariantViolation, MachineId, MachineState, PStateClass, SwitchId};

/// One flop's worth of virtual-pstate accounting time. The actual duration comes from the
/// platform capability surface in a full build; this is the engine's own
/// fixed stand-in so the switch sequence has a concrete, testable duration.
pub const VIRTUAL_PSTATE_FLOP_SECONDS: f64 = 1e-6;

fn classify(machine_class: PStateClass, target_class: PStateClass) -> Option<()> {
    match (machine_class, target_class) {
        (PStateClass::Compute, PStateClass::Compute) => Some(()),
        (PStateClass::Compute, PStateClass::Sleep) => Some(()),
        (PStateClass::Sleep, PStateClass::Compute) => Some(()),
        _ => None,
    }
}

/// Begin a `PStateModification(machines, target_ps)` request.
///
/// Every machine must currently host no running job.
pub fn begin_modification(
    ctx: &mut Context,
    mailbox: &mut Mailbox,
    machines: Vec<MachineId>,
    target_pstate: i32,
) -> Result<SwitchId, InvariantViolation> {
    for &id in &machines {
        let machine = ctx.machine(id).ok_or(InvariantViolation::UnknownMachineId(id.0))?;
        if !machine.jobs_being_computed.is_empty() {
            return Err(InvariantViolation::ComputeSharingViolation { machine: id.0 });
        }
    }

    let target_class = *ctx
        .machine(machines[0])
        .and_then(|m| m.pstates.get(&target_pstate))
        .ok_or(InvariantViolation::AllocationOfNonComputePstate { machine: machines[0].0, pstate: target_pstate })?;

    let switch_id = ctx.current_switches.begin(machines.clone(), target_pstate);

    for id in machines {
        let machine = ctx.machine(id).expect("validated above");
        let current_class = *machine.pstates.get(&machine.current_pstate).unwrap_or(&PStateClass::Compute);
        classify(current_class, target_class)
            .ok_or(InvariantViolation::PstateClassificationContradiction {
                pstate: target_pstate,
                first: format!("{current_class:?}"),
                second: format!("{target_class:?}"),
            })?;

        match (current_class, target_class) {
            (PStateClass::Compute, PStateClass::Compute) => {
                apply_immediate(ctx, id, target_pstate);
                mailbox.post(ctx.clock, Message::SwitchTick { machine: id, phase: SwitchPhase::Settled });
            }
            (PStateClass::Compute, PStateClass::Sleep) => {
                let sleep = *machine
                    .sleep_pstates
                    .get(&target_pstate)
                    .ok_or(InvariantViolation::SleepPstateArity { pstate: target_pstate })?;
                let m = ctx.machine_mut(id).expect("validated above");
                m.state = MachineState::TransitingFromComputingToSleeping;
                m.current_pstate = sleep.off_vps;
                mailbox.post(
                    ctx.clock.saturating_add(VIRTUAL_PSTATE_FLOP_SECONDS),
                    Message::SwitchTick { machine: id, phase: SwitchPhase::EnteredVirtualPstate },
                );
            }
            (PStateClass::Sleep, PStateClass::Compute) => {
                let on_vps = machine
                    .sleep_pstates
                    .get(&machine.current_pstate)
                    .map(|s| s.on_vps)
                    .ok_or(InvariantViolation::SleepPstateArity { pstate: machine.current_pstate })?;
                let m = ctx.machine_mut(id).expect("validated above");
                m.state = MachineState::TransitingFromSleepingToComputing;
                m.current_pstate = on_vps;
                mailbox.post(
                    ctx.clock.saturating_add(VIRTUAL_PSTATE_FLOP_SECONDS),
                    Message::SwitchTick { machine: id, phase: SwitchPhase::EnteredVirtualPstate },
                );
            }
            _ => unreachable!("classify() already rejected invalid combinations"),
        }
    }

    Ok(switch_id)
}

fn apply_immediate(ctx: &mut Context, id: MachineId, target_pstate: i32) {
    if let Some(machine) = ctx.machine_mut(id) {
        machine.current_pstate = target_pstate;
    }
}

/// Handle a `SwitchTick` posted by `begin_modification` or by itself.
/// Returns the machine ids whose switch just completed, if any (the caller
/// emits one `ResourceStateChanged` for that batch).
pub fn handle_switch_tick(
    ctx: &mut Context,
    mailbox: &mut Mailbox,
    machine: MachineId,
    phase: SwitchPhase,
) -> Option<Vec<MachineId>> {
    match phase {
        SwitchPhase::EnteredVirtualPstate => {
            mailbox.post(ctx.clock.saturating_add(VIRTUAL_PSTATE_FLOP_SECONDS), Message::SwitchTick { machine, phase: SwitchPhase::Settled });
            None
        }
        SwitchPhase::Settled => {
            let settled_state = {
                let m = ctx.machine(machine)?;
                match m.state {
                    MachineState::TransitingFromComputingToSleeping => MachineState::Sleeping,
                    MachineState::TransitingFromSleepingToComputing => MachineState::Idle,
                    _ => MachineState::Idle,
                }
            };
            let target_pstate = ctx.current_switches.target_pstate_for(machine);
            if let Some(m) = ctx.machine_mut(machine) {
                m.state = settled_state;
                if let Some(target) = target_pstate {
                    m.current_pstate = target;
                }
            }
            ctx.nb_machine_switches += 1;
            let completed = ctx.current_switches.mark_done(machine);
            if completed.is_some() {
                ctx.nb_grouped_switches += 1;
            }
            completed.map(|(_, all)| all)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batsim_core::{Machine, Role, SleepPstate};

    fn two_pstate_machine() -> Machine {
        let mut m = Machine::new(MachineId(0), "h0", Role::Compute, 0);
        m.pstates.insert(0, PStateClass::Compute);
        m.pstates.insert(1, PStateClass::TransitionVirtual);
        m.pstates.insert(2, PStateClass::TransitionVirtual);
        m.pstates.insert(3, PStateClass::Sleep);
        m.sleep_pstates.insert(3, SleepPstate { on_vps: 2, off_vps: 1 });
        m.current_pstate = 0;
        m
    }

    #[test]
    fn compute_to_sleep_then_settle() {
        let mut ctx = Context::new(vec![two_pstate_machine()]);
        let mut mailbox = Mailbox::new();
        let switch_id = begin_modification(&mut ctx, &mut mailbox, vec![MachineId(0)], 3).unwrap();
        assert_eq!(ctx.current_switches.pending_count(), 1);
        assert_eq!(ctx.machine(MachineId(0)).unwrap().state, MachineState::TransitingFromComputingToSleeping);

        let (_, msg) = mailbox.get().unwrap();
        let (machine, phase) = match msg {
            Message::SwitchTick { machine, phase } => (machine, phase),
            other => panic!("expected SwitchTick, got {other:?}"),
        };
        assert_eq!(handle_switch_tick(&mut ctx, &mut mailbox, machine, phase), None);

        let (_, msg) = mailbox.get().unwrap();
        let (machine, phase) = match msg {
            Message::SwitchTick { machine, phase } => (machine, phase),
            other => panic!("expected SwitchTick, got {other:?}"),
        };
        let completed = handle_switch_tick(&mut ctx, &mut mailbox, machine, phase);
        assert_eq!(completed, Some(vec![MachineId(0)]));
        assert_eq!(ctx.machine(MachineId(0)).unwrap().state, MachineState::Sleeping);
        let _ = switch_id;
    }

    #[test]
    fn cannot_switch_a_machine_running_a_job() {
        let mut m = two_pstate_machine();
        m.add_job(batsim_core::JobId::new("w", "j"));
        let mut ctx = Context::new(vec![m]);
        let mut mailbox = Mailbox::new();
        let err = begin_modification(&mut ctx, &mut mailbox, vec![MachineId(0)], 3).unwrap_err();
        assert!(matches!(err, InvariantViolation::ComputeSharingViolation { .. }));
    }
}
