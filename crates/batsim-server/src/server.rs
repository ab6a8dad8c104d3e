// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Server`: owns the simulation clock and drives the main loop (spec
//! §4.1) — mailbox dispatch, EDC request/reply round trips, and the
//! termination predicate.

use crate::context::Context;
use crate::events::{self, EventBatch};
use crate::mailbox::{Mailbox, Message, SubmitterKind};
use crate::periodic_engine;
use crate::platform::SimplePlatform;
use crate::pstate_engine;
use crate::workload_loader;
use batsim_core::{
    AllocationPlacement, BatsimError, ConfigurationError, HomogeneousStrategy, Instrumentation, InvariantViolation, Job, JobId,
    JobState, MachineId, MachineRange, MachineState, MachineStateCounts, NullInstrumentation, PeriodicEntity, PeriodicId,
    Profile, ProtocolError, Walltime, Workload, WorkloadName,
};
use batsim_engine::{EngineError, JobExecutor, Outcome, ProfileResolver, Step};
use batsim_protocol::codec::Codec;
use batsim_protocol::event::{InboundEvent, OutboundEvent};
use batsim_protocol::message::{InboundMessage, OutboundMessage};
use batsim_protocol::transport::EdcTransport;
use batsim_protocol::EdcHelloOptions;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<ServerError> for BatsimError {
    fn from(e: ServerError) -> Self {
        match e {
            ServerError::Configuration(e) => BatsimError::Configuration(e),
            ServerError::Protocol(e) => BatsimError::Protocol(e),
            ServerError::Invariant(e) => BatsimError::Invariant(e),
            ServerError::Engine(e) => BatsimError::Protocol(ProtocolError::Transport(e.to_string())),
        }
    }
}

struct WorkloadResolver<'a> {
    workload: &'a Workload,
}

impl ProfileResolver for WorkloadResolver<'_> {
    fn resolve(&self, name: &str) -> Option<Arc<batsim_core::Profile>> {
        self.workload.profile(name)
    }
}

/// Owns the clock, the mutable simulation [`Context`], and one EDC
/// connection. `T` is whichever [`EdcTransport`] was selected at startup
///.
pub struct Server<T: EdcTransport> {
    pub ctx: Context,
    mailbox: Mailbox,
    events: EventBatch,
    codec: Codec,
    transport: T,
    platform: SimplePlatform,
    edc_options: Option<EdcHelloOptions>,
    force_stop: bool,
    instrumentation: Box<dyn Instrumentation>,
}

impl<T: EdcTransport> Server<T> {
    pub fn new(ctx: Context, codec: Codec, transport: T, platform: SimplePlatform) -> Self {
        Self {
            ctx,
            mailbox: Mailbox::new(),
            events: EventBatch::new(),
            codec,
            transport,
            platform,
            edc_options: None,
            force_stop: false,
            instrumentation: Box::new(NullInstrumentation),
        }
    }

    /// Wire a tracer (or any other lifecycle observer) into the run. The
    /// orchestrator calls lifecycle hooks directly rather than deriving
    /// trace rows from the wire protocol.
    pub fn set_instrumentation(&mut self, instrumentation: Box<dyn Instrumentation>) {
        self.instrumentation = instrumentation;
    }

    /// Sum of `epower()` over a set of machine ids, used to populate the
    /// `epower` column of `consumed_energy.csv`.
    fn range_epower(&self, range: &MachineRange) -> f64 {
        range.iter().filter_map(|id| self.ctx.machine(MachineId(id))).map(|m| m.epower()).sum()
    }

    fn machine_state_counts(&self) -> MachineStateCounts {
        let mut counts = MachineStateCounts::default();
        for machine in &self.ctx.machines {
            match machine.state {
                MachineState::Sleeping => counts.nb_sleeping += 1,
                MachineState::TransitingFromSleepingToComputing => counts.nb_s2c += 1,
                MachineState::TransitingFromComputingToSleeping => counts.nb_c2s += 1,
                MachineState::Idle => counts.nb_idle += 1,
                MachineState::Computing => counts.nb_computing += 1,
                MachineState::Unavailable { .. } => {}
            }
        }
        counts
    }

    /// Register a job submitter so the termination predicate waits for it
    ///.
    pub fn open_submitter(&mut self, kind: SubmitterKind) {
        match kind {
            SubmitterKind::Job => self.ctx.counters.job_submitters_open += 1,
            SubmitterKind::Event => self.ctx.counters.event_submitters_open += 1,
        }
    }

    /// A submitter is done: decrement its
    /// counter, and once the last submitter of that kind is gone, notify the
    /// EDC that no more jobs/events of that kind will ever arrive.
    pub fn dispatch_bye(&mut self, kind: SubmitterKind) {
        match kind {
            SubmitterKind::Job => {
                self.ctx.counters.job_submitters_open = self.ctx.counters.job_submitters_open.saturating_sub(1);
                if self.ctx.counters.job_submitters_open == 0 {
                    self.events.push(OutboundEvent::Notify {
                        tag: "no_more_static_job_to_submit".to_string(),
                        payload: serde_json::Value::Null,
                    });
                }
            }
            SubmitterKind::Event => {
                self.ctx.counters.event_submitters_open = self.ctx.counters.event_submitters_open.saturating_sub(1);
                if self.ctx.counters.event_submitters_open == 0 {
                    self.events.push(OutboundEvent::Notify {
                        tag: "no_more_external_event_to_occur".to_string(),
                        payload: serde_json::Value::Null,
                    });
                }
            }
        }
    }

    /// Flush and finalize every wired tracer.
    pub fn finalize_tracers(
        &mut self,
        time_spent_in_each_state: &BTreeMap<&'static str, f64>,
        nb_machine_switches: u64,
        nb_grouped_switches: u64,
        scheduling_time: f64,
        simulation_time: f64,
    ) {
        self.instrumentation.finalize(
            time_spent_in_each_state,
            nb_machine_switches,
            nb_grouped_switches,
            scheduling_time,
            simulation_time,
        );
    }

    /// Submit every job in a static workload at its `subtime`, then close
    /// that submitter.
    pub fn submit_static_workload(&mut self, name: WorkloadName, workload: Workload) {
        let job_ids: Vec<(f64, JobId)> =
            workload.jobs().map(|j| (j.submission_time, workload.job_id(&j.id.job_name))).collect();
        self.ctx.workloads.insert(name, workload);
        for (at, job_id) in job_ids {
            self.mailbox.post(batsim_core::SimTime::seconds(at), Message::JobSubmitted { job_id });
        }
    }

    /// Expand a workflow DAG into jobs: tasks with no
    /// unresolved dependency are submitted immediately; the rest wait until
    /// `finish_job` releases them.
    pub fn submit_workflow(&mut self, name: WorkloadName, workload: Workload) {
        let mut ready = Vec::new();
        for job in workload.jobs() {
            let deps = workload_loader::pending_dependencies(job);
            if deps.is_empty() {
                ready.push(job.id.clone());
            } else {
                self.ctx.workflow_pending.insert(job.id.clone(), deps);
            }
        }
        self.ctx.workloads.insert(name, workload);
        for job_id in ready {
            self.mailbox.post_now(self.ctx.clock, Message::JobSubmitted { job_id });
        }
    }

    /// Submit any workflow tasks whose last outstanding dependency was
    /// `completed`.
    fn release_workflow_dependents(&mut self, completed: &JobId) {
        let mut newly_ready = Vec::new();
        self.ctx.workflow_pending.retain(|job_id, deps| {
            if job_id.workload != completed.workload {
                return true;
            }
            deps.retain(|name| name != &completed.job_name);
            if deps.is_empty() {
                newly_ready.push(job_id.clone());
                false
            } else {
                true
            }
        });
        for job_id in newly_ready {
            self.mailbox.post_now(self.ctx.clock, Message::JobSubmitted { job_id });
        }
    }

    /// Queue generic external events loaded from an `--events` file.
    /// Delivered to the EDC as `Notify` events at their recorded timestamp,
    /// in the `(timestamp, type)` order the loader already sorted them into.
    pub fn submit_external_events(&mut self, events: Vec<workload_loader::ExternalEvent>) {
        for event in events {
            self.mailbox.post(
                batsim_core::SimTime::seconds(event.timestamp),
                Message::EventOccurred { kind: event.kind, payload: event.data },
            );
        }
    }

    /// Run the simulation to completion.
    pub fn run(&mut self) -> Result<(), ServerError> {
        self.events.push(OutboundEvent::BatsimHello { batsim_version: env!("CARGO_PKG_VERSION").to_string() });
        self.events.push(OutboundEvent::SimulationBegins {
            config: serde_json::json!({}),
            platform_description: serde_json::json!({ "nb_hosts": self.ctx.machines.len() }),
        });
        self.round_trip()?;

        // Termination is only checked once the mailbox has
        // nothing left scheduled: counters can trivially read "finished"
        // before the first job is even submitted, so an empty mailbox is
        // the real signal that no further progress is possible.
        loop {
            if self.force_stop {
                break;
            }
            let Some(at) = self.mailbox.peek_time() else {
                if self.ctx.is_simulation_finished() {
                    break;
                }
                return Err(ProtocolError::Transport("mailbox exhausted but simulation is not finished".to_string()).into());
            };
            let elapsed = (at.as_f64() - self.ctx.clock.as_f64()).max(0.0);
            for machine in &mut self.ctx.machines {
                machine.tick(elapsed);
            }
            self.ctx.clock = at;
            while self.mailbox.peek_time() == Some(at) {
                let (_, message) = self.mailbox.get().expect("peeked Some above");
                self.dispatch(message)?;
            }
            if !self.events.is_empty() {
                self.round_trip()?;
            }
            self.ctx.flush_deleted_jobs();
        }

        self.events.push(OutboundEvent::SimulationEnds);
        self.round_trip()
    }

    fn round_trip(&mut self) -> Result<(), ServerError> {
        let outbound = OutboundMessage::new(self.ctx.clock.as_f64(), self.events.drain());
        let request = self.codec.encode_request(&outbound)?;
        let reply = self.transport.request(&request)?;
        let inbound: InboundMessage = self.codec.decode_reply(&reply)?;
        for event in inbound.events {
            self.handle_inbound(event)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, message: Message) -> Result<(), ServerError> {
        match message {
            Message::SubmitterHello { kind } => self.open_submitter(kind),
            Message::SubmitterBye { kind } => self.dispatch_bye(kind),
            Message::JobSubmitted { job_id } => self.submit_job(job_id)?,
            Message::JobCompleted { .. } => {}
            Message::ExecuteJob { job_id, placement } => self.execute_job(job_id, placement)?,
            Message::RejectJob { job_id } => self.reject_job(job_id)?,
            Message::KillJobs { job_ids, ack_requested } => self.kill_jobs(job_ids, ack_requested)?,
            Message::ChangeJobState { job_id, new_state } => {
                if let Some(job) = self.ctx.job_mut(&job_id) {
                    job.transition(new_state)?;
                }
            }
            Message::RegisterJob { job_id, profile_name, job, ack } => self.register_job(job_id, profile_name, job, ack)?,
            Message::RegisterProfile { workload, name, profile, ack } => self.register_profile(workload, name, profile, ack)?,
            Message::CallMeLater { id, period_ms, remaining } => {
                self.ctx.periodic.insert(id, PeriodicEntity::call_me_later(id, period_ms, remaining));
                periodic_engine::rebuild(&mut self.ctx, &mut self.mailbox)?;
            }
            Message::StopCallMeLater { id } | Message::StopProbe { id } => {
                self.ctx.periodic.remove(&id);
                periodic_engine::rebuild(&mut self.ctx, &mut self.mailbox)?;
            }
            Message::CreateProbe { id, period_ms, remaining, probe } => {
                self.ctx.periodic.insert(id, PeriodicEntity::probe(id, period_ms, remaining, probe));
                periodic_engine::rebuild(&mut self.ctx, &mut self.mailbox)?;
            }
            Message::PStateModification { machines, target_pstate } => {
                // Placeholder trace rows for the in-flight transition (spec
                // §4.3: "log the transition with placeholder -1/-2 to denote
                // in-flight states"), logged before the switch actually
                // begins so a reader of pstate_changes.csv/consumed_energy.csv
                // sees the request land even though the real pstate only
                // takes effect once the switch settles.
                if let Some(&first) = machines.first() {
                    let target_class = self.ctx.machine(first).and_then(|m| m.pstates.get(&target_pstate)).copied();
                    let placeholder = match target_class {
                        Some(batsim_core::PStateClass::Sleep) => -1,
                        _ => -2,
                    };
                    let now = self.ctx.clock.as_f64();
                    let range: MachineRange = machines.iter().map(|m| m.0).collect();
                    let epower = self.range_epower(&range);
                    self.instrumentation.on_pstate_changed(now, &range, placeholder, epower);
                }
                pstate_engine::begin_modification(&mut self.ctx, &mut self.mailbox, machines, target_pstate)?;
            }
            Message::PeriodicSliceElapsed { generation } => {
                let fired = periodic_engine::handle_slice_elapsed(&mut self.ctx, &mut self.mailbox, generation);
                if let Some(event) = events::periodic_trigger(&self.ctx, &fired) {
                    self.events.push(event);
                }
                for entry in &fired {
                    if entry.retired {
                        self.events.push(OutboundEvent::PeriodicEntityStopped { id: entry.id.0 });
                    }
                }
            }
            Message::SwitchTick { machine, phase } => {
                if let Some(completed) = pstate_engine::handle_switch_tick(&mut self.ctx, &mut self.mailbox, machine, phase) {
                    let new_pstate = self.ctx.machine(machine).map(|m| m.current_pstate).unwrap_or(0);
                    self.events.push(events::resource_state_changed(&completed, new_pstate));
                    let range: MachineRange = completed.iter().map(|m| m.0).collect();
                    let now = self.ctx.clock.as_f64();
                    let counts = self.machine_state_counts();
                    let epower = self.range_epower(&range);
                    self.instrumentation.on_pstate_changed(now, &range, new_pstate, epower);
                    self.instrumentation.on_machine_states(now, counts);
                }
            }
            Message::JobTimerFired { job_id } => self.timer_fired(job_id)?,
            Message::EventOccurred { kind, payload } => {
                self.events.push(OutboundEvent::Notify { tag: kind, payload });
            }
            Message::FinishRegistration => self.ctx.counters.dynamic_registration_pending = false,
            Message::ForceSimulationStop => self.force_stop = true,
            Message::ToJobMessage { job_id, payload } => {
                let running = self.ctx.job(&job_id).map(|j| j.state.is_running()).unwrap_or(false);
                if let Some(job) = self.ctx.job_mut(&job_id) {
                    job.push_incoming_message(payload);
                }
                if running {
                    self.timer_fired(job_id)?;
                }
            }
            Message::SchedReady => {}
        }
        Ok(())
    }

    fn handle_inbound(&mut self, event: InboundEvent) -> Result<(), ServerError> {
        match event {
            InboundEvent::EdcHello { options } => self.edc_options = Some(options),
            InboundEvent::RejectJob { job_id } => self.mailbox.post_now(self.ctx.clock, Message::RejectJob { job_id: job_id.0 }),
            InboundEvent::ExecuteJob { job_id, placement } => self.execute_job(job_id.0, placement)?,
            InboundEvent::KillJobs { job_ids, ack_requested } => {
                self.kill_jobs(job_ids.into_iter().map(|j| j.0).collect(), ack_requested)?
            }
            InboundEvent::RegisterJob { job_id, job, profile_name, ack } => self.register_job(job_id.0, profile_name, job, ack)?,
            InboundEvent::RegisterProfile { workload_name, profile_name, profile, ack } => {
                let profile: batsim_core::Profile = serde_json::from_value(profile).map_err(|e| {
                    ServerError::Configuration(ConfigurationError::MalformedProfile {
                        workload: workload_name.clone(),
                        name: profile_name.clone(),
                        reason: e.to_string(),
                    })
                })?;
                self.register_profile(WorkloadName::new(workload_name), profile_name, profile, ack)?;
            }
            InboundEvent::SetJobMetadata { job_id, metadata } => {
                if let Some(job) = self.ctx.job_mut(&job_id.0) {
                    job.metadata = Some(metadata);
                }
            }
            InboundEvent::ChangeJobState { job_id, new_state } => {
                let new_state = parse_job_state(&new_state).ok_or_else(|| InvariantViolation::IllegalStateTransition {
                    job: job_id.0.clone(),
                    from: "?".to_string(),
                    to: new_state,
                })?;
                if let Some(job) = self.ctx.job_mut(&job_id.0) {
                    job.transition(new_state)?;
                }
            }
            InboundEvent::CallMeLater { id, period_ms, nb_periods } => {
                let remaining = nb_periods.map(batsim_core::Repeat::Finite).unwrap_or(batsim_core::Repeat::Infinite);
                self.ctx.periodic.insert(PeriodicId(id), PeriodicEntity::call_me_later(PeriodicId(id), period_ms, remaining));
                periodic_engine::rebuild(&mut self.ctx, &mut self.mailbox)?;
            }
            InboundEvent::StopCallMeLater { id } => {
                self.ctx.periodic.remove(&PeriodicId(id));
                periodic_engine::rebuild(&mut self.ctx, &mut self.mailbox)?;
            }
            InboundEvent::CreateProbe { id, period_ms, nb_periods, probe } => {
                let remaining = nb_periods.map(batsim_core::Repeat::Finite).unwrap_or(batsim_core::Repeat::Infinite);
                self.ctx.periodic.insert(PeriodicId(id), PeriodicEntity::probe(PeriodicId(id), period_ms, remaining, probe));
                periodic_engine::rebuild(&mut self.ctx, &mut self.mailbox)?;
            }
            InboundEvent::StopProbe { id } => {
                self.ctx.periodic.remove(&PeriodicId(id));
                periodic_engine::rebuild(&mut self.ctx, &mut self.mailbox)?;
            }
            InboundEvent::ChangeHostPstate { machines, target_pstate } => {
                let ids: Vec<MachineId> = machines.0.iter().map(MachineId).collect();
                pstate_engine::begin_modification(&mut self.ctx, &mut self.mailbox, ids, target_pstate)?;
            }
            InboundEvent::FinishRegistration => self.ctx.counters.dynamic_registration_pending = false,
            InboundEvent::ForceSimulationStop => self.force_stop = true,
            InboundEvent::ToJobMessage { job_id, payload } => {
                let payload = payload.as_str().map(str::to_string).unwrap_or_else(|| payload.to_string());
                self.mailbox.post_now(self.ctx.clock, Message::ToJobMessage { job_id: job_id.0, payload });
            }
        }
        Ok(())
    }

    fn submit_job(&mut self, job_id: JobId) -> Result<(), ServerError> {
        if let Some(job) = self.ctx.job_mut(&job_id) {
            job.transition(JobState::Submitted)?;
        }
        self.ctx.counters.nb_submitted += 1;

        // When there's no external key-value store for the EDC to query,
        // the job/profile payload rides along in the event itself.
        let (job, profile) = if self.ctx.redis_enabled {
            (None, None)
        } else {
            let job = self.ctx.job(&job_id);
            let inline_job = job.map(|job| {
                serde_json::json!({
                    "id": job_id.job_name,
                    "subtime": job.submission_time,
                    "walltime": job.walltime.0,
                    "res": job.requested_nb_res,
                    "profile": job.profile_ref.name,
                })
            });
            let inline_profile = job
                .and_then(|job| self.ctx.workloads.get(&job_id.workload).and_then(|w| w.profile(&job.profile_ref.name)))
                .and_then(|profile| serde_json::to_value(profile.as_ref()).ok());
            (inline_job, inline_profile)
        };
        self.events.push(OutboundEvent::JobSubmitted { job_id: job_id.canonical(), job, profile });
        Ok(())
    }

    fn reject_job(&mut self, job_id: JobId) -> Result<(), ServerError> {
        if let Some(job) = self.ctx.job_mut(&job_id) {
            job.transition(JobState::Rejected)?;
        }
        self.ctx.counters.nb_rejected += 1;
        if let Some(job) = self.ctx.job(&job_id) {
            self.instrumentation.on_job_finished(self.ctx.clock.as_f64(), job, 0.0);
        }
        self.ctx.stage_job_deletion(job_id);
        Ok(())
    }

    fn register_job(&mut self, job_id: JobId, profile_name: Option<String>, payload: serde_json::Value, ack: bool) -> Result<(), ServerError> {
        if let Some(configured) = self.edc_options.map(|o| o.ack_dynamic_registration) {
            if ack != configured {
                return Err(ProtocolError::AckMismatch { requested: ack, configured }.into());
            }
        }
        let walltime = payload.get("walltime").and_then(|v| v.as_f64()).map(Walltime).unwrap_or(Walltime::UNBOUNDED);
        let res = payload.get("res").and_then(|v| v.as_u64()).unwrap_or(1) as u32;
        let profile_name = profile_name.unwrap_or_else(|| job_id.job_name.clone());
        let profile_ref = batsim_core::ProfileId::new(job_id.workload.clone(), profile_name);
        let job = Job::new(job_id.clone(), profile_ref, self.ctx.clock.as_f64(), walltime, res);

        let workload = self
            .ctx
            .workloads
            .entry(job_id.workload.clone())
            .or_insert_with(|| Workload::new(job_id.workload.clone(), batsim_core::WorkloadKind::Dynamic));
        workload.register_job(job)?;

        self.mailbox.post_now(self.ctx.clock, Message::JobSubmitted { job_id });
        Ok(())
    }

    fn register_profile(
        &mut self,
        workload_name: WorkloadName,
        name: String,
        profile: batsim_core::Profile,
        _ack: bool,
    ) -> Result<(), ServerError> {
        profile
            .validate()
            .map_err(|reason| ConfigurationError::MalformedProfile { workload: workload_name.0.clone(), name: name.clone(), reason })?;
        let workload = self
            .ctx
            .workloads
            .entry(workload_name.clone())
            .or_insert_with(|| Workload::new(workload_name.clone(), batsim_core::WorkloadKind::Dynamic));
        workload.register_profile(&name, profile)?;
        Ok(())
    }

    fn execute_job(&mut self, job_id: JobId, placement: AllocationPlacement) -> Result<(), ServerError> {
        if let Some(master) = self.ctx.master_machine() {
            if placement.machines.contains(&master.id) {
                return Err(InvariantViolation::MasterMachineAllocated { job: job_id }.into());
            }
        }
        for &machine_id in &placement.machines {
            let machine = self.ctx.machine(machine_id).ok_or(InvariantViolation::UnknownMachineId(machine_id.0))?;
            if !machine.state.is_compute_capable() {
                return Err(InvariantViolation::AllocationOfNonComputePstate { machine: machine_id.0, pstate: machine.current_pstate }.into());
            }
            if !self.ctx.sharing.compute_sharing && !machine.jobs_being_computed.is_empty() {
                return Err(InvariantViolation::ComputeSharingViolation { machine: machine_id.0 }.into());
            }
        }
        for &storage_id in placement.storage_mapping.values() {
            let machine = self.ctx.machine(storage_id).ok_or(InvariantViolation::UnknownMachineId(storage_id.0))?;
            if !self.ctx.sharing.storage_sharing && !machine.jobs_being_computed.is_empty() {
                return Err(InvariantViolation::StorageSharingViolation { machine: storage_id.0 }.into());
            }
        }

        let job = self.ctx.job(&job_id).ok_or_else(|| InvariantViolation::UnknownJobId(job_id.clone()))?.clone();

        let workload = self.ctx.workloads.get(&job_id.workload).ok_or_else(|| InvariantViolation::UnknownJobId(job_id.clone()))?;
        let resolver = WorkloadResolver { workload };

        // spec: the allocation-size rule binds every profile family except
        // `HomogeneousParallel` with total-amount semantics, and is satisfied
        // by an explicit executor->host mapping of the right length even
        // when `placement.machines` itself doesn't match `requested_nb_res`.
        let is_total_spread_homogeneous = resolver
            .resolve(&job.profile_ref.name)
            .map(|profile| matches!(profile.as_ref(), Profile::HomogeneousParallel { strategy: HomogeneousStrategy::TotalSpreadEvenly, .. }))
            .unwrap_or(false);
        let explicit_mapping_len = placement.executor_to_host.as_ref().map(Vec::len);
        let allocation_satisfies_size = is_total_spread_homogeneous
            || explicit_mapping_len == Some(job.requested_nb_res as usize)
            || job.requested_nb_res as usize == placement.machines.len();
        if !allocation_satisfies_size {
            return Err(InvariantViolation::AllocationSizeMismatch {
                job: job_id.clone(),
                expected: job.requested_nb_res,
                got: explicit_mapping_len.unwrap_or(placement.machines.len()) as u32,
            }
            .into());
        }

        let executor = JobExecutor::new(
            &job.profile_ref.name,
            placement.machines.clone(),
            placement.storage_mapping.clone(),
            placement.executor_to_host.clone(),
            job.walltime.seconds(),
            &resolver,
            &self.platform,
        )?;
        let suspend = executor.initial_suspend();

        for &machine_id in &placement.machines {
            if let Some(machine) = self.ctx.machine_mut(machine_id) {
                machine.add_job(job_id.clone());
            }
        }
        for &storage_id in placement.storage_mapping.values() {
            if let Some(machine) = self.ctx.machine_mut(storage_id) {
                machine.add_job(job_id.clone());
            }
        }
        if let Some(job) = self.ctx.job_mut(&job_id) {
            job.transition(JobState::Running)?;
            job.starting_time = Some(self.ctx.clock.as_f64());
            job.allocation = placement.machines.iter().copied().collect();
            job.execution_request = Some(placement.clone());
        }
        self.ctx.counters.nb_running += 1;
        if let Some(job) = self.ctx.job(&job_id) {
            let range: MachineRange = placement.machines.iter().map(|m| m.0).collect();
            let epower = self.range_epower(&range);
            self.instrumentation.on_job_started(self.ctx.clock.as_f64(), job, &range, epower);
        }

        match suspend {
            Step::Suspend(s) => {
                self.ctx.executors.insert(job_id.clone(), executor);
                self.arm_suspend(job_id, s)
            }
            Step::Done(outcome) => self.finish_job(job_id, outcome),
        }
    }

    fn arm_suspend(&mut self, job_id: JobId, suspend: batsim_engine::Suspend) -> Result<(), ServerError> {
        use batsim_engine::Suspend as S;
        match suspend {
            S::Sleep(seconds) | S::AwaitMessage { timeout: seconds } => {
                let at = self.ctx.clock.saturating_add(seconds);
                self.mailbox.post(at, Message::JobTimerFired { job_id });
                Ok(())
            }
            S::EmitMessage(payload) => {
                self.events.push(OutboundEvent::FromJobMessage { job_id: job_id.canonical(), payload });
                self.timer_fired(job_id)
            }
        }
    }

    fn timer_fired(&mut self, job_id: JobId) -> Result<(), ServerError> {
        let Some(mut executor) = self.ctx.executors.remove(&job_id) else { return Ok(()) };
        let incoming = self.ctx.job_mut(&job_id).and_then(Job::pop_incoming_message);
        let workload = self.ctx.workloads.get(&job_id.workload).ok_or_else(|| InvariantViolation::UnknownJobId(job_id.clone()))?;
        let resolver = WorkloadResolver { workload };
        let step = executor.resume(0.0, incoming.as_deref(), &resolver, &self.platform)?;
        match step {
            Step::Suspend(s) => {
                self.ctx.executors.insert(job_id.clone(), executor);
                self.arm_suspend(job_id, s)
            }
            Step::Done(outcome) => self.finish_job(job_id, outcome),
        }
    }

    fn finish_job(&mut self, job_id: JobId, outcome: Outcome) -> Result<(), ServerError> {
        let (new_state, return_code) = match outcome {
            Outcome::Success => (JobState::CompletedSuccessfully, 0),
            Outcome::Failed(code) => (JobState::CompletedFailed, code),
            Outcome::WalltimeReached => (JobState::CompletedWalltimeReached, -1),
        };
        let machines: Vec<MachineId> = self.ctx.job(&job_id).map(|j| j.allocation.iter().copied().collect()).unwrap_or_default();
        for machine_id in &machines {
            if let Some(machine) = self.ctx.machine_mut(*machine_id) {
                machine.remove_job(&job_id);
            }
        }
        let storage_machines: Vec<MachineId> =
            self.ctx.job(&job_id).and_then(|j| j.execution_request.as_ref()).map(|p| p.storage_mapping.values().copied().collect()).unwrap_or_default();
        for machine_id in &storage_machines {
            if let Some(machine) = self.ctx.machine_mut(*machine_id) {
                machine.remove_job(&job_id);
            }
        }
        let starting_time = self.ctx.job(&job_id).and_then(|j| j.starting_time);
        if let Some(job) = self.ctx.job_mut(&job_id) {
            job.transition(new_state)?;
            job.runtime = Some(self.ctx.clock.as_f64() - starting_time.unwrap_or(self.ctx.clock.as_f64()));
            job.return_code = Some(return_code);
        }
        self.ctx.counters.nb_running = self.ctx.counters.nb_running.saturating_sub(1);
        self.ctx.counters.nb_completed += 1;
        if let Some(job) = self.ctx.job(&job_id) {
            let range: MachineRange = machines.iter().map(|m| m.0).collect();
            let epower = self.range_epower(&range);
            self.instrumentation.on_job_finished(self.ctx.clock.as_f64(), job, epower);
        }
        self.events.push(OutboundEvent::JobCompleted { job_id: job_id.canonical(), job_state: new_state.to_string(), return_code });
        if matches!(new_state, JobState::CompletedSuccessfully) {
            self.release_workflow_dependents(&job_id);
        }
        self.ctx.stage_job_deletion(job_id);
        Ok(())
    }

    fn kill_jobs(&mut self, job_ids: Vec<JobId>, ack_requested: bool) -> Result<(), ServerError> {
        let mut progress = BTreeMap::new();
        let mut killed_ids = Vec::new();
        for job_id in &job_ids {
            // spec §4.1: only still-running jobs whose kill wasn't already
            // requested are actually killed; naming an already-terminal or
            // not-yet-running job id is a no-op, not a double completion.
            let should_kill = self.ctx.job(job_id).map(|j| j.state == JobState::Running && !j.kill_requested).unwrap_or(false);
            if !should_kill {
                continue;
            }

            let ratio = self.ctx.executors.get(job_id).map(JobExecutor::current_progress_ratio).unwrap_or(0.0);
            progress.insert(job_id.canonical(), ratio);
            self.ctx.executors.remove(job_id);

            let machines: Vec<MachineId> = self.ctx.job(job_id).map(|j| j.allocation.iter().copied().collect()).unwrap_or_default();
            for &machine_id in &machines {
                if let Some(machine) = self.ctx.machine_mut(machine_id) {
                    machine.remove_job(job_id);
                }
            }
            let storage_machines: Vec<MachineId> =
                self.ctx.job(job_id).and_then(|j| j.execution_request.as_ref()).map(|p| p.storage_mapping.values().copied().collect()).unwrap_or_default();
            for machine_id in &storage_machines {
                if let Some(machine) = self.ctx.machine_mut(*machine_id) {
                    machine.remove_job(job_id);
                }
            }
            if let Some(job) = self.ctx.job_mut(job_id) {
                job.kill_requested = true;
                job.transition(JobState::CompletedKilled)?;
                job.return_code = Some(-1);
            }
            self.ctx.counters.nb_running = self.ctx.counters.nb_running.saturating_sub(1);
            self.ctx.counters.nb_completed += 1;
            if let Some(job) = self.ctx.job(job_id) {
                let range: MachineRange = machines.iter().map(|m| m.0).collect();
                let epower = self.range_epower(&range);
                self.instrumentation.on_job_finished(self.ctx.clock.as_f64(), job, epower);
            }
            self.ctx.stage_job_deletion(job_id.clone());
            killed_ids.push(job_id.clone());
        }
        if ack_requested {
            self.events.push(OutboundEvent::JobKilled { job_ids: killed_ids.iter().map(JobId::canonical).collect(), progress });
        }
        Ok(())
    }
}

fn parse_job_state(s: &str) -> Option<JobState> {
    Some(match s {
        "not_submitted" => JobState::NotSubmitted,
        "submitted" => JobState::Submitted,
        "rejected" => JobState::Rejected,
        "running" => JobState::Running,
        "completed_successfully" => JobState::CompletedSuccessfully,
        "completed_failed" => JobState::CompletedFailed,
        "completed_walltime_reached" => JobState::CompletedWalltimeReached,
        "completed_killed" => JobState::CompletedKilled,
        _ => return None,
    })
}

/// Load a static workload file and queue its jobs; convenience wrapper over
/// [`workload_loader::load_workload`] for callers that only have a path.
pub fn load_and_submit_workload<T: EdcTransport>(
    server: &mut Server<T>,
    name: WorkloadName,
    path: &std::path::Path,
) -> Result<(), ServerError> {
    let workload = workload_loader::load_workload(name.clone(), path)?;
    server.submit_static_workload(name, workload);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use batsim_core::{Machine, Role, WorkloadKind};
    use batsim_protocol::codec::WireFormat;
    use std::collections::VecDeque;

    struct ScriptedTransport {
        replies: VecDeque<InboundMessage>,
    }

    impl EdcTransport for ScriptedTransport {
        fn request(&mut self, _request: &[u8]) -> Result<Vec<u8>, ProtocolError> {
            let reply = self.replies.pop_front().unwrap_or_else(|| InboundMessage::new(0.0, Vec::new()));
            serde_json::to_vec(&reply).map_err(|e| ProtocolError::EncodeFailure { wire: "json", reason: e.to_string() })
        }
    }

    fn one_machine_ctx() -> Context {
        Context::new(vec![Machine::new(MachineId(0), "h0", Role::Compute, 0)])
    }

    fn server_with(replies: Vec<InboundMessage>) -> Server<ScriptedTransport> {
        let ctx = one_machine_ctx();
        let codec = Codec::new(WireFormat::Json);
        let transport = ScriptedTransport { replies: replies.into() };
        Server::new(ctx, codec, transport, SimplePlatform::default())
    }

    fn sample_workload() -> Workload {
        let mut workload = Workload::new(WorkloadName::new("w0"), WorkloadKind::Static);
        workload.register_profile("delay", batsim_core::Profile::Delay { seconds: 5.0, return_code: 0 }).unwrap();
        let job_id = workload.job_id("j0");
        let profile_ref = workload.profile_id("delay");
        let job = Job::new(job_id, profile_ref, 0.0, Walltime::UNBOUNDED, 1);
        workload.register_job(job).unwrap();
        workload
    }

    #[test]
    fn job_runs_to_completion_through_the_full_loop() {
        let execute = InboundEvent::ExecuteJob {
            job_id: batsim_protocol::event::JobIdWire(JobId::new("w0", "j0")),
            placement: AllocationPlacement::simple([MachineId(0)]),
        };
        // First reply answers BatsimHello+SimulationBegins (before the job
        // has even reached Submitted); the EDC only decides to execute once
        // it sees the JobSubmitted notification on the second round trip.
        let mut server =
            server_with(vec![InboundMessage::new(0.0, Vec::new()), InboundMessage::new(0.0, vec![execute])]);
        server.submit_static_workload(WorkloadName::new("w0"), sample_workload());

        server.run().unwrap();

        let job = server.ctx.job(&JobId::new("w0", "j0")).unwrap();
        assert_eq!(job.state, JobState::CompletedSuccessfully);
        assert_eq!(server.ctx.counters.nb_completed, 1);
        assert_eq!(server.ctx.counters.nb_running, 0);
    }

    #[test]
    fn kill_jobs_reports_progress_and_frees_machines() {
        let mut server = server_with(vec![]);
        server.submit_static_workload(WorkloadName::new("w0"), sample_workload());
        server.dispatch(Message::JobSubmitted { job_id: JobId::new("w0", "j0") }).unwrap();
        server.execute_job(JobId::new("w0", "j0"), AllocationPlacement::simple([MachineId(0)])).unwrap();

        server.kill_jobs(vec![JobId::new("w0", "j0")], true).unwrap();

        let job = server.ctx.job(&JobId::new("w0", "j0")).unwrap();
        assert_eq!(job.state, JobState::CompletedKilled);
        assert!(server.ctx.machine(MachineId(0)).unwrap().jobs_being_computed.is_empty());
    }

    #[test]
    fn ack_mismatch_is_rejected() {
        let mut server = server_with(vec![]);
        server.edc_options = Some(EdcHelloOptions::new(true, false));
        let err = server.register_job(JobId::new("w0", "dyn0"), None, serde_json::json!({"res": 1}), true).unwrap_err();
        assert!(matches!(err, ServerError::Protocol(ProtocolError::AckMismatch { .. })));
    }
}
