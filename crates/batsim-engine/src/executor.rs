// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step-driven profile execution.
//!
//! A `JobExecutor` is not a coroutine: it exposes a single `resume` method
//! the server calls whenever time advances or a message arrives for the
//! job, and it reports back either a `Suspend` (what it's waiting for next)
//! or a terminal `Outcome`: a pull-based shape carrying elapsed simulated
//! time instead of a completed future.

use crate::battask::{BatTask, BatTaskKind};
use crate::mpi_trace::{self, TraceError};
use crate::platform::{Platform, ProfileResolver};
use batsim_core::{HomogeneousStrategy, MachineId, Profile};
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("profile `{0}` is not registered in this job's workload")]
    UnknownProfile(String),
    #[error("malformed regex `{pattern}` in scheduler_recv profile: {reason}")]
    BadRegex { pattern: String, reason: String },
    #[error("sequence recursion exceeded {0} nested frames, likely a profile reference cycle")]
    RecursionLimit(usize),
    #[error(transparent)]
    Trace(#[from] TraceError),
}

/// What the executor is waiting on before it can make further progress.
#[derive(Debug, Clone)]
pub enum Suspend {
    /// Sleep until `seconds` of simulated time have elapsed, then call
    /// `resume` again with that much elapsed time.
    Sleep(f64),
    /// Emit this payload as a `FromJobMessage` to the scheduler, then behave
    /// like `Sleep` for the profile's `sleeptime`.
    EmitMessage(serde_json::Value),
    /// Wait up to `timeout` seconds for an incoming message; `resume` should
    /// be called early if one arrives, or after `timeout` elapses regardless.
    AwaitMessage { timeout: f64 },
}

/// Terminal result of a job's execution tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Success,
    Failed(i32),
    WalltimeReached,
}

/// One `resume` result: either more waiting, or done.
#[derive(Debug, Clone)]
pub enum Step {
    Suspend(Suspend),
    Done(Outcome),
}

/// A `Sequence` frame being iterated: `sequence[index]` is the name of the
/// sub-profile currently executing (or about to be entered).
struct Frame {
    sequence: Vec<String>,
    index: usize,
    repeat_remaining: u32,
}

enum CurrentLeaf {
    /// Duration-bound leaves: `Delay`, `ParallelTask`, `HomogeneousParallel`,
    /// `MpiReplay`, `HomogeneousPfs`, `DataStaging`.
    Timed { remaining: f64, return_code: i32 },
    /// `SchedulerSend`: emit once, then behave like `Timed` for `sleeptime`.
    Sending { payload: serde_json::Value, emitted: bool, remaining: f64, return_code: i32 },
    /// `SchedulerRecv`: wait for a message matching `pattern`, or time out.
    Receiving {
        pattern: Regex,
        on_success: String,
        on_failure: String,
        on_timeout: String,
        remaining: f64,
        return_code: i32,
    },
}

const MAX_FRAME_DEPTH: usize = 256;

/// Drives a single job's profile tree to completion, one `resume` call at a
/// time.
pub struct JobExecutor {
    frames: Vec<Frame>,
    current: Option<CurrentLeaf>,
    pub battask: BatTask,
    walltime_remaining: Option<f64>,
    hosts: Vec<MachineId>,
    storage_hosts: HashMap<String, MachineId>,
    /// Explicit executor/rank → host mapping from the EDC's placement
    /// (`AllocationPlacement::executor_to_host`), used by `MpiReplay` to
    /// place ranks onto hosts when the rank count doesn't match `hosts`
    /// one-to-one. `None` falls back to round-robin over `hosts`.
    executor_to_host: Option<Vec<MachineId>>,
}

impl JobExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        root_profile_name: &str,
        hosts: Vec<MachineId>,
        storage_hosts: HashMap<String, MachineId>,
        executor_to_host: Option<Vec<MachineId>>,
        walltime_remaining: Option<f64>,
        resolver: &dyn ProfileResolver,
        platform: &dyn Platform,
    ) -> Result<Self, EngineError> {
        let mut executor = Self {
            frames: Vec::new(),
            current: None,
            battask: BatTask::sequence(root_profile_name),
            walltime_remaining,
            hosts,
            storage_hosts,
            executor_to_host,
        };
        executor.descend(root_profile_name, resolver, platform)?;
        Ok(executor)
    }

    /// Ranks → hosts for an `MpiReplay` profile with `n_ranks` ranks: the
    /// explicit `executor_to_host` mapping when it matches `n_ranks`,
    /// otherwise round-robin over `hosts` (spec default).
    fn rank_hosts(&self, n_ranks: usize) -> Vec<MachineId> {
        if let Some(mapping) = &self.executor_to_host {
            if mapping.len() == n_ranks {
                return mapping.clone();
            }
        }
        if self.hosts.is_empty() {
            return vec![MachineId(0); n_ranks];
        }
        (0..n_ranks).map(|rank| self.hosts[rank % self.hosts.len()]).collect()
    }

    /// Advance `elapsed` seconds of simulated time and, if present, deliver
    /// an incoming message to a `SchedulerRecv` leaf waiting for one.
    pub fn resume(
        &mut self,
        elapsed: f64,
        incoming_message: Option<&str>,
        resolver: &dyn ProfileResolver,
        platform: &dyn Platform,
    ) -> Result<Step, EngineError> {
        self.battask.tick(elapsed);
        if let Some(remaining) = self.walltime_remaining.as_mut() {
            *remaining -= elapsed;
            if *remaining <= 0.0 {
                return Ok(Step::Done(Outcome::WalltimeReached));
            }
        }

        let current = self.current.as_mut().expect("resume called with no active leaf");
        match current {
            CurrentLeaf::Timed { remaining, return_code } => {
                *remaining -= elapsed;
                let return_code = *return_code;
                if *remaining > 1e-9 {
                    Ok(Step::Suspend(Suspend::Sleep(*remaining)))
                } else {
                    self.advance(return_code, resolver, platform)
                }
            }
            CurrentLeaf::Sending { payload, emitted, remaining, return_code } => {
                if !*emitted {
                    *emitted = true;
                    let payload = payload.clone();
                    return Ok(Step::Suspend(Suspend::EmitMessage(payload)));
                }
                *remaining -= elapsed;
                let return_code = *return_code;
                if *remaining > 1e-9 {
                    Ok(Step::Suspend(Suspend::Sleep(*remaining)))
                } else {
                    self.advance(return_code, resolver, platform)
                }
            }
            CurrentLeaf::Receiving { pattern, on_success, on_failure, on_timeout, remaining, return_code } => {
                let return_code = *return_code;
                if let Some(message) = incoming_message {
                    let next = if pattern.is_match(message) { on_success.clone() } else { on_failure.clone() };
                    return self.enter(&next, return_code, resolver, platform);
                }
                *remaining -= elapsed;
                if *remaining > 1e-9 {
                    Ok(Step::Suspend(Suspend::AwaitMessage { timeout: *remaining }))
                } else {
                    let next = on_timeout.clone();
                    self.enter(&next, return_code, resolver, platform)
                }
            }
        }
    }

    /// The leaf just finished successfully; move on to whatever comes next
    /// in the enclosing sequence frame, or finish the job.
    fn advance(
        &mut self,
        return_code: i32,
        resolver: &dyn ProfileResolver,
        platform: &dyn Platform,
    ) -> Result<Step, EngineError> {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Ok(Step::Done(terminal_outcome(return_code)));
            };
            frame.index += 1;
            if frame.index >= frame.sequence.len() {
                frame.index = 0;
                frame.repeat_remaining = frame.repeat_remaining.saturating_sub(1);
                if frame.repeat_remaining == 0 {
                    self.frames.pop();
                    continue;
                }
            }
            let next_name = self.frames.last().expect("just matched Some above").sequence
                [self.frames.last().expect("just matched Some above").index]
                .clone();
            return self.descend(&next_name, resolver, platform).map(|()| self.current_suspend());
        }
    }

    /// Like `advance`, but used when a `SchedulerRecv` branches to a named
    /// profile instead of continuing the enclosing sequence.
    fn enter(
        &mut self,
        profile_name: &str,
        return_code: i32,
        resolver: &dyn ProfileResolver,
        platform: &dyn Platform,
    ) -> Result<Step, EngineError> {
        if profile_name.is_empty() {
            return self.advance(return_code, resolver, platform);
        }
        self.descend(profile_name, resolver, platform)?;
        Ok(self.current_suspend())
    }

    /// Resolve `profile_name` and either push a new `Sequence` frame (and
    /// recurse into its first element) or start executing it as a leaf.
    fn descend(&mut self, profile_name: &str, resolver: &dyn ProfileResolver, platform: &dyn Platform) -> Result<(), EngineError> {
        if self.frames.len() >= MAX_FRAME_DEPTH {
            return Err(EngineError::RecursionLimit(MAX_FRAME_DEPTH));
        }
        let profile = resolver.resolve(profile_name).ok_or_else(|| EngineError::UnknownProfile(profile_name.to_string()))?;

        if let Profile::Sequence { repeat, sequence, return_code: _ } = profile.as_ref() {
            self.frames.push(Frame { sequence: sequence.clone(), index: 0, repeat_remaining: *repeat });
            let first = sequence.first().cloned().ok_or_else(|| EngineError::UnknownProfile(profile_name.to_string()))?;
            return self.descend(&first, resolver, platform);
        }

        let (leaf, current) = self.build_leaf(profile_name, profile.as_ref(), platform)?;
        self.battask.begin_next_child(leaf);
        self.current = Some(current);
        Ok(())
    }

    fn build_leaf(
        &self,
        profile_name: &str,
        profile: &Profile,
        platform: &dyn Platform,
    ) -> Result<(BatTask, CurrentLeaf), EngineError> {
        let leaf_kind = |kind: BatTaskKind, duration: f64| BatTask::leaf(kind, profile_name, duration);

        Ok(match profile {
            Profile::Delay { seconds, return_code } => {
                (leaf_kind(BatTaskKind::Delay, *seconds), CurrentLeaf::Timed { remaining: *seconds, return_code: *return_code })
            }
            Profile::ParallelTask { cpu_vec, com_mat, return_code, .. } => {
                let duration = platform.ptask_duration(&self.hosts, cpu_vec, com_mat);
                (leaf_kind(BatTaskKind::ParallelTask, duration), CurrentLeaf::Timed { remaining: duration, return_code: *return_code })
            }
            Profile::HomogeneousParallel { cpu, com, strategy, return_code } => {
                let n = self.hosts.len().max(1);
                let (cpu_each, com_each) = match strategy {
                    HomogeneousStrategy::SameForAll => (*cpu, *com),
                    HomogeneousStrategy::TotalSpreadEvenly => (*cpu / n as f64, *com / n as f64),
                };
                let cpu_vec = vec![cpu_each; n];
                let com_mat = vec![com_each; n * n];
                let duration = platform.ptask_duration(&self.hosts, &cpu_vec, &com_mat);
                (leaf_kind(BatTaskKind::HomogeneousParallel, duration), CurrentLeaf::Timed { remaining: duration, return_code: *return_code })
            }
            Profile::MpiReplay { trace_filenames, return_code } => {
                let ranks = trace_filenames.len();
                let rank_hosts = self.rank_hosts(ranks);
                let costs = mpi_trace::load_rank_costs(trace_filenames)?;
                let n_hosts = self.hosts.len().max(1);
                let host_index = |host: MachineId| self.hosts.iter().position(|&h| h == host).unwrap_or(0);
                let mut cpu_vec = vec![0.0; n_hosts];
                let mut com_mat = vec![0.0; n_hosts * n_hosts];
                for (rank, cost) in costs.iter().enumerate() {
                    let src = host_index(rank_hosts[rank]);
                    cpu_vec[src] += cost.flops;
                    for &(dest_rank, bytes) in &cost.sends {
                        if let Some(&dest_host) = rank_hosts.get(dest_rank) {
                            let dest = host_index(dest_host);
                            com_mat[src * n_hosts + dest] += bytes;
                        }
                    }
                }
                let duration = platform.ptask_duration(&self.hosts, &cpu_vec, &com_mat);
                (leaf_kind(BatTaskKind::MpiReplay, duration), CurrentLeaf::Timed { remaining: duration, return_code: *return_code })
            }
            Profile::HomogeneousPfs { bytes_to_read, bytes_to_write, storage_label, return_code } => {
                let default_host = *self.hosts.first().unwrap_or(&MachineId(0));
                let storage = self.storage_hosts.get(storage_label).copied().unwrap_or(default_host);
                let hosts = if self.hosts.is_empty() { std::slice::from_ref(&default_host) } else { self.hosts.as_slice() };
                let duration = hosts
                    .iter()
                    .map(|&host| platform.transfer_duration(storage, host, *bytes_to_read) + platform.transfer_duration(host, storage, *bytes_to_write))
                    .fold(0.0_f64, f64::max);
                (leaf_kind(BatTaskKind::HomogeneousPfs, duration), CurrentLeaf::Timed { remaining: duration, return_code: *return_code })
            }
            Profile::DataStaging { bytes, from_storage, to_storage, return_code } => {
                let default_host = *self.hosts.first().unwrap_or(&MachineId(0));
                let from = self.storage_hosts.get(from_storage).copied().unwrap_or(default_host);
                let to = self.storage_hosts.get(to_storage).copied().unwrap_or(default_host);
                let duration = platform.transfer_duration(from, to, *bytes);
                (leaf_kind(BatTaskKind::DataStaging, duration), CurrentLeaf::Timed { remaining: duration, return_code: *return_code })
            }
            Profile::SchedulerSend { message_payload, sleeptime, return_code } => (
                leaf_kind(BatTaskKind::SchedulerSend, *sleeptime),
                CurrentLeaf::Sending {
                    payload: message_payload.clone(),
                    emitted: false,
                    remaining: *sleeptime,
                    return_code: *return_code,
                },
            ),
            Profile::SchedulerRecv { regex, on_success, on_failure, on_timeout, polltime, return_code } => {
                let pattern = Regex::new(regex)
                    .map_err(|e| EngineError::BadRegex { pattern: regex.clone(), reason: e.to_string() })?;
                (
                    leaf_kind(BatTaskKind::SchedulerRecv, *polltime),
                    CurrentLeaf::Receiving {
                        pattern,
                        on_success: on_success.clone(),
                        on_failure: on_failure.clone(),
                        on_timeout: on_timeout.clone(),
                        remaining: *polltime,
                        return_code: *return_code,
                    },
                )
            }
            Profile::Sequence { .. } => unreachable!("Sequence profiles are pushed as frames, never built as leaves"),
        })
    }

    fn current_suspend(&self) -> Step {
        match self.current.as_ref().expect("descend always sets current") {
            CurrentLeaf::Timed { remaining, .. } => Step::Suspend(Suspend::Sleep(*remaining)),
            CurrentLeaf::Sending { payload, .. } => Step::Suspend(Suspend::EmitMessage(payload.clone())),
            CurrentLeaf::Receiving { remaining, .. } => Step::Suspend(Suspend::AwaitMessage { timeout: *remaining }),
        }
    }

    /// What the caller should wait for right now, without advancing time.
    /// Used immediately after construction to learn the first suspend point.
    pub fn initial_suspend(&self) -> Step {
        self.current_suspend()
    }

    pub fn current_progress_ratio(&self) -> f64 {
        self.battask.current_task_progress_ratio()
    }
}

fn terminal_outcome(return_code: i32) -> Outcome {
    if return_code == 0 {
        Outcome::Success
    } else {
        Outcome::Failed(return_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batsim_core::Profile;
    use std::sync::Arc;

    struct FixedResolver(HashMap<String, Arc<Profile>>);

    impl ProfileResolver for FixedResolver {
        fn resolve(&self, name: &str) -> Option<Arc<Profile>> {
            self.0.get(name).cloned()
        }
    }

    struct FixedPlatform {
        ptask_seconds: f64,
    }

    impl Platform for FixedPlatform {
        fn ptask_duration(&self, _hosts: &[MachineId], _cpu: &[f64], _com: &[f64]) -> f64 {
            self.ptask_seconds
        }
        fn transfer_duration(&self, _from: MachineId, _to: MachineId, bytes: f64) -> f64 {
            bytes / 1e6
        }
    }

    fn resolver_with(entries: Vec<(&str, Profile)>) -> FixedResolver {
        FixedResolver(entries.into_iter().map(|(name, profile)| (name.to_string(), Arc::new(profile))).collect())
    }

    #[test]
    fn delay_profile_runs_to_completion() {
        let resolver = resolver_with(vec![("d", Profile::Delay { seconds: 10.0, return_code: 0 })]);
        let platform = FixedPlatform { ptask_seconds: 0.0 };
        let mut exec = JobExecutor::new("d", vec![MachineId(1)], HashMap::new(), None, None, &resolver, &platform).unwrap();

        match exec.initial_suspend() {
            Step::Suspend(Suspend::Sleep(s)) => assert!((s - 10.0).abs() < 1e-9),
            other => panic!("expected Sleep(10), got {other:?}"),
        }
        let step = exec.resume(10.0, None, &resolver, &platform).unwrap();
        assert!(matches!(step, Step::Done(Outcome::Success)));
    }

    #[test]
    fn nonzero_return_code_is_a_failure() {
        let resolver = resolver_with(vec![("d", Profile::Delay { seconds: 1.0, return_code: 7 })]);
        let platform = FixedPlatform { ptask_seconds: 0.0 };
        let mut exec = JobExecutor::new("d", vec![MachineId(1)], HashMap::new(), None, None, &resolver, &platform).unwrap();
        let step = exec.resume(1.0, None, &resolver, &platform).unwrap();
        assert!(matches!(step, Step::Done(Outcome::Failed(7))));
    }

    #[test]
    fn walltime_reached_preempts_a_long_delay() {
        let resolver = resolver_with(vec![("d", Profile::Delay { seconds: 100.0, return_code: 0 })]);
        let platform = FixedPlatform { ptask_seconds: 0.0 };
        let mut exec = JobExecutor::new("d", vec![MachineId(1)], HashMap::new(), None, Some(5.0), &resolver, &platform).unwrap();
        let step = exec.resume(5.0, None, &resolver, &platform).unwrap();
        assert!(matches!(step, Step::Done(Outcome::WalltimeReached)));
    }

    #[test]
    fn sequence_runs_each_child_in_order() {
        let resolver = resolver_with(vec![
            ("seq", Profile::Sequence { repeat: 1, sequence: vec!["a".into(), "b".into()], return_code: 0 }),
            ("a", Profile::Delay { seconds: 3.0, return_code: 0 }),
            ("b", Profile::Delay { seconds: 4.0, return_code: 0 }),
        ]);
        let platform = FixedPlatform { ptask_seconds: 0.0 };
        let mut exec = JobExecutor::new("seq", vec![MachineId(1)], HashMap::new(), None, None, &resolver, &platform).unwrap();

        let step = exec.resume(3.0, None, &resolver, &platform).unwrap();
        match step {
            Step::Suspend(Suspend::Sleep(s)) => assert!((s - 4.0).abs() < 1e-9),
            other => panic!("expected to move into child b, got {other:?}"),
        }
        let step = exec.resume(4.0, None, &resolver, &platform).unwrap();
        assert!(matches!(step, Step::Done(Outcome::Success)));
    }

    #[test]
    fn sequence_repeats_the_requested_number_of_times() {
        let resolver = resolver_with(vec![
            ("seq", Profile::Sequence { repeat: 2, sequence: vec!["a".into()], return_code: 0 }),
            ("a", Profile::Delay { seconds: 1.0, return_code: 0 }),
        ]);
        let platform = FixedPlatform { ptask_seconds: 0.0 };
        let mut exec = JobExecutor::new("seq", vec![MachineId(1)], HashMap::new(), None, None, &resolver, &platform).unwrap();

        let step = exec.resume(1.0, None, &resolver, &platform).unwrap();
        assert!(matches!(step, Step::Suspend(Suspend::Sleep(_))), "expected a second iteration, got {step:?}");
        let step = exec.resume(1.0, None, &resolver, &platform).unwrap();
        assert!(matches!(step, Step::Done(Outcome::Success)));
    }

    #[test]
    fn scheduler_recv_branches_on_match() {
        let resolver = resolver_with(vec![
            (
                "recv",
                Profile::SchedulerRecv {
                    regex: "^ok$".into(),
                    on_success: "good".into(),
                    on_failure: "bad".into(),
                    on_timeout: "bad".into(),
                    polltime: 10.0,
                    return_code: 0,
                },
            ),
            ("good", Profile::Delay { seconds: 1.0, return_code: 0 }),
            ("bad", Profile::Delay { seconds: 1.0, return_code: 1 }),
        ]);
        let platform = FixedPlatform { ptask_seconds: 0.0 };
        let mut exec = JobExecutor::new("recv", vec![MachineId(1)], HashMap::new(), None, None, &resolver, &platform).unwrap();

        let step = exec.resume(2.0, Some("ok"), &resolver, &platform).unwrap();
        match step {
            Step::Suspend(Suspend::Sleep(s)) => assert!((s - 1.0).abs() < 1e-9),
            other => panic!("expected to enter `good`, got {other:?}"),
        }
    }

    #[test]
    fn scheduler_recv_times_out_without_a_message() {
        let resolver = resolver_with(vec![
            (
                "recv",
                Profile::SchedulerRecv {
                    regex: "^ok$".into(),
                    on_success: "good".into(),
                    on_failure: "good".into(),
                    on_timeout: "bad".into(),
                    polltime: 5.0,
                    return_code: 0,
                },
            ),
            ("good", Profile::Delay { seconds: 1.0, return_code: 0 }),
            ("bad", Profile::Delay { seconds: 1.0, return_code: 2 }),
        ]);
        let platform = FixedPlatform { ptask_seconds: 0.0 };
        let mut exec = JobExecutor::new("recv", vec![MachineId(1)], HashMap::new(), None, None, &resolver, &platform).unwrap();

        let step = exec.resume(5.0, None, &resolver, &platform).unwrap();
        assert!(matches!(step, Step::Suspend(Suspend::Sleep(_))));
        let step = exec.resume(1.0, None, &resolver, &platform).unwrap();
        assert!(matches!(step, Step::Done(Outcome::Failed(2))));
    }

    #[test]
    fn scheduler_send_emits_then_sleeps() {
        let resolver =
            resolver_with(vec![("send", Profile::SchedulerSend { message_payload: serde_json::json!({"k": 1}), sleeptime: 2.0, return_code: 0 })]);
        let platform = FixedPlatform { ptask_seconds: 0.0 };
        let mut exec = JobExecutor::new("send", vec![MachineId(1)], HashMap::new(), None, None, &resolver, &platform).unwrap();

        match exec.initial_suspend() {
            Step::Suspend(Suspend::EmitMessage(v)) => assert_eq!(v, serde_json::json!({"k": 1})),
            other => panic!("expected EmitMessage, got {other:?}"),
        }
        let step = exec.resume(0.0, None, &resolver, &platform).unwrap();
        assert!(matches!(step, Step::Suspend(Suspend::Sleep(s)) if (s - 2.0).abs() < 1e-9));
    }

    #[test]
    fn unknown_profile_is_an_engine_error() {
        let resolver = resolver_with(vec![]);
        let platform = FixedPlatform { ptask_seconds: 0.0 };
        let err = JobExecutor::new("missing", vec![MachineId(1)], HashMap::new(), None, None, &resolver, &platform).unwrap_err();
        assert!(matches!(err, EngineError::UnknownProfile(name) if name == "missing"));
    }
}
