// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy: configuration, protocol, and invariant-violation
//! errors, plus the top-level [`BatsimError`] every crate ultimately surfaces.

use crate::id::JobId;
use thiserror::Error;

/// Invalid CLI, unreadable inputs, malformed workload/profile.
///
/// Surfaced before the simulation starts; callers should exit non-zero.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("no EDC was selected: exactly one of --library or --socket is required")]
    NoEdcSelected,

    #[error("both --library and --socket were given; exactly one EDC is required")]
    MultipleEdcsSelected,

    #[error("cannot read platform file {path}: {reason}")]
    UnreadablePlatform { path: String, reason: String },

    #[error("cannot read workload file {path}: {reason}")]
    UnreadableWorkload { path: String, reason: String },

    #[error("malformed workload {path}: {reason}")]
    MalformedWorkload { path: String, reason: String },

    #[error("malformed profile {name} in workload {workload}: {reason}")]
    MalformedProfile { workload: String, name: String, reason: String },

    #[error("malformed external event file {path}: {reason}")]
    MalformedEvents { path: String, reason: String },

    #[error("malformed workflow {path}: {reason}")]
    MalformedWorkflow { path: String, reason: String },

    #[error("identifier {field} must not contain '!': {value:?}")]
    IdentifierContainsBang { field: &'static str, value: String },

    #[error("unknown role {role:?} for --add-role; expected master, storage, or compute_node")]
    UnknownRole { role: String },

    #[error("--mmax and --mmax-workload are mutually exclusive")]
    ConflictingMmax,

    #[error("platform must declare exactly one master machine, found {count}")]
    NotExactlyOneMaster { count: usize },

    #[error("{0} configuration errors were accumulated")]
    Multiple(Vec<ConfigurationError>),
}

/// Invalid message order, unknown event tag, ACK mismatch, EDC return-code
/// non-zero. Aborts the simulation after flushing tracers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unknown event tag {tag:?} in {direction} message")]
    UnknownEventTag { direction: &'static str, tag: String },

    #[error("message received before SimulationBegins was sent")]
    MessageBeforeSimulationBegins,

    #[error("EDC replied out of order: expected reply for request at t={expected}, got t={got}")]
    OutOfOrderReply { expected: String, got: String },

    #[error("ACK mismatch: RegisterJob ack requested={requested} but EdcHello.ack_dynamic_registration={configured}")]
    AckMismatch { requested: bool, configured: bool },

    #[error("EDC returned non-zero exit/return code: {0}")]
    EdcNonZeroReturn(i32),

    #[error("failed to decode {wire} message: {reason}")]
    DecodeFailure { wire: &'static str, reason: String },

    #[error("failed to encode {wire} message: {reason}")]
    EncodeFailure { wire: &'static str, reason: String },

    #[error("library EDC symbol {symbol} could not be resolved: {reason}")]
    LibrarySymbol { symbol: &'static str, reason: String },

    #[error("socket EDC transport error: {0}")]
    Transport(String),
}

/// Duplicate job id, unknown job id at execute/kill, pstate classification
/// contradiction, allocation of a non-compute pstate, sharing rule violated,
/// non-multiple periods. Aborts with a diagnostic naming the offending IDs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("duplicate job id {0}")]
    DuplicateJobId(JobId),

    #[error("duplicate profile {workload}!{name}")]
    DuplicateProfile { workload: String, name: String },

    #[error("profile {workload}!{name} was previously removed and cannot be re-registered")]
    ProfilePreviouslyRemoved { workload: String, name: String },

    #[error("unknown job id {0}")]
    UnknownJobId(JobId),

    #[error("unknown profile {workload}!{name} referenced by job")]
    UnknownProfile { workload: String, name: String },

    #[error("unknown machine id {0}")]
    UnknownMachineId(u32),

    #[error("pstate {pstate} has contradictory classification: {first:?} then {second:?}")]
    PstateClassificationContradiction { pstate: i32, first: String, second: String },

    #[error("sleep pstate {pstate} must reference exactly two distinct transition-virtual pstates")]
    SleepPstateArity { pstate: i32 },

    #[error("job {job} requires state transition {from:?} -> {to:?} which is not permitted")]
    IllegalStateTransition { job: JobId, from: String, to: String },

    #[error("machine {machine} is in non-compute pstate {pstate} and cannot be allocated")]
    AllocationOfNonComputePstate { machine: u32, pstate: i32 },

    #[error("compute sharing disabled: machine {machine} already hosts a job")]
    ComputeSharingViolation { machine: u32 },

    #[error("storage sharing disabled: machine {machine} already hosts a job")]
    StorageSharingViolation { machine: u32 },

    #[error("allocation size {got} does not match requested_nb_res {expected} for job {job}")]
    AllocationSizeMismatch { job: JobId, expected: u32, got: u32 },

    #[error("periodic entities {first} (period={p1}ms) and {second} (period={p2}ms) are not integer multiples of each other")]
    NonMultiplePeriods { first: String, second: String, p1: u64, p2: u64 },

    #[error("the master machine may never be allocated to a job (attempted for job {job})")]
    MasterMachineAllocated { job: JobId },

    #[error("identifier must not contain '!': {0:?}")]
    IdentifierContainsBang(String),
}

/// `SchedulerRecv` timeout/failure is the only error kind allowed local
/// recovery (it selects a recovery profile); everything else propagates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubTaskFailure {
    #[error("sub-task {index} of sequence returned non-zero code {code}")]
    SequenceStepFailed { index: usize, code: i32 },
}

/// Top-level error type every `batsim-*` crate's `Result` ultimately collapses
/// into at the process boundary.
#[derive(Debug, Error)]
pub enum BatsimError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error(transparent)]
    SubTask(#[from] SubTaskFailure),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for BatsimError {
    fn from(e: std::io::Error) -> Self {
        BatsimError::Io(e.to_string())
    }
}
