// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI flag surface: the minimum surface an EDC-driving front end
//! must expose. Subcommand-free by design — the original tool is a single
//! flat invocation, not a multi-command workspace like `oj`.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "batsim", version, about = "Discrete-event HPC job/I/O scheduling simulator")]
pub struct Args {
    /// Platform description file (required for simulation runs).
    #[arg(long)]
    pub platform: Option<String>,

    /// Static workload file. Repeatable.
    #[arg(long = "workload")]
    pub workloads: Vec<String>,

    /// Newline-delimited external-event file. Repeatable.
    #[arg(long = "events")]
    pub events: Vec<String>,

    /// Workflow (DAG) file, expanded into a dynamic workload whose jobs
    /// are held back until their `depends_on` siblings complete. Repeatable.
    #[arg(long = "workflow")]
    pub workflows: Vec<String>,

    /// Path to a dynamically loaded EDC (`dlopen`-style). Mutually
    /// exclusive with `--socket`.
    #[arg(long)]
    pub library: Option<String>,

    /// `host:port` of a socket-mode EDC. Mutually exclusive with
    /// `--library`.
    #[arg(long)]
    pub socket: Option<String>,

    /// Wire encoding spoken with the EDC.
    #[arg(long, value_enum, default_value_t = WireFormatArg::Binary)]
    pub format: WireFormatArg,

    /// Opaque bytes handed to the EDC's `init` call (library mode) or sent
    /// as the first socket message. Read verbatim from a file when given;
    /// empty when omitted.
    #[arg(long = "init-buffer")]
    pub init_buffer_file: Option<String>,

    /// Output directory for the fixed CSV exports.
    #[arg(long, default_value = "out/")]
    pub export: String,

    /// Cap the number of usable compute machines. Mutually exclusive with
    /// `--mmax-workload`.
    #[arg(long)]
    pub mmax: Option<u32>,

    /// Cap usable compute machines at the largest requested resource count
    /// across loaded workloads. Mutually exclusive with `--mmax`.
    #[arg(long, default_value_t = false)]
    pub mmax_workload: bool,

    /// Enable per-host energy readings (populates each machine's wattage
    /// table from the platform file).
    #[arg(long, default_value_t = false)]
    pub energy_host: bool,

    /// `--add-role <hostname> <role>`, role in {master, storage,
    /// compute_node}. Repeatable.
    #[arg(long = "add-role", num_args = 2, value_names = ["HOSTNAME", "ROLE"])]
    pub add_role: Vec<String>,

    /// Verbosity, passed through to the tracing subscriber untouched.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Dump the effective, validated configuration as JSON and exit without
    /// simulating.
    #[arg(long, default_value_t = false)]
    pub dump_execution_context: bool,

    /// Enables an external key-value store for job/profile data. When unset,
    /// `JobSubmitted` events carry the job and profile JSON inline instead.
    #[arg(long = "enable-redis", default_value_t = false)]
    pub enable_redis: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum WireFormatArg {
    Binary,
    Json,
}
