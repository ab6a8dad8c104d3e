// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `batsim`: process wiring for the discrete-event HPC job/I/O scheduling
//! simulator. Parses arguments, validates them into a `Config`,
//! loads the platform/workload/event inputs, selects an EDC transport, and
//! drives the `Server` main loop to completion.

mod cli;
mod config;
mod exit;
mod platform;

use std::process::ExitCode;

use batsim_core::{Machine, Role, WorkloadName};
use batsim_protocol::codec::{Codec, WireFormat};
use batsim_protocol::transport::{EdcTransportHandle, LibraryTransport, SocketTransport};
use batsim_server::{Context, Server, SubmitterKind};
use batsim_tracers::{total_wattmin, TracerPaths, TracerSet};
use clap::Parser;
use cli::{Args, WireFormatArg};
use config::{Config, EdcSelection};
use exit::ExitError;

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Aborting: {err}");
            ExitCode::from(err.code as u8)
        }
    }
}

fn run(args: Args) -> Result<(), ExitError> {
    let config = config::validate(&args).map_err(ExitError::from)?;
    init_tracing(config.verbosity);

    if args.dump_execution_context {
        let json = serde_json::to_string_pretty(&config).map_err(|e| ExitError::configuration(e.to_string()))?;
        println!("{json}");
        return Ok(());
    }

    let loaded = platform::load_platform(&config.platform, config.energy_host).map_err(ExitError::from)?;
    let mut machines = loaded.machines;
    apply_roles(&mut machines, &config.roles)?;
    machines = apply_mmax(machines, &config);
    ensure_single_master(&machines)?;

    let mut ctx = Context::new(machines);
    ctx.redis_enabled = config.redis_enabled;
    let codec = Codec::new(match config.wire_format {
        WireFormatArg::Binary => WireFormat::Binary,
        WireFormatArg::Json => WireFormat::Json,
    });
    let transport = connect_transport(&config)?;

    let mut server = Server::new(ctx, codec, transport, loaded.engine);

    std::fs::create_dir_all(&config.export_prefix)
        .map_err(|e| ExitError::configuration(format!("cannot create export directory: {e}")))?;
    let paths = TracerPaths::with_prefix(&config.export_prefix);
    let wattmin = total_wattmin(&server.ctx.machines);
    let tracers = TracerSet::create(&paths, wattmin).map_err(|e| ExitError::invariant(e.to_string()))?;
    server.set_instrumentation(Box::new(tracers));

    load_inputs(&mut server, &config)?;

    let scheduling_started = std::time::Instant::now();
    let run_result = server.run();
    let simulation_time = scheduling_started.elapsed().as_secs_f64();

    finalize(&mut server, simulation_time);
    run_result.map_err(ExitError::from)
}

fn init_tracing(verbosity: u8) {
    use tracing_subscriber::EnvFilter;
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn apply_roles(machines: &mut [Machine], roles: &[(String, Role)]) -> Result<(), ExitError> {
    for (hostname, role) in roles {
        let machine = machines
            .iter_mut()
            .find(|m| &m.name == hostname)
            .ok_or_else(|| ExitError::configuration(format!("--add-role: unknown host {hostname:?}")))?;
        machine.role = *role;
    }
    Ok(())
}

fn apply_mmax(machines: Vec<Machine>, config: &Config) -> Vec<Machine> {
    if let Some(mmax) = config.mmax {
        return platform::apply_mmax(machines, mmax);
    }
    if config.mmax_workload {
        // `--mmax-workload` is applied after workloads are loaded, inline in
        // `load_inputs`; this placeholder keeps the platform untouched here.
    }
    machines
}

fn ensure_single_master(machines: &[Machine]) -> Result<(), ExitError> {
    let count = machines.iter().filter(|m| m.role == Role::Master).count();
    if count != 1 {
        return Err(ExitError::from(batsim_core::BatsimError::Configuration(
            batsim_core::ConfigurationError::NotExactlyOneMaster { count },
        )));
    }
    Ok(())
}

fn connect_transport(config: &Config) -> Result<EdcTransportHandle, ExitError> {
    match &config.edc {
        EdcSelection::Library { path } => {
            let transport = LibraryTransport::load(path, &config.init_buffer, 0, true)
                .map_err(|e| ExitError::invariant(e.to_string()))?;
            Ok(EdcTransportHandle::Library(transport))
        }
        EdcSelection::Socket { endpoint } => {
            let transport = SocketTransport::connect(endpoint).map_err(|e| ExitError::invariant(e.to_string()))?;
            Ok(EdcTransportHandle::Socket(transport))
        }
    }
}

fn load_inputs(server: &mut Server<EdcTransportHandle>, config: &Config) -> Result<(), ExitError> {
    server.open_submitter(SubmitterKind::Job);
    let mut workloads = Vec::new();
    for (idx, path) in config.workloads.iter().enumerate() {
        let name = workload_name_for(path, idx);
        let workload =
            batsim_server::workload_loader::load_workload(name.clone(), path).map_err(ExitError::from)?;
        workloads.push(workload);
    }

    if config.mmax_workload {
        let mmax = platform::mmax_from_workloads(&workloads);
        let machines = std::mem::take(&mut server.ctx.machines);
        server.ctx.machines = platform::apply_mmax(machines, mmax);
    }

    for (path, workload) in config.workloads.iter().zip(workloads) {
        let name = workload.name.clone();
        let _ = path;
        server.submit_static_workload(name, workload);
    }

    for (idx, path) in config.workflows.iter().enumerate() {
        let name = workload_name_for(path, idx + config.workloads.len());
        let workload = batsim_server::workload_loader::load_workflow(name.clone(), path).map_err(ExitError::from)?;
        server.submit_workflow(name, workload);
    }
    server.dispatch_bye(SubmitterKind::Job);

    server.open_submitter(SubmitterKind::Event);
    for path in &config.events {
        let events = batsim_server::workload_loader::load_events(path).map_err(ExitError::from)?;
        server.submit_external_events(events);
    }
    server.dispatch_bye(SubmitterKind::Event);

    Ok(())
}

fn workload_name_for(path: &std::path::Path, idx: usize) -> WorkloadName {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("workload");
    WorkloadName::new(format!("{stem}_{idx}"))
}

fn finalize(server: &mut Server<EdcTransportHandle>, simulation_time: f64) {
    let time_spent = server.ctx.aggregate_time_spent();
    let nb_machine_switches = server.ctx.nb_machine_switches;
    let nb_grouped_switches = server.ctx.nb_grouped_switches;
    let scheduling_time = server.ctx.clock.as_f64();
    server.finalize_tracers(&time_spent, nb_machine_switches, nb_grouped_switches, scheduling_time, simulation_time);
}
