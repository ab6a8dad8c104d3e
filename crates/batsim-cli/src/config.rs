// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validates raw [`crate::cli::Args`] into an effective, immutable
//! [`Config`]. Also the shape printed by `--dump-execution-context`.

use std::path::PathBuf;

use batsim_core::{ConfigurationError, Role};
use serde::Serialize;

use crate::cli::{Args, WireFormatArg};

#[derive(Debug, Clone, Serialize)]
pub enum EdcSelection {
    Library { path: String },
    Socket { endpoint: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub platform: PathBuf,
    pub workloads: Vec<PathBuf>,
    pub events: Vec<PathBuf>,
    pub workflows: Vec<PathBuf>,
    pub edc: EdcSelection,
    #[serde(skip)]
    pub init_buffer: Vec<u8>,
    pub wire_format: WireFormatArg,
    pub export_prefix: PathBuf,
    pub mmax: Option<u32>,
    pub mmax_workload: bool,
    pub energy_host: bool,
    pub roles: Vec<(String, Role)>,
    pub verbosity: u8,
    pub redis_enabled: bool,
}

impl serde::Serialize for WireFormatArg {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            WireFormatArg::Binary => serializer.serialize_str("binary"),
            WireFormatArg::Json => serializer.serialize_str("json"),
        }
    }
}

/// Everything but `--dump-execution-context`/`--help`/`--platform`
/// presence is validated here; those two are info-only and require no
/// platform at all.
pub fn validate(args: &Args) -> Result<Config, ConfigurationError> {
    let mut errors = Vec::new();

    let edc = match (&args.library, &args.socket) {
        (Some(_), Some(_)) => {
            errors.push(ConfigurationError::MultipleEdcsSelected);
            None
        }
        (Some(path), None) => Some(EdcSelection::Library { path: path.clone() }),
        (None, Some(endpoint)) => Some(EdcSelection::Socket { endpoint: endpoint.clone() }),
        (None, None) => {
            errors.push(ConfigurationError::NoEdcSelected);
            None
        }
    };

    if args.mmax.is_some() && args.mmax_workload {
        errors.push(ConfigurationError::ConflictingMmax);
    }

    let mut roles = Vec::new();
    for pair in args.add_role.chunks(2) {
        if let [hostname, role] = pair {
            match role.parse::<Role>() {
                Ok(role) => roles.push((hostname.clone(), role)),
                Err(role) => errors.push(ConfigurationError::UnknownRole { role }),
            }
        }
    }

    let init_buffer = match &args.init_buffer_file {
        Some(path) => match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                errors.push(ConfigurationError::UnreadableWorkload { path: path.clone(), reason: e.to_string() });
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let platform = match &args.platform {
        Some(p) => PathBuf::from(p),
        None => {
            errors.push(ConfigurationError::UnreadablePlatform { path: String::new(), reason: "no --platform given".to_string() });
            PathBuf::new()
        }
    };

    let Some(edc) = edc else {
        return Err(single_or_multiple(errors));
    };
    if !errors.is_empty() {
        return Err(single_or_multiple(errors));
    }

    Ok(Config {
        platform,
        workloads: args.workloads.iter().map(PathBuf::from).collect(),
        events: args.events.iter().map(PathBuf::from).collect(),
        workflows: args.workflows.iter().map(PathBuf::from).collect(),
        edc,
        init_buffer,
        wire_format: args.format,
        export_prefix: PathBuf::from(&args.export),
        mmax: args.mmax,
        mmax_workload: args.mmax_workload,
        energy_host: args.energy_host,
        roles,
        verbosity: args.verbose,
        redis_enabled: args.enable_redis,
    })
}

fn single_or_multiple(mut errors: Vec<ConfigurationError>) -> ConfigurationError {
    if errors.len() == 1 {
        return errors.remove(0);
    }
    ConfigurationError::Multiple(errors)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
