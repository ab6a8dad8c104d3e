// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Carries a process exit code out of `main` without calling
//! `std::process::exit` from deep inside command logic.

use std::fmt;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub const CONFIGURATION: i32 = 2;
    pub const INVARIANT: i32 = 3;

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(Self::CONFIGURATION, message)
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::new(Self::INVARIANT, message)
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<batsim_core::ConfigurationError> for ExitError {
    fn from(e: batsim_core::ConfigurationError) -> Self {
        Self::configuration(e.to_string())
    }
}

impl From<batsim_core::BatsimError> for ExitError {
    fn from(e: batsim_core::BatsimError) -> Self {
        match e {
            batsim_core::BatsimError::Configuration(e) => Self::configuration(e.to_string()),
            batsim_core::BatsimError::Invariant(e) => Self::invariant(e.to_string()),
            other => Self::invariant(other.to_string()),
        }
    }
}

impl From<batsim_server::ServerError> for ExitError {
    fn from(e: batsim_server::ServerError) -> Self {
        batsim_core::BatsimError::from(e).into()
    }
}
