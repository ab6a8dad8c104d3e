// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! batsim-server: the orchestrator that owns the simulation clock, the
//! machine and workload registries, and the EDC request/reply boundary.

pub mod context;
pub mod events;
pub mod mailbox;
pub mod periodic_engine;
pub mod platform;
pub mod pstate_engine;
pub mod server;
pub mod workload_loader;

pub use context::{Context, Counters, SharingPolicy};
pub use mailbox::{Mailbox, Message, SubmitterKind, SwitchPhase};
pub use platform::SimplePlatform;
pub use server::{Server, ServerError};
