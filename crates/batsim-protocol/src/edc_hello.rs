// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `EdcHello` options.
//!
//! Known EDC implementations disagree on whether `ack_dynamic_registration`
//! defaults to `true` or `false`; this core makes it mandatory and explicit
//! in every `EdcHello`, breaking the tie rather than guessing.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdcHelloOptions {
    /// Whether `RegisterJob` acknowledgements are enabled. When `false`, the
    /// EDC MUST track the submitted set itself.
    pub ack_dynamic_registration: bool,
    /// Whether the EDC may register jobs/profiles at runtime at all.
    pub dynamic_registration: bool,
}

impl EdcHelloOptions {
    pub fn new(dynamic_registration: bool, ack_dynamic_registration: bool) -> Self {
        Self { dynamic_registration, ack_dynamic_registration }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_round_trip_through_json() {
        let opts = EdcHelloOptions::new(true, false);
        let json = serde_json::to_string(&opts).unwrap();
        let back: EdcHelloOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(opts, back);
    }
}
