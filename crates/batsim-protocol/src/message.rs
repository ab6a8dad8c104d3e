// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single wire message = `{now: f64, events: [Event]}`.

use crate::event::{InboundEvent, OutboundEvent};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message<E> {
    pub now: f64,
    pub events: Vec<E>,
}

pub type OutboundMessage = Message<OutboundEvent>;
pub type InboundMessage = Message<InboundEvent>;

impl<E> Message<E> {
    pub fn new(now: f64, events: Vec<E>) -> Self {
        Self { now, events }
    }
}
