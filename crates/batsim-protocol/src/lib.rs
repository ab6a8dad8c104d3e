// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! batsim-protocol: the EDC wire/in-memory message grammar,
//! binary and JSON codecs, and the two EDC invocation modes (library via
//! `dlopen`, socket via request/reply).

pub mod codec;
pub mod edc_hello;
pub mod event;
pub mod message;
pub mod transport;

pub use codec::{Codec, WireFormat};
pub use edc_hello::EdcHelloOptions;
pub use event::{InboundEvent, OutboundEvent};
pub use message::Message;
pub use transport::{EdcTransport, LibraryTransport, SocketTransport};
