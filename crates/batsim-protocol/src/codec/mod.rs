// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! (De)serialization of EDC messages: a length-prefixed binary
//! encoding and a JSON encoding, selectable per EDC and immutable per run.

mod binary;
mod json;

use crate::message::{InboundMessage, OutboundMessage};
use batsim_core::ProtocolError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Which wire representation an EDC speaks. Fixed at EDC-selection time and
/// never changes over the course of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Binary,
    Json,
}

/// Encode/decode a single request or reply frame in the configured
/// [`WireFormat`].
#[derive(Debug, Clone, Copy)]
pub struct Codec {
    pub format: WireFormat,
}

impl Codec {
    pub fn new(format: WireFormat) -> Self {
        Self { format }
    }

    pub fn encode_request(&self, msg: &OutboundMessage) -> Result<Vec<u8>, ProtocolError> {
        self.encode(msg)
    }

    pub fn decode_reply(&self, bytes: &[u8]) -> Result<InboundMessage, ProtocolError> {
        self.decode(bytes)
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        match self.format {
            WireFormat::Binary => binary::encode(value),
            WireFormat::Json => json::encode(value),
        }
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, ProtocolError> {
        match self.format {
            WireFormat::Binary => binary::decode(bytes),
            WireFormat::Json => json::decode(bytes),
        }
    }
}

/// Frame `payload` with a 4-byte big-endian length prefix, for transports
/// (socket mode) that need explicit message boundaries.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(4 + payload.len());
    framed.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    framed.extend_from_slice(payload);
    framed
}

pub fn read_frame_len(prefix: [u8; 4]) -> usize {
    u32::from_be_bytes(prefix) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_adds_four_byte_length_prefix() {
        let payload = b"hello";
        let framed = frame(payload);
        assert_eq!(framed.len(), 4 + payload.len());
        assert_eq!(read_frame_len([framed[0], framed[1], framed[2], framed[3]]), payload.len());
        assert_eq!(&framed[4..], payload);
    }
}
